//! Batch orchestration over many coverage files.
//!
//! ## Architecture
//!
//! ```text
//! [glob discovery] → [bounded worker pool] → [per-file processor] → [outputs]
//!                          ↓ failure
//!                  [log with file name, skip]
//! ```
//!
//! Workers never share mutable state: each file is read, processed and
//! written by one blocking task. A failing file is logged and skipped;
//! the batch itself always completes.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::io::{read_coverage, write_aggregate_table, write_row_table, AggregateRecord};
use crate::metadata::FileMetadata;
use divergence_engine::{AggregateProcessor, CoverageRow, DivergenceEngine, RowProcessor};
use glob::{glob, Pattern};
use log::{debug, error, info, warn};
use std::any::Any;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Suffix of the files picked up by directory walking
pub const COVERAGE_SUFFIX: &str = ".cov.gz";

/// File pattern inside each sample directory for aggregate runs
pub const CHROMOSOME_PATTERN: &str = "*_chr_*.cov.gz";

/// Counts reported at the end of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.processed + self.failed
    }
}

fn glob_sorted(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable path {}: {}", e.path().display(), e.error()),
        }
    }
    paths.sort();
    Ok(paths)
}

fn escaped(dir: &Path) -> String {
    Pattern::escape(&dir.to_string_lossy())
}

/// Every `*.cov.gz` file at any depth below `base`.
pub fn discover_coverage_files(base: &Path) -> Result<Vec<PathBuf>> {
    glob_sorted(&format!("{}/**/*{}", escaped(base), COVERAGE_SUFFIX))
}

/// Immediate subdirectories of `data_dir`, one per sample.
pub fn discover_sample_dirs(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Per-chromosome coverage files inside one sample directory.
pub fn discover_chromosome_files(sample_dir: &Path) -> Result<Vec<PathBuf>> {
    glob_sorted(&format!("{}/{}", escaped(sample_dir), CHROMOSOME_PATTERN))
}

/// `<output_base>/<input parent name>/output_<input name without ".gz">.csv.gz`
pub fn row_output_path(output_base: &Path, input: &Path) -> PathBuf {
    let mut dir = output_base.to_path_buf();
    if let Some(parent) = input.parent().and_then(Path::file_name) {
        dir.push(parent);
    }
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().replace(".gz", ""))
        .unwrap_or_default();
    dir.join(format!("output_{}.csv.gz", name))
}

/// Row-wise processing of one file. Returns the number of rows written.
///
/// Parent directories of `output` are created as needed. Nothing is
/// written when any row fails.
pub fn process_row_file(input: &Path, output: &Path, processor: &RowProcessor) -> Result<usize> {
    let rows = read_coverage(input)?;
    let table = processor.process(rows)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    write_row_table(output, &table)?;
    Ok(table.len())
}

/// Whole-file summary of one per-chromosome coverage file.
pub fn process_aggregate_file(input: &Path, processor: &AggregateProcessor) -> Result<AggregateRecord> {
    let meta = FileMetadata::from_path(input)?;
    let rows = read_coverage(input)?;
    let summary = processor.summarize(rows.iter().map(CoverageRow::counts))?;
    if !summary.has_data() {
        debug!("No covered loci in {}", input.display());
    }
    Ok(AggregateRecord::new(meta, &summary))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "unknown panic".to_string(), |msg| msg.to_string()),
    }
}

/// Run `task` over every input with at most `workers` files in flight.
///
/// Outcomes come back in input order, whatever order workers finish in.
/// A panicking task becomes a [`PipelineError::Worker`] for its file.
pub async fn run_pool<T, F>(inputs: Vec<PathBuf>, workers: usize, task: F) -> Vec<(PathBuf, Result<T>)>
where
    T: Send + 'static,
    F: Fn(&Path) -> Result<T> + Send + Sync + 'static,
{
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let task = Arc::new(task);
    let mut set = JoinSet::new();

    for (index, path) in inputs.into_iter().enumerate() {
        let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
            break;
        };
        let task = Arc::clone(&task);
        set.spawn_blocking(move || {
            let _permit = permit;
            let outcome = catch_unwind(AssertUnwindSafe(|| task(&path)))
                .unwrap_or_else(|payload| Err(PipelineError::Worker(panic_message(payload))));
            (index, path, outcome)
        });
    }

    let mut outcomes = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(done) => outcomes.push(done),
            Err(e) => error!("Worker task failed: {}", e),
        }
    }

    outcomes.sort_by_key(|(index, _, _)| *index);
    outcomes.into_iter().map(|(_, path, outcome)| (path, outcome)).collect()
}

/// Row-wise mode over every coverage file below `config.input_dir`.
pub async fn run_row_batch(config: &PipelineConfig, processor: RowProcessor) -> Result<BatchSummary> {
    let inputs = discover_coverage_files(&config.input_dir)?;
    info!(
        "Found {} coverage files under {}",
        inputs.len(),
        config.input_dir.display()
    );

    let output_base = config.output.clone();
    let outcomes = run_pool(inputs, config.workers, move |input| {
        let output = row_output_path(&output_base, input);
        process_row_file(input, &output, &processor).map(|rows| (output, rows))
    })
    .await;

    let mut summary = BatchSummary::default();
    for (path, outcome) in outcomes {
        match outcome {
            Ok((output, rows)) => {
                summary.processed += 1;
                debug!("Wrote {} rows to {}", rows, output.display());
            }
            Err(e) => {
                summary.failed += 1;
                error!("Error processing file {}: {}", path.display(), e);
            }
        }
    }
    Ok(summary)
}

/// Aggregate mode over `<input_dir>/<sample>/*_chr_*.cov.gz`, writing one
/// results CSV to `config.output`.
pub async fn run_aggregate_batch(
    config: &PipelineConfig,
    processor: AggregateProcessor,
) -> Result<BatchSummary> {
    let mut inputs = Vec::new();
    for sample_dir in discover_sample_dirs(&config.input_dir)? {
        info!("Processing sample directory: {}", sample_dir.display());
        inputs.extend(discover_chromosome_files(&sample_dir)?);
    }

    let outcomes = run_pool(inputs, config.workers, move |input| {
        process_aggregate_file(input, &processor)
    })
    .await;

    let mut summary = BatchSummary::default();
    let mut records = Vec::with_capacity(outcomes.len());
    for (path, outcome) in outcomes {
        match outcome {
            Ok(record) => {
                summary.processed += 1;
                records.push(record);
            }
            Err(e) => {
                summary.failed += 1;
                let name = path.file_name().map_or_else(
                    || path.display().to_string(),
                    |n| n.to_string_lossy().into_owned(),
                );
                error!("Error processing file {}: {}", name, e);
            }
        }
    }

    if let Some(parent) = config.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_aggregate_table(&config.output, &records)?;
    info!("Wrote {} records to {}", records.len(), config.output.display());
    Ok(summary)
}

/// Run whichever mode `config.engine` selects.
pub async fn run(config: &PipelineConfig) -> Result<BatchSummary> {
    config.validate()?;
    let summary = match DivergenceEngine::new(config.engine)? {
        DivergenceEngine::RowWise(processor) => run_row_batch(config, processor).await?,
        DivergenceEngine::Aggregate(processor) => run_aggregate_batch(config, processor).await?,
    };
    info!(
        "Batch finished: {} processed, {} failed",
        summary.processed, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_output_path() {
        let out = row_output_path(
            Path::new("/out"),
            Path::new("/data/sampleA/CpG_sampleA_1.cov.gz"),
        );
        assert_eq!(out, PathBuf::from("/out/sampleA/output_CpG_sampleA_1.cov.csv.gz"));
    }

    #[test]
    fn test_row_output_path_without_parent() {
        let out = row_output_path(Path::new("out"), Path::new("x.cov.gz"));
        assert_eq!(out, PathBuf::from("out/output_x.cov.csv.gz"));
    }

    #[tokio::test]
    async fn test_pool_reports_panicking_file() {
        let inputs = vec![PathBuf::from("a.cov.gz"), PathBuf::from("b.cov.gz")];
        let outcomes = run_pool(inputs, 2, |path| {
            if path == Path::new("b.cov.gz") {
                panic!("corrupt block");
            }
            Ok(())
        })
        .await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.is_ok());
        assert_eq!(outcomes[1].0, PathBuf::from("b.cov.gz"));
        match &outcomes[1].1 {
            Err(PipelineError::Worker(msg)) => assert_eq!(msg, "corrupt block"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_keeps_input_order() {
        let inputs: Vec<PathBuf> = (0..20).map(|i| PathBuf::from(format!("f{}", i))).collect();
        let outcomes = run_pool(inputs.clone(), 3, |path| {
            let n: u64 = path.to_string_lossy()[1..].parse().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20 - n));
            if n == 7 {
                Err(PipelineError::Config("boom".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(outcomes.len(), 20);
        for (i, (path, outcome)) in outcomes.iter().enumerate() {
            assert_eq!(path, &inputs[i]);
            match outcome {
                Ok(n) => assert_eq!(*n, i as u64),
                Err(_) => assert_eq!(i, 7),
            }
        }
    }
}
