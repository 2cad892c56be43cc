//! Row and table processing.
//!
//! Row-wise mode compares each locus' methylated/unmethylated split with
//! its label-swapped mirror. Aggregate mode turns a whole file into two
//! per-locus probability columns and compares them once.

use crate::config::{AggregateConfig, EngineConfig, KsSamples, RowWiseConfig};
use crate::divergence::{
    entropy, jensen_shannon_distance, kl_divergence, normalize, normalized_kl, smooth,
    symmetric_geometric_jsd, validate_alpha, GeometricJsd,
};
use crate::error::Result;
use crate::ks::ks_2samp;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Read counts at one locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPair {
    pub methylated: u64,
    pub unmethylated: u64,
}

impl CountPair {
    pub fn new(methylated: u64, unmethylated: u64) -> Self {
        Self {
            methylated,
            unmethylated,
        }
    }

    /// Zero coverage: both counts are zero
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.methylated == 0 && self.unmethylated == 0
    }

    #[inline]
    pub fn to_array(self) -> [f64; 2] {
        [self.methylated as f64, self.unmethylated as f64]
    }
}

/// One line of a coverage file.
///
/// The fourth column is a methylation percentage in some producers and a
/// coverage value in others. It is kept as the original text so output
/// tables reproduce it exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub chr: String,
    pub start: u64,
    pub end: u64,
    pub percentage: String,
    pub methylated: u64,
    pub unmethylated: u64,
}

impl CoverageRow {
    #[inline]
    pub fn counts(&self) -> CountPair {
        CountPair::new(self.methylated, self.unmethylated)
    }
}

/// Divergence measures for a single locus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowDivergence {
    pub entropy: f64,
    pub relative_entropy: f64,
    /// Jensen-Shannon distance (square root of the divergence)
    pub jsd: f64,
    pub geometric_jsd: f64,
    pub ks_stat: f64,
    pub ks_pvalue: f64,
    /// Wall-clock time spent on this locus; diagnostic only
    pub elapsed: Duration,
}

/// A locus together with its divergences.
#[derive(Debug, Clone, PartialEq)]
pub struct RowResult {
    pub locus: CoverageRow,
    pub divergence: RowDivergence,
}

/// Row-wise results in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<RowResult>,
}

impl ResultTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RowResult] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RowResult> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<RowResult> {
        self.rows
    }
}

impl From<Vec<RowResult>> for ResultTable {
    fn from(rows: Vec<RowResult>) -> Self {
        Self { rows }
    }
}

impl<'a> IntoIterator for &'a ResultTable {
    type Item = &'a RowResult;
    type IntoIter = std::slice::Iter<'a, RowResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Whole-file divergence summary.
///
/// Every measure is `None` when the file has no covered locus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateDivergence {
    pub js_divergence: Option<f64>,
    pub kl_divergence: Option<f64>,
    pub gjs_divergence: Option<f64>,
    pub sgjs_divergence: Option<f64>,
    pub ks_statistic: Option<f64>,
    pub ks_pvalue: Option<f64>,
    /// Loci that survived the zero-coverage filter
    pub loci: usize,
}

impl AggregateDivergence {
    /// Result for a file without any covered locus
    pub fn no_data() -> Self {
        Self::default()
    }

    pub fn has_data(&self) -> bool {
        self.loci > 0
    }
}

/// Per-locus processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowProcessor {
    config: RowWiseConfig,
}

impl RowProcessor {
    pub fn new(config: RowWiseConfig) -> Result<Self> {
        EngineConfig::RowWise(config).validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RowWiseConfig {
        &self.config
    }

    /// Divergences between a locus' split and its label-swapped mirror.
    pub fn divergence(&self, counts: CountPair) -> Result<RowDivergence> {
        let started = Instant::now();
        let base = self.config.base;

        let mut smoothed = counts.to_array();
        smooth(&mut smoothed, self.config.alpha)?;

        let mut p = smoothed;
        let mut q = [smoothed[1], smoothed[0]];
        normalize(&mut p)?;
        normalize(&mut q)?;

        let entropy = entropy(&p, base)?;
        let relative_entropy = kl_divergence(&p, &q, base)?;
        let jsd = jensen_shannon_distance(&p, &q, base)?;
        let geometric_jsd = self.config.geometric.compute(&p, &q, base)?;
        let ks = ks_2samp(&p, &q, self.config.ks_method)?;

        Ok(RowDivergence {
            entropy,
            relative_entropy,
            jsd,
            geometric_jsd,
            ks_stat: ks.statistic,
            ks_pvalue: ks.pvalue,
            elapsed: started.elapsed(),
        })
    }

    /// Process every row in order. The first failing row aborts the table.
    pub fn process<I>(&self, rows: I) -> Result<ResultTable>
    where
        I: IntoIterator<Item = CoverageRow>,
    {
        rows.into_iter()
            .map(|locus| {
                let divergence = self.divergence(locus.counts())?;
                Ok(RowResult { locus, divergence })
            })
            .collect::<Result<Vec<_>>>()
            .map(ResultTable::from)
    }
}

/// Whole-file processor.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateProcessor {
    config: AggregateConfig,
}

impl AggregateProcessor {
    pub fn new(config: AggregateConfig) -> Result<Self> {
        EngineConfig::Aggregate(config).validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AggregateConfig {
        &self.config
    }

    /// Summarize all loci of one file.
    ///
    /// Zero-coverage loci are dropped, `alpha` is added to both counts, and
    /// the per-locus probability columns `p = m / (m + u)` and
    /// `q = u / (m + u)` are compared as distributions over loci.
    pub fn summarize<I>(&self, pairs: I) -> Result<AggregateDivergence>
    where
        I: IntoIterator<Item = CountPair>,
    {
        let alpha = self.config.alpha;
        validate_alpha(alpha)?;
        let keep_counts = self.config.ks_samples == KsSamples::SmoothedCounts;

        let mut p = Vec::new();
        let mut q = Vec::new();
        let mut methylated = Vec::new();
        let mut unmethylated = Vec::new();

        for pair in pairs.into_iter().filter(|pair| !pair.is_empty()) {
            let m = pair.methylated as f64 + alpha;
            let u = pair.unmethylated as f64 + alpha;
            let total = m + u;
            p.push(m / total);
            q.push(u / total);
            if keep_counts {
                methylated.push(m);
                unmethylated.push(u);
            }
        }

        if p.is_empty() {
            return Ok(AggregateDivergence::no_data());
        }

        let base = self.config.base;
        let ks = match self.config.ks_samples {
            KsSamples::Probabilities => ks_2samp(&p, &q, self.config.ks_method)?,
            KsSamples::SmoothedCounts => ks_2samp(&methylated, &unmethylated, self.config.ks_method)?,
        };

        Ok(AggregateDivergence {
            js_divergence: Some(jensen_shannon_distance(&p, &q, base)?),
            kl_divergence: Some(normalized_kl(&p, &q, base)?),
            gjs_divergence: Some(GeometricJsd::Normalized.compute(&p, &q, base)?),
            sgjs_divergence: Some(symmetric_geometric_jsd(&p, &q, base)?),
            ks_statistic: Some(ks.statistic),
            ks_pvalue: Some(ks.pvalue),
            loci: p.len(),
        })
    }
}

/// A processor for whichever mode the configuration selects.
#[derive(Debug, Clone, Copy)]
pub enum DivergenceEngine {
    RowWise(RowProcessor),
    Aggregate(AggregateProcessor),
}

impl DivergenceEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(match config {
            EngineConfig::RowWise(c) => Self::RowWise(RowProcessor::new(c)?),
            EngineConfig::Aggregate(c) => Self::Aggregate(AggregateProcessor::new(c)?),
        })
    }

    pub fn config(&self) -> EngineConfig {
        match self {
            DivergenceEngine::RowWise(p) => EngineConfig::RowWise(p.config),
            DivergenceEngine::Aggregate(p) => EngineConfig::Aggregate(p.config),
        }
    }
}
