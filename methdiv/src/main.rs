use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use divergence_engine::{
    AggregateConfig, EngineConfig, KsMethod, KsSamples, LogBase, RowWiseConfig, AGGREGATE_ALPHA,
    ROW_ALPHA,
};
use log::info;
use methdiv::{init_logger, run, LogTarget, PipelineConfig, DEFAULT_WORKERS};

#[derive(Parser, Debug)]
#[command(
    name = "methdiv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Methylation divergence over Bismark coverage files"
)]
struct Cli {
    /// Write log lines to this file instead of stderr.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-locus divergence for every `*.cov.gz` file below a directory.
    Walk {
        /// Directory searched recursively for coverage files.
        #[arg(long)]
        input_dir: PathBuf,
        /// Base directory for `<sample>/output_<name>.csv.gz` tables.
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Additive smoothing constant.
        #[arg(long, default_value_t = ROW_ALPHA)]
        alpha: f64,
        /// Logarithm base: `e`, `2`, or any positive number.
        #[arg(long, default_value = "e")]
        base: LogBase,
        #[arg(long, value_enum, default_value_t = KsArg::Auto)]
        ks_method: KsArg,
    },
    /// One summary line per chromosome file in `<input-dir>/<sample>/`.
    Aggregate {
        /// Directory holding one subdirectory per sample.
        #[arg(long)]
        input_dir: PathBuf,
        /// Results CSV path.
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_WORKERS)]
        workers: usize,
        /// Added to both count columns of every covered locus.
        #[arg(long, default_value_t = AGGREGATE_ALPHA)]
        alpha: f64,
        /// Columns compared by the KS test.
        #[arg(long, value_enum, default_value_t = KsSamplesArg::Probabilities)]
        ks_samples: KsSamplesArg,
        #[arg(long, value_enum, default_value_t = KsArg::Auto)]
        ks_method: KsArg,
    },
    /// Run from a JSON configuration file.
    Run {
        #[arg(long)]
        config: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KsArg {
    Auto,
    Exact,
    Asymptotic,
}

impl From<KsArg> for KsMethod {
    fn from(arg: KsArg) -> Self {
        match arg {
            KsArg::Auto => KsMethod::Auto,
            KsArg::Exact => KsMethod::Exact,
            KsArg::Asymptotic => KsMethod::Asymptotic,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KsSamplesArg {
    Probabilities,
    SmoothedCounts,
}

impl From<KsSamplesArg> for KsSamples {
    fn from(arg: KsSamplesArg) -> Self {
        match arg {
            KsSamplesArg::Probabilities => KsSamples::Probabilities,
            KsSamplesArg::SmoothedCounts => KsSamples::SmoothedCounts,
        }
    }
}

impl Commands {
    fn into_config(self) -> Result<PipelineConfig> {
        let config = match self {
            Commands::Walk {
                input_dir,
                output,
                workers,
                alpha,
                base,
                ks_method,
            } => {
                let engine = EngineConfig::RowWise(RowWiseConfig {
                    alpha,
                    base,
                    ks_method: ks_method.into(),
                    ..Default::default()
                });
                PipelineConfig::new(input_dir, output, engine).with_workers(workers)
            }
            Commands::Aggregate {
                input_dir,
                output,
                workers,
                alpha,
                ks_samples,
                ks_method,
            } => {
                let engine = EngineConfig::Aggregate(AggregateConfig {
                    alpha,
                    ks_samples: ks_samples.into(),
                    ks_method: ks_method.into(),
                    ..Default::default()
                });
                PipelineConfig::new(input_dir, output, engine).with_workers(workers)
            }
            Commands::Run { config } => PipelineConfig::from_json_file(&config)
                .with_context(|| format!("failed to load config {}", config.display()))?,
        };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target = cli.log_file.map_or(LogTarget::Stderr, LogTarget::File);
    init_logger(target, cli.verbose)?;

    let config = cli.command.into_config()?;
    config.validate().context("invalid configuration")?;
    info!(
        "Starting {} run over {} with {} workers",
        match config.engine {
            EngineConfig::RowWise(_) => "row-wise",
            EngineConfig::Aggregate(_) => "aggregate",
        },
        config.input_dir.display(),
        config.workers
    );

    let summary = run(&config)
        .await
        .with_context(|| format!("batch over {} failed", config.input_dir.display()))?;
    if summary.failed > 0 {
        info!("{} of {} files were skipped", summary.failed, summary.total());
    }
    Ok(())
}
