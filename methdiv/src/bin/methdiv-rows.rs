//! Per-locus divergence for a single coverage file.

use std::path::PathBuf;

use clap::Parser;
use divergence_engine::{LogBase, RowProcessor, RowWiseConfig, ROW_ALPHA};
use log::{error, info};
use methdiv::{init_logger, process_row_file, LogTarget};

#[derive(Parser, Debug)]
#[command(
    name = "methdiv-rows",
    version = env!("CARGO_PKG_VERSION"),
    about = "Per-locus divergence table for one gzip coverage file"
)]
struct Args {
    /// Gzip-compressed Bismark coverage file.
    input: PathBuf,
    /// Gzip-compressed CSV output.
    output: PathBuf,
    /// Additive smoothing constant.
    #[arg(long, default_value_t = ROW_ALPHA)]
    alpha: f64,
    /// Logarithm base: `e`, `2`, or any positive number.
    #[arg(long, default_value = "e")]
    base: LogBase,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger(LogTarget::Stdout, false)?;

    let config = RowWiseConfig {
        alpha: args.alpha,
        base: args.base,
        ..Default::default()
    };
    let processor = RowProcessor::new(config)?;

    match process_row_file(&args.input, &args.output, &processor) {
        Ok(rows) => info!("Wrote {} rows to {}", rows, args.output.display()),
        Err(e) => error!("Error processing file {}: {}", args.input.display(), e),
    }
    Ok(())
}
