//! Logger setup shared by the binaries.

use crate::error::{PipelineError, Result};
use env_logger::{Builder, Env, Target};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Stdout,
    /// Truncated when the logger starts
    File(PathBuf),
}

/// Install the global logger.
///
/// `RUST_LOG` overrides the default level (`info`, or `debug` when
/// `verbose`). Lines read `<timestamp> - <LEVEL> - <message>`.
pub fn init_logger(target: LogTarget, verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_level));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {}",
            buf.timestamp_millis(),
            record.level(),
            record.args()
        )
    });

    match target {
        LogTarget::Stderr => builder.target(Target::Stderr),
        LogTarget::Stdout => builder.target(Target::Stdout),
        LogTarget::File(path) => builder.target(Target::Pipe(Box::new(File::create(path)?))),
    };

    builder
        .try_init()
        .map_err(|e| PipelineError::Config(format!("failed to set up logger: {}", e)))
}
