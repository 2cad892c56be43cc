//! # methdiv
//!
//! Batch methylation divergence over Bismark coverage files.
//!
//! This crate wraps [`divergence_engine`] with everything around the
//! numbers:
//!
//! - **I/O**: gzip coverage input, CSV result tables
//! - **Discovery**: directory walks and per-sample chromosome files
//! - **Batching**: a bounded worker pool that logs and skips bad files
//! - **Configuration**: command-line flags or a JSON file
//!
//! ## Quick Start
//!
//! ```no_run
//! use methdiv::{run, PipelineConfig};
//! use divergence_engine::EngineConfig;
//!
//! # async fn demo() -> methdiv::Result<()> {
//! let config = PipelineConfig::new("/data/coverage", "/data/results.csv", EngineConfig::aggregate())
//!     .with_workers(4);
//! let summary = run(&config).await?;
//! println!("{} processed, {} failed", summary.processed, summary.failed);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           methdiv                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  batch.rs          │  io.rs             │  metadata.rs          │
//! │  - discovery       │  - read_coverage   │  - FileMetadata       │
//! │  - run_pool        │  - row tables      │                       │
//! │  - run             │  - summary tables  │                       │
//! ├────────────────────┴────────────────────┴───────────────────────┤
//! │  config.rs  │  logging.rs  │  error.rs                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                      divergence-engine                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod metadata;

// Re-exports
pub use batch::{
    discover_chromosome_files, discover_coverage_files, discover_sample_dirs,
    process_aggregate_file, process_row_file, row_output_path, run, run_aggregate_batch,
    run_pool, run_row_batch, BatchSummary,
};
pub use config::{PipelineConfig, DEFAULT_WORKERS};
pub use error::{PipelineError, Result};
pub use io::{
    read_coverage, read_coverage_from, write_aggregate_table, write_row_table, AggregateRecord,
    AGGREGATE_HEADER, ROW_HEADER,
};
pub use logging::{init_logger, LogTarget};
pub use metadata::FileMetadata;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
