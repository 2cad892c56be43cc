//! Pipeline configuration.
//!
//! All paths and knobs travel in one [`PipelineConfig`], built from
//! command-line flags or loaded from a JSON file:
//!
//! ```json
//! {
//!   "input_dir": "/data/coverage",
//!   "output": "/data/divergence",
//!   "workers": 10,
//!   "engine": { "mode": "row_wise", "alpha": 1e-10 }
//! }
//! ```

use crate::error::{PipelineError, Result};
use divergence_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default number of files processed at once
pub const DEFAULT_WORKERS: usize = 10;

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Root of the coverage files
    pub input_dir: PathBuf,
    /// Output base directory (row-wise) or results CSV path (aggregate)
    pub output: PathBuf,
    #[serde(default = "default_workers")]
    pub workers: usize,
    pub engine: EngineConfig,
}

impl PipelineConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output: impl Into<PathBuf>, engine: EngineConfig) -> Self {
        Self {
            input_dir: input_dir.into(),
            output: output.into(),
            workers: DEFAULT_WORKERS,
            engine,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PipelineError::Config("workers must be at least 1".to_string()));
        }
        self.engine.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use divergence_engine::{AggregateConfig, LogBase};
    use std::io::Write;

    #[test]
    fn test_json_defaults() {
        let json = r#"{
            "input_dir": "/in",
            "output": "/out/results.csv",
            "engine": { "mode": "aggregate" }
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.engine, EngineConfig::aggregate());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_round_trip_through_file() {
        let config = PipelineConfig::new(
            "/in",
            "/out",
            EngineConfig::Aggregate(AggregateConfig {
                alpha: 1e-10,
                base: LogBase::Natural,
                ..Default::default()
            }),
        )
        .with_workers(3);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = PipelineConfig::new("/in", "/out", EngineConfig::row_wise()).with_workers(0);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }
}
