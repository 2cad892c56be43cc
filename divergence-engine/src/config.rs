//! Engine configuration.
//!
//! The two processing modes carry different smoothing constants, log bases
//! and definitions of the compared distributions, so each mode has its own
//! configuration type. Defaults reproduce the reference constants.

use crate::divergence::{validate_alpha, GeometricJsd, LogBase, AGGREGATE_ALPHA, ROW_ALPHA};
use crate::error::{DivergenceError, Result};
use crate::ks::KsMethod;
use serde::{Deserialize, Serialize};

/// Per-locus processing: `p = [m, u] / sum`, `q = reverse(p)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowWiseConfig {
    /// Additive smoothing constant
    pub alpha: f64,
    /// Logarithm base for entropy, KL and JS
    pub base: LogBase,
    /// Formula for the geometric JSD column
    pub geometric: GeometricJsd,
    pub ks_method: KsMethod,
}

impl Default for RowWiseConfig {
    fn default() -> Self {
        Self {
            alpha: ROW_ALPHA,
            base: LogBase::Natural,
            geometric: GeometricJsd::Simple,
            ks_method: KsMethod::Auto,
        }
    }
}

/// Which columns feed the KS test in aggregate mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KsSamples {
    /// Per-locus methylation and unmethylation probabilities
    Probabilities,
    /// Smoothed methylated and unmethylated counts
    SmoothedCounts,
}

impl Default for KsSamples {
    fn default() -> Self {
        Self::Probabilities
    }
}

/// Whole-file processing: per-locus probabilities compared across loci.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Added to both count columns after the zero-row filter
    pub alpha: f64,
    pub base: LogBase,
    pub ks_samples: KsSamples,
    pub ks_method: KsMethod,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            alpha: AGGREGATE_ALPHA,
            base: LogBase::Two,
            ks_samples: KsSamples::Probabilities,
            ks_method: KsMethod::Auto,
        }
    }
}

/// Mode selection for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EngineConfig {
    RowWise(RowWiseConfig),
    Aggregate(AggregateConfig),
}

impl EngineConfig {
    pub fn row_wise() -> Self {
        Self::RowWise(RowWiseConfig::default())
    }

    pub fn aggregate() -> Self {
        Self::Aggregate(AggregateConfig::default())
    }

    /// Smoothing constant of the selected mode
    pub fn alpha(&self) -> f64 {
        match self {
            EngineConfig::RowWise(c) => c.alpha,
            EngineConfig::Aggregate(c) => c.alpha,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            EngineConfig::RowWise(c) => {
                validate_alpha(c.alpha)?;
                c.base.validate()
            }
            EngineConfig::Aggregate(c) => {
                validate_alpha(c.alpha)?;
                // Without smoothing a column of fully methylated loci sums to zero.
                if c.alpha == 0.0 {
                    return Err(DivergenceError::InvalidParameter(
                        "aggregate smoothing constant must be > 0".to_string(),
                    ));
                }
                c.base.validate()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_carry_reference_constants() {
        let row = RowWiseConfig::default();
        assert_eq!(row.alpha, 1e-10);
        assert_eq!(row.base, LogBase::Natural);

        let agg = AggregateConfig::default();
        assert_eq!(agg.alpha, 1e-5);
        assert_eq!(agg.base, LogBase::Two);
    }

    #[test]
    fn test_json_mode_tag() {
        let json = r#"{"mode":"aggregate","alpha":1e-10,"ks_samples":"smoothed_counts"}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        match config {
            EngineConfig::Aggregate(c) => {
                assert_eq!(c.alpha, 1e-10);
                assert_eq!(c.base, LogBase::Two);
                assert_eq!(c.ks_samples, KsSamples::SmoothedCounts);
            }
            other => panic!("unexpected mode: {:?}", other),
        }

        let json = r#"{"mode":"row_wise","base":"two"}"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.alpha(), 1e-10);
    }

    #[test]
    fn test_validate() {
        assert!(EngineConfig::row_wise().validate().is_ok());

        let bad = EngineConfig::Aggregate(AggregateConfig {
            alpha: -1.0,
            ..Default::default()
        });
        assert!(bad.validate().is_err());

        let unsmoothed = EngineConfig::Aggregate(AggregateConfig {
            alpha: 0.0,
            ..Default::default()
        });
        assert!(matches!(
            unsmoothed.validate(),
            Err(DivergenceError::InvalidParameter(_))
        ));

        let bad_base = EngineConfig::RowWise(RowWiseConfig {
            base: LogBase::Custom(1.0),
            ..Default::default()
        });
        assert!(bad_base.validate().is_err());
    }
}
