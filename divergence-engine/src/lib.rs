//! # Divergence Engine
//!
//! Information-theoretic comparison of methylated and unmethylated read
//! counts from DNA methylation coverage data.
//!
//! ## Modes
//!
//! - **Row-wise**: each locus' smoothed split `p = [m, u] / (m + u)` is
//!   compared with its label-swapped mirror `q = [u, m] / (m + u)`.
//! - **Aggregate**: a whole file becomes two per-locus columns,
//!   `p_i = m_i / (m_i + u_i)` and `q_i = u_i / (m_i + u_i)`, compared as
//!   distributions over loci in bits.
//!
//! ```text
//! counts → smooth → normalize → {H, KL, JS, GJS, SGJS, KS} → record
//! ```
//!
//! ## Example
//!
//! ```rust
//! use divergence_engine::{CountPair, RowProcessor};
//!
//! let processor = RowProcessor::default();
//! let balanced = processor.divergence(CountPair::new(5, 5)).unwrap();
//! let skewed = processor.divergence(CountPair::new(10, 0)).unwrap();
//!
//! assert!(balanced.jsd < 1e-6);
//! assert!(skewed.relative_entropy > balanced.relative_entropy);
//! ```
//!
//! The crate does no I/O and no logging; callers decide how results are
//! reported.

pub mod config;
pub mod divergence;
pub mod error;
pub mod ks;
pub mod table;

// Re-exports
pub use config::*;
pub use divergence::*;
pub use error::*;
pub use ks::*;
pub use table::*;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_workflow() {
        let engine = DivergenceEngine::new(EngineConfig::row_wise()).unwrap();
        let DivergenceEngine::RowWise(processor) = engine else {
            panic!("expected row-wise processor");
        };

        let rows = vec![CoverageRow {
            chr: "chr1".to_string(),
            start: 100,
            end: 200,
            percentage: "50.0".to_string(),
            methylated: 5,
            unmethylated: 5,
        }];
        let table = processor.process(rows).unwrap();
        assert_eq!(table.len(), 1);

        let d = &table.rows()[0].divergence;
        assert!((d.entropy - std::f64::consts::LN_2).abs() < 1e-12);
        assert!(d.jsd >= 0.0 && d.jsd <= 1.0);
    }
}
