//! Core divergence calculations.
//!
//! Implements the information-theoretic measures used on methylation counts:
//! - Additive smoothing and normalization
//! - Shannon entropy and KL divergence (relative entropy)
//! - Jensen-Shannon divergence and distance
//! - Geometric and symmetric-geometric Jensen-Shannon variants
//!
//! Element-wise terms follow the usual conventions: `0 * log(0 / q) = 0`
//! and `p * log(p / 0) = +inf` for `p > 0`. Sums use blocked pairwise
//! summation so results do not depend on how long a column is.

use crate::error::{DivergenceError, Result};
use serde::{Deserialize, Serialize};

/// Default smoothing constant for row-wise processing
pub const ROW_ALPHA: f64 = 1e-10;

/// Default smoothing constant for whole-file (aggregate) processing
pub const AGGREGATE_ALPHA: f64 = 1e-5;

/// Block size below which pairwise summation falls back to eight accumulators
const PAIRWISE_BLOCK: usize = 128;

/// Logarithm base for entropy-type measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBase {
    /// Natural logarithm (nats)
    Natural,
    /// Base 2 (bits)
    Two,
    /// Any other base greater than zero and different from one
    Custom(f64),
}

impl Default for LogBase {
    fn default() -> Self {
        Self::Natural
    }
}

impl LogBase {
    /// Convert a quantity measured in nats into this base.
    #[inline]
    pub fn from_nats(self, nats: f64) -> f64 {
        match self {
            LogBase::Natural => nats,
            LogBase::Two => nats / std::f64::consts::LN_2,
            LogBase::Custom(base) => nats / base.ln(),
        }
    }

    /// Reject bases that make the conversion meaningless.
    pub fn validate(self) -> Result<()> {
        match self {
            LogBase::Custom(base) if !(base.is_finite() && base > 0.0 && base != 1.0) => Err(
                DivergenceError::InvalidParameter(format!("log base must be positive and != 1, got {}", base)),
            ),
            _ => Ok(()),
        }
    }
}

impl std::str::FromStr for LogBase {
    type Err = DivergenceError;

    /// Accepts `e`, `natural`, `2`, `two`, or any other positive number.
    fn from_str(s: &str) -> Result<Self> {
        let base = match s.trim().to_ascii_lowercase().as_str() {
            "e" | "natural" | "ln" => LogBase::Natural,
            "2" | "two" | "bits" => LogBase::Two,
            other => {
                let value: f64 = other
                    .parse()
                    .map_err(|_| DivergenceError::InvalidParameter(format!("unknown log base '{}'", s)))?;
                LogBase::Custom(value)
            }
        };
        base.validate()?;
        Ok(base)
    }
}

/// Sum with blocked pairwise accumulation.
///
/// Short slices are summed left to right, slices up to 128 elements use
/// eight interleaved accumulators, and longer slices are split in half
/// on a multiple of eight.
pub fn pairwise_sum(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 8 {
        let mut res = 0.0;
        for &v in values {
            res += v;
        }
        res
    } else if n <= PAIRWISE_BLOCK {
        let mut r = [0.0f64; 8];
        r.copy_from_slice(&values[..8]);
        let mut i = 8;
        while i < n - (n % 8) {
            for (j, acc) in r.iter_mut().enumerate() {
                *acc += values[i + j];
            }
            i += 8;
        }
        let mut res = ((r[0] + r[1]) + (r[2] + r[3])) + ((r[4] + r[5]) + (r[6] + r[7]));
        for &v in &values[i..] {
            res += v;
        }
        res
    } else {
        let mut half = n / 2;
        half -= half % 8;
        pairwise_sum(&values[..half]) + pairwise_sum(&values[half..])
    }
}

/// Normalize a distribution in place so that it sums to 1.0
///
/// Fails with [`DivergenceError::ZeroSum`] when the sum is exactly zero.
#[inline]
pub fn normalize(dist: &mut [f64]) -> Result<()> {
    if dist.is_empty() {
        return Err(DivergenceError::EmptyInput("distribution"));
    }
    let sum = pairwise_sum(dist);
    if sum == 0.0 {
        return Err(DivergenceError::ZeroSum);
    }
    for x in dist.iter_mut() {
        *x /= sum;
    }
    Ok(())
}

/// Additive (Laplace) smoothing of raw counts, in place.
///
/// `x_i <- (x_i + alpha) / (sum(x) + alpha * len(x))`, so the result is
/// already a probability vector. A pair of zero counts with `alpha > 0`
/// becomes `[0.5, 0.5]`.
pub fn smooth(counts: &mut [f64], alpha: f64) -> Result<()> {
    validate_alpha(alpha)?;
    if counts.is_empty() {
        return Err(DivergenceError::EmptyInput("counts"));
    }
    let denom = pairwise_sum(counts) + alpha * counts.len() as f64;
    if denom == 0.0 {
        return Err(DivergenceError::ZeroSum);
    }
    for x in counts.iter_mut() {
        *x = (*x + alpha) / denom;
    }
    Ok(())
}

/// Check that a smoothing constant is finite and non-negative.
pub fn validate_alpha(alpha: f64) -> Result<()> {
    if alpha.is_finite() && alpha >= 0.0 {
        Ok(())
    } else {
        Err(DivergenceError::InvalidParameter(format!(
            "smoothing constant must be finite and >= 0, got {}",
            alpha
        )))
    }
}

/// Element-wise entropy term `-x ln x`
#[inline]
pub fn entr(x: f64) -> f64 {
    if x.is_nan() {
        x
    } else if x > 0.0 {
        -x * x.ln()
    } else if x == 0.0 {
        0.0
    } else {
        f64::NEG_INFINITY
    }
}

/// Element-wise relative entropy term `x ln(x / y)`
#[inline]
pub fn rel_entr(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() {
        f64::NAN
    } else if x > 0.0 && y > 0.0 {
        x * (x / y).ln()
    } else if x == 0.0 && y >= 0.0 {
        0.0
    } else {
        f64::INFINITY
    }
}

fn check_pair(p: &[f64], q: &[f64]) -> Result<()> {
    if p.len() != q.len() {
        return Err(DivergenceError::DimensionMismatch {
            expected: p.len(),
            got: q.len(),
        });
    }
    if p.is_empty() {
        return Err(DivergenceError::EmptyInput("distribution"));
    }
    Ok(())
}

fn rescaled(p: &[f64]) -> Result<Vec<f64>> {
    let mut out = p.to_vec();
    normalize(&mut out)?;
    Ok(out)
}

fn sum_rel_entr(p: &[f64], q: &[f64]) -> f64 {
    let terms: Vec<f64> = p.iter().zip(q).map(|(&pi, &qi)| rel_entr(pi, qi)).collect();
    pairwise_sum(&terms)
}

/// Shannon entropy H(P) = -Σ p_i * log(p_i)
///
/// `p` is rescaled to sum to one before the terms are taken.
pub fn entropy(p: &[f64], base: LogBase) -> Result<f64> {
    let p = rescaled(p)?;
    let terms: Vec<f64> = p.iter().map(|&x| entr(x)).collect();
    Ok(base.from_nats(pairwise_sum(&terms)))
}

/// KL Divergence D_KL(P || Q) = Σ p_i * log(p_i / q_i)
///
/// Inputs are used as given (no rescaling). Returns `+inf` when some
/// `q_i = 0` while `p_i > 0`.
pub fn kl_divergence(p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
    check_pair(p, q)?;
    Ok(base.from_nats(sum_rel_entr(p, q)))
}

/// KL divergence after rescaling both inputs to probability vectors.
pub fn relative_entropy(p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
    check_pair(p, q)?;
    let p = rescaled(p)?;
    let q = rescaled(q)?;
    Ok(base.from_nats(sum_rel_entr(&p, &q)))
}

/// Jensen-Shannon Divergence
///
/// JS(P,Q) = 0.5 * D_KL(P || M) + 0.5 * D_KL(Q || M)
/// where M = 0.5 * (P + Q), with P and Q rescaled first.
///
/// Properties:
/// - Symmetric: JS(P, Q) = JS(Q, P)
/// - Bounded: 0 <= JS <= ln 2 (natural log), 0 <= JS <= 1 (base 2)
pub fn jensen_shannon_divergence(p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
    check_pair(p, q)?;
    let p = rescaled(p)?;
    let q = rescaled(q)?;

    let m: Vec<f64> = p
        .iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| (pi + qi) / 2.0)
        .collect();

    let js = sum_rel_entr(&p, &m) + sum_rel_entr(&q, &m);
    Ok(base.from_nats(js) / 2.0)
}

/// Jensen-Shannon distance, the square root of the divergence (a metric).
pub fn jensen_shannon_distance(p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
    Ok(jensen_shannon_divergence(p, q, base)?.sqrt())
}

/// Entropy-adjusted KL used for whole-file summaries:
/// `D_KL(P̂ || Q̂) - H(P̂)`.
pub fn normalized_kl(p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
    Ok(relative_entropy(p, q, base)? - entropy(p, base)?)
}

/// The two geometric Jensen-Shannon formulas in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometricJsd {
    /// `sqrt(JS distance)`
    Simple,
    /// `sqrt(0.5 * (sqrt(KL(P||Q)) + sqrt(KL(Q||P)))) / sqrt(ln 2)`
    Normalized,
}

impl Default for GeometricJsd {
    fn default() -> Self {
        Self::Simple
    }
}

impl GeometricJsd {
    pub fn compute(self, p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
        match self {
            GeometricJsd::Simple => Ok(jensen_shannon_distance(p, q, base)?.sqrt()),
            GeometricJsd::Normalized => {
                let forward = relative_entropy(p, q, base)?;
                let backward = relative_entropy(q, p, base)?;
                Ok((0.5 * (forward.sqrt() + backward.sqrt())).sqrt() / std::f64::consts::LN_2.sqrt())
            }
        }
    }
}

/// Symmetric geometric Jensen-Shannon divergence
///
/// With M = (P + Q) / 2:
/// `0.5 * (sqrt(JSdist(P, M)) + sqrt(JSdist(Q, M))) / sqrt(ln 2)`
pub fn symmetric_geometric_jsd(p: &[f64], q: &[f64], base: LogBase) -> Result<f64> {
    check_pair(p, q)?;
    let m: Vec<f64> = p
        .iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| (pi + qi) / 2.0)
        .collect();

    let to_p = jensen_shannon_distance(p, &m, base)?;
    let to_q = jensen_shannon_distance(q, &m, base)?;
    Ok(0.5 * (to_p.sqrt() + to_q.sqrt()) / std::f64::consts::LN_2.sqrt())
}
