//! Two-sample Kolmogorov-Smirnov test.
//!
//! The statistic is the largest gap between the two empirical CDFs,
//! evaluated at every pooled observation. The two-sided p-value comes from
//! the exact lattice-path distribution for small samples and from the
//! Kolmogorov limiting distribution otherwise.

use crate::error::{DivergenceError, Result};
use serde::{Deserialize, Serialize};

/// Largest sample size for which [`KsMethod::Auto`] uses the exact distribution
pub const MAX_EXACT_N: usize = 10_000;

/// Terms of the Kolmogorov series are dropped below this magnitude
const SERIES_TOLERANCE: f64 = 1e-17;

/// How the p-value is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KsMethod {
    /// Exact for `max(n1, n2) <= 10_000`, asymptotic otherwise
    Auto,
    /// Exact lattice-path probability (falls back to asymptotic if the
    /// lattice is too large to index)
    Exact,
    /// Kolmogorov limiting distribution
    Asymptotic,
}

impl Default for KsMethod {
    fn default() -> Self {
        Self::Auto
    }
}

/// Statistic and two-sided p-value of a two-sample KS test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: f64,
    pub pvalue: f64,
}

/// Two-sample, two-sided Kolmogorov-Smirnov test.
pub fn ks_2samp(sample_a: &[f64], sample_b: &[f64], method: KsMethod) -> Result<KsResult> {
    if sample_a.is_empty() || sample_b.is_empty() {
        return Err(DivergenceError::EmptyInput("KS sample"));
    }
    if sample_a.iter().chain(sample_b).any(|x| x.is_nan()) {
        return Err(DivergenceError::NumericalError(
            "KS sample contains NaN".to_string(),
        ));
    }

    let mut a = sample_a.to_vec();
    let mut b = sample_b.to_vec();
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);

    let statistic = ecdf_max_gap(&a, &b);
    let (n1, n2) = (a.len(), b.len());

    let use_exact = match method {
        KsMethod::Auto => n1.max(n2) <= MAX_EXACT_N,
        KsMethod::Exact => true,
        KsMethod::Asymptotic => false,
    };

    if use_exact {
        if let Some(result) = exact_two_sided(n1, n2, statistic) {
            return Ok(result);
        }
    }

    Ok(KsResult {
        statistic,
        pvalue: asymptotic_two_sided(n1, n2, statistic),
    })
}

/// `max |F_a(x) - F_b(x)|` over all pooled observations. Both inputs sorted.
fn ecdf_max_gap(a: &[f64], b: &[f64]) -> f64 {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let mut max_diff = f64::NEG_INFINITY;
    let mut min_diff = f64::INFINITY;

    for &x in a.iter().chain(b) {
        let cdf_a = a.partition_point(|&v| v <= x) as f64 / n1;
        let cdf_b = b.partition_point(|&v| v <= x) as f64 / n2;
        let diff = cdf_a - cdf_b;
        max_diff = max_diff.max(diff);
        min_diff = min_diff.min(diff);
    }

    let min_side = (-min_diff).clamp(0.0, 1.0);
    min_side.max(max_diff)
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Exact two-sided p-value, or `None` when the lattice is too large or the
/// recursion loses precision.
fn exact_two_sided(n1: usize, n2: usize, statistic: f64) -> Option<KsResult> {
    let g = gcd(n1, n2);
    let (n1g, n2g) = (n1 / g, n2 / g);
    if n1g as f64 >= i32::MAX as f64 / n2g as f64 {
        return None;
    }

    // Snap the statistic onto the lattice of attainable values.
    let lcm = n1g * n2;
    let h = (statistic * lcm as f64).round() as usize;
    let statistic = h as f64 / lcm as f64;
    if h == 0 {
        return Some(KsResult {
            statistic,
            pvalue: 1.0,
        });
    }

    let pvalue = if n1 == n2 {
        prob_outside_square(n1, h)
    } else {
        prob_outside_band(n1, n2, g, h)
    };

    if !(0.0..=1.0).contains(&pvalue) {
        return None;
    }
    Some(KsResult { statistic, pvalue })
}

/// `P(D_{n,n} >= h / n)` as an alternating binomial sum in Horner form.
fn prob_outside_square(n: usize, h: usize) -> f64 {
    let (n_f, h_f) = (n as f64, h as f64);
    let mut prob = 0.0;
    let mut k = (n / h) as i64;
    while k >= 0 {
        let kf = k as f64;
        let mut term = 1.0;
        for j in 0..h {
            let j = j as f64;
            term = (n_f - kf * h_f - j) * term / (n_f + kf * h_f + j + 1.0);
        }
        prob = term * (1.0 - prob);
        k -= 1;
    }
    2.0 * prob
}

/// Fraction of monotone lattice paths from (0, 0) to (m, n) that leave the
/// band `|i * n/g - j * m/g| < h`.
///
/// Each cell holds the share of paths reaching it that have already left
/// the band: 1 outside, and inside
/// `w(i, j) = i/(i+j) w(i-1, j) + j/(i+j) w(i, j-1)`. Carrying the outside
/// share keeps p-values far below machine epsilon.
fn prob_outside_band(m: usize, n: usize, g: usize, h: usize) -> f64 {
    let (mg, ng) = (m / g, n / g);
    let outside = |i: usize, j: usize| (i * ng).abs_diff(j * mg) >= h;

    let mut row = vec![0.0f64; n + 1];
    for j in 1..=n {
        row[j] = if outside(0, j) { 1.0 } else { row[j - 1] };
    }

    for i in 1..=m {
        let fi = i as f64;
        if outside(i, 0) {
            row[0] = 1.0;
        }
        for j in 1..=n {
            row[j] = if outside(i, j) {
                1.0
            } else {
                let fj = j as f64;
                (fi * row[j] + fj * row[j - 1]) / (fi + fj)
            };
        }
    }

    row[n]
}

/// Two-sided p-value from the Kolmogorov distribution at
/// `sqrt(n1 n2 / (n1 + n2)) * D`.
fn asymptotic_two_sided(n1: usize, n2: usize, statistic: f64) -> f64 {
    let (m, n) = (n1 as f64, n2 as f64);
    let en = m * n / (m + n);
    kolmogorov_sf(en.sqrt() * statistic).clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution.
pub fn kolmogorov_sf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 1.0;
    }

    if x < 1.0 {
        // Jacobi theta form of the CDF converges quickly for small x.
        let pi2 = std::f64::consts::PI * std::f64::consts::PI;
        let mut cdf = 0.0;
        let mut k = 1.0f64;
        loop {
            let odd = 2.0 * k - 1.0;
            let term = (-odd * odd * pi2 / (8.0 * x * x)).exp();
            cdf += term;
            if term < SERIES_TOLERANCE {
                break;
            }
            k += 1.0;
        }
        let cdf = (2.0 * std::f64::consts::PI).sqrt() / x * cdf;
        return 1.0 - cdf;
    }

    let mut sf = 0.0;
    let mut sign = 1.0;
    let mut k = 1.0f64;
    loop {
        let term = (-2.0 * k * k * x * x).exp();
        sf += sign * term;
        if term < SERIES_TOLERANCE {
            break;
        }
        sign = -sign;
        k += 1.0;
    }
    2.0 * sf
}
