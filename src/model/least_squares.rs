//! Ordinary least squares via Householder QR with column pivoting
//!
//! Only the residual sum of squares and the numerical rank are needed for
//! variance decomposition, so coefficients are never back-solved.

use ndarray::Array2;

use crate::error::{AnovaError, Result};

/// Relative tolerance on remaining column norms when determining rank
const RANK_TOLERANCE: f64 = 1e-9;

/// Result of a least squares fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeastSquaresFit {
    /// Residual sum of squares
    pub rss: f64,
    /// Numerical rank of the model matrix
    pub rank: usize,
    /// Number of observations
    pub n_obs: usize,
}

impl LeastSquaresFit {
    /// Residual degrees of freedom (observations minus rank)
    pub fn residual_df(&self) -> usize {
        self.n_obs.saturating_sub(self.rank)
    }
}

/// Fit `y ~ X` by least squares and report RSS and rank
///
/// Rank-deficient matrices are handled: columns whose remaining norm falls
/// below `RANK_TOLERANCE * max column norm` are treated as dependent.
pub fn fit_least_squares(x: &Array2<f64>, y: &[f64]) -> Result<LeastSquaresFit> {
    let nrow = x.nrows();
    let ncol = x.ncols();

    if nrow == 0 {
        return Err(AnovaError::EmptyData {
            reason: "Model matrix has zero rows".to_string(),
        });
    }
    if y.len() != nrow {
        return Err(AnovaError::InvalidInput {
            reason: format!(
                "response has {} values but model matrix has {} rows",
                y.len(),
                nrow
            ),
        });
    }

    // Work on mutable copies; qty accumulates Q^T y
    let mut r = x.to_owned();
    let mut qty = y.to_vec();

    let max_norm = (0..ncol)
        .map(|j| r.column(j).iter().map(|&v| v * v).sum::<f64>().sqrt())
        .fold(0.0f64, f64::max);
    let tol = RANK_TOLERANCE * max_norm.max(1.0);

    let mut rank = 0;
    for step in 0..nrow.min(ncol) {
        // Column pivoting: remaining column with the largest norm
        let mut best_col = step;
        let mut best_norm = -1.0;
        for j in step..ncol {
            let norm: f64 = (step..nrow).map(|i| r[[i, j]] * r[[i, j]]).sum::<f64>().sqrt();
            if norm > best_norm {
                best_norm = norm;
                best_col = j;
            }
        }

        if best_norm <= tol {
            // Remaining columns lie in the span of the chosen ones
            break;
        }

        if best_col != step {
            for i in 0..nrow {
                let tmp = r[[i, step]];
                r[[i, step]] = r[[i, best_col]];
                r[[i, best_col]] = tmp;
            }
        }

        // Householder reflection zeroing r[step+1.., step]
        let mut alpha = best_norm;
        if r[[step, step]] > 0.0 {
            alpha = -alpha;
        }
        let v0 = r[[step, step]] - alpha;
        let mut v_norm_sq = v0 * v0;
        for i in (step + 1)..nrow {
            v_norm_sq += r[[i, step]] * r[[i, step]];
        }

        if v_norm_sq > f64::MIN_POSITIVE {
            let tau = 2.0 / v_norm_sq;

            for j in (step + 1)..ncol {
                let mut dot = v0 * r[[step, j]];
                for i in (step + 1)..nrow {
                    dot += r[[i, step]] * r[[i, j]];
                }
                let scale = tau * dot;
                r[[step, j]] -= scale * v0;
                for i in (step + 1)..nrow {
                    r[[i, j]] -= scale * r[[i, step]];
                }
            }

            let mut dot = v0 * qty[step];
            for i in (step + 1)..nrow {
                dot += r[[i, step]] * qty[i];
            }
            let scale = tau * dot;
            qty[step] -= scale * v0;
            for i in (step + 1)..nrow {
                qty[i] -= scale * r[[i, step]];
            }
        }

        r[[step, step]] = alpha;
        for i in (step + 1)..nrow {
            r[[i, step]] = 0.0;
        }
        rank += 1;
    }

    let rss: f64 = qty[rank..].iter().map(|&v| v * v).sum();

    if !rss.is_finite() {
        return Err(AnovaError::NumericalInstability {
            operation: "least squares".to_string(),
            details: format!("residual sum of squares is {}", rss),
        });
    }

    Ok(LeastSquaresFit {
        rss,
        rank,
        n_obs: nrow,
    })
}
