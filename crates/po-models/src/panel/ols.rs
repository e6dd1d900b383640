//! Least squares through the singular value decomposition
//!
//! `X'X` is never formed or inverted. With `X = U Σ Vᵀ` the solution is
//! `β = V Σ⁻¹ Uᵀ y` and `(X'X)⁻¹ = V Σ⁻² Vᵀ`; a singular value below the rank
//! cutoff marks a collinear design, and the matching right singular vector
//! names the columns involved.

use log::debug;
use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

use crate::base::{ModelError, Result};

/// Loading above which a column counts as part of a null-space direction
const NULL_SPACE_LOADING: f64 = 1e-6;

/// Solution of a full-rank least-squares problem
#[derive(Debug, Clone, PartialEq)]
pub struct LeastSquares {
    /// Coefficients
    pub params: Array1<f64>,
    /// `(X'X)⁻¹`
    pub xtx_inv: Array2<f64>,
    /// Singular values of `X`, descending
    pub singular_values: Vec<f64>,
}

impl LeastSquares {
    /// Ratio of the largest to the smallest singular value
    pub fn condition_number(&self) -> f64 {
        match (self.singular_values.first(), self.singular_values.last()) {
            (Some(&max), Some(&min)) if min > 0.0 => max / min,
            _ => f64::INFINITY,
        }
    }
}

/// Solve `min ||y - Xβ||²`
///
/// `rank_tolerance` is relative to the largest singular value and defaults
/// to `max(n, k) * f64::EPSILON`. A rank-deficient design is a
/// [`ModelError::RankDeficiency`] listing the collinear columns of `names`.
pub fn solve(
    x: &Array2<f64>,
    y: &Array1<f64>,
    names: &[String],
    rank_tolerance: Option<f64>,
) -> Result<LeastSquares> {
    let (n, k) = x.dim();
    if y.len() != n || names.len() != k {
        return Err(ModelError::numerical(
            format!(
                "design is {} x {} with {} names, response has {} rows",
                n,
                k,
                names.len(),
                y.len()
            ),
            "solve",
        ));
    }
    if k == 0 {
        return Ok(LeastSquares {
            params: Array1::zeros(0),
            xtx_inv: Array2::zeros((0, 0)),
            singular_values: Vec::new(),
        });
    }

    let matrix = DMatrix::from_fn(n, k, |i, j| x[[i, j]]);
    let svd = matrix.svd(true, true);
    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| ModelError::numerical("left singular vectors missing", "svd"))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| ModelError::numerical("right singular vectors missing", "svd"))?;
    let sigma = &svd.singular_values;

    let sigma_max = sigma.iter().fold(0.0_f64, |acc, &s| acc.max(s));
    let relative = rank_tolerance.unwrap_or(n.max(k) as f64 * f64::EPSILON);
    let cutoff = relative * sigma_max;
    let null_directions: Vec<usize> = (0..sigma.len()).filter(|&l| !(sigma[l] > cutoff)).collect();
    // a thin SVD of a wide matrix has fewer than k singular values
    let rank = sigma.len() - null_directions.len();

    if rank < k {
        let columns = collinear_columns(v_t, &null_directions, names, sigma.len() < k);
        return Err(ModelError::RankDeficiency {
            columns,
            rank,
            ncols: k,
        });
    }

    let y_vec = DVector::from_iterator(n, y.iter().copied());
    let uty = u.transpose() * y_vec;
    let scaled = DVector::from_fn(sigma.len(), |l, _| uty[l] / sigma[l]);
    let beta = v_t.transpose() * scaled;

    let inv_sq = DMatrix::from_diagonal(&sigma.map(|s| 1.0 / (s * s)));
    let xtx_inv = v_t.transpose() * inv_sq * v_t;

    let mut singular_values: Vec<f64> = sigma.iter().copied().collect();
    singular_values.sort_by(|a, b| b.total_cmp(a));
    debug!(
        "least squares: {} observations, {} columns, condition number {:.3e}",
        n,
        k,
        singular_values[0] / singular_values[k - 1]
    );

    Ok(LeastSquares {
        params: Array1::from_iter(beta.iter().copied()),
        xtx_inv: Array2::from_shape_fn((k, k), |(i, j)| xtx_inv[(i, j)]),
        singular_values,
    })
}

fn collinear_columns(
    v_t: &DMatrix<f64>,
    null_directions: &[usize],
    names: &[String],
    wide: bool,
) -> Vec<String> {
    if wide {
        return names.to_vec();
    }
    let mut involved = vec![false; names.len()];
    for &l in null_directions {
        for (j, flag) in involved.iter_mut().enumerate() {
            if v_t[(l, j)].abs() > NULL_SPACE_LOADING {
                *flag = true;
            }
        }
    }
    names
        .iter()
        .zip(involved)
        .filter(|(_, flag)| *flag)
        .map(|(name, _)| name.clone())
        .collect()
}
