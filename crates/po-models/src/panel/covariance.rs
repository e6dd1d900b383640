//! Parameter covariance estimators
//!
//! Each estimator is a pure function of the transformed design, the
//! residuals and `(X'X)⁻¹`.

use ndarray::{Array2, ArrayView1, Axis};

use crate::base::{ModelError, Result};

/// Homoskedastic covariance `s² (X'X)⁻¹` with `s² = e'e / df_resid`
pub fn classic(xtx_inv: &Array2<f64>, residuals: ArrayView1<f64>, df_resid: usize) -> Array2<f64> {
    let s2 = residuals.dot(&residuals) / df_resid as f64;
    xtx_inv * s2
}

/// White heteroskedasticity-robust covariance
///
/// `(X'X)⁻¹ (Σ eᵢ² xᵢxᵢ') (X'X)⁻¹`, scaled by `n / df_resid` when
/// `debiased`.
pub fn robust(
    x: &Array2<f64>,
    residuals: ArrayView1<f64>,
    xtx_inv: &Array2<f64>,
    df_resid: usize,
    debiased: bool,
) -> Array2<f64> {
    let scores = x * &residuals.insert_axis(Axis(1));
    let meat = scores.t().dot(&scores);
    let scale = if debiased {
        x.nrows() as f64 / df_resid as f64
    } else {
        1.0
    };
    sandwich(xtx_inv, &meat) * scale
}

/// Cluster-robust covariance
///
/// `(X'X)⁻¹ (Σ_g s_g s_g') (X'X)⁻¹` with `s_g = X_g' e_g` summed over the
/// observations of cluster `g`. `clusters` holds dense codes in
/// `0..n_clusters`. When `debiased`, the result is scaled by
/// `G / (G - 1) · (n - 1) / (n - k)`.
pub fn clustered(
    x: &Array2<f64>,
    residuals: ArrayView1<f64>,
    xtx_inv: &Array2<f64>,
    clusters: &[usize],
    n_clusters: usize,
    debiased: bool,
) -> Result<Array2<f64>> {
    let (n, k) = x.dim();
    if clusters.len() != n {
        return Err(ModelError::numerical(
            format!("{} cluster labels for {} observations", clusters.len(), n),
            "clustered",
        ));
    }

    if let Some(&bad) = clusters.iter().find(|&&c| c >= n_clusters) {
        return Err(ModelError::numerical(
            format!("cluster code {} outside 0..{}", bad, n_clusters),
            "clustered",
        ));
    }
    let g = n_clusters;
    if g < 2 {
        return Err(ModelError::TooFewClusters { n_clusters: g });
    }

    let scores = x * &residuals.insert_axis(Axis(1));
    let mut cluster_scores = Array2::<f64>::zeros((g, k));
    for (i, &c) in clusters.iter().enumerate() {
        let mut target = cluster_scores.row_mut(c);
        target += &scores.row(i);
    }
    let meat = cluster_scores.t().dot(&cluster_scores);

    let scale = if debiased {
        let (n, k, g) = (n as f64, k as f64, g as f64);
        g / (g - 1.0) * (n - 1.0) / (n - k)
    } else {
        1.0
    };
    Ok(sandwich(xtx_inv, &meat) * scale)
}

fn sandwich(bread: &Array2<f64>, meat: &Array2<f64>) -> Array2<f64> {
    bread.dot(meat).dot(bread)
}
