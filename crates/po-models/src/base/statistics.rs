//! Statistical structures for model results

use serde::{Deserialize, Serialize};

/// Goodness-of-fit statistics of a panel regression
///
/// Sums of squares refer to the transformed (demeaned) data, so `r_squared`
/// is the within R² whenever effects are absorbed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStatistics {
    /// Residual sum of squares
    pub rss: f64,
    /// Total sum of squares of the transformed dependent variable
    pub tss: f64,
    /// R-squared, `None` when the dependent variable has no variation left
    pub r_squared: Option<f64>,
    /// Adjusted R-squared
    pub adj_r_squared: Option<f64>,
    /// Residual standard error
    pub residual_std_error: f64,
    /// F-statistic for joint significance of the slopes
    pub f_statistic: Option<f64>,
    /// F-statistic p-value
    pub f_p_value: Option<f64>,
    /// Gaussian log-likelihood, `None` for a perfect fit
    pub log_likelihood: Option<f64>,
    /// AIC
    pub aic: Option<f64>,
    /// BIC
    pub bic: Option<f64>,
}

/// Degrees-of-freedom bookkeeping of a fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreesOfFreedom {
    /// Observations used in estimation
    pub n_obs: usize,
    /// Estimated parameters, the constant included
    pub n_params: usize,
    /// Degrees of freedom absorbed by the fixed effects
    pub absorbed: usize,
    /// `n_obs - n_params - absorbed`
    pub residual: usize,
    /// Slope parameters tested by the F statistic
    pub model: usize,
    /// Entities in the estimation sample
    pub n_entities: usize,
    /// Time periods in the estimation sample
    pub n_times: usize,
}
