//! Core traits and types for statistical models
//!
//! This module defines the interfaces and data structures shared by the
//! estimators of PanelOxide.

use ndarray::Array1;

pub use coefficient::Coefficient;
pub use statistics::{DegreesOfFreedom, ModelStatistics};

pub use crate::error::ModelError;

pub mod coefficient;
pub mod statistics;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Trait for model results
pub trait ModelResultTrait: Send + Sync {
    /// Get coefficients
    fn coefficients(&self) -> &[Coefficient];

    /// Get fitted values
    fn fitted_values(&self) -> &Array1<f64>;

    /// Get residuals
    fn residuals(&self) -> &Array1<f64>;

    /// Get R-squared value
    fn r_squared(&self) -> Option<f64>;

    /// Get adjusted R-squared value
    fn adj_r_squared(&self) -> Option<f64>;

    /// Get AIC
    fn aic(&self) -> Option<f64>;

    /// Get BIC
    fn bic(&self) -> Option<f64>;

    /// Get log-likelihood
    fn log_likelihood(&self) -> Option<f64>;

    /// Get residual standard error
    fn residual_std_error(&self) -> Option<f64>;

    /// Get degrees of freedom for residuals
    fn df_residual(&self) -> Option<usize>;

    /// Get degrees of freedom for model
    fn df_model(&self) -> Option<usize>;
}
