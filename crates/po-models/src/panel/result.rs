//! Fixed-effects regression result
//!
//! A [`PanelEffectsResult`] is an immutable snapshot of a successful fit;
//! nothing in it refers back to the inputs.

use ndarray::{Array1, Array2};
use po_core::panel::{ExpansionReport, Label};
use serde::Serialize;

use super::{Effects, PanelConfig};
use crate::base::{Coefficient, DegreesOfFreedom, ModelResultTrait, ModelStatistics};

/// Sample bookkeeping that does not change the estimates
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FitDiagnostics {
    /// Slots dropped because the dependent or a regressor was missing
    pub n_missing_dropped: usize,
    /// Observations removed as singleton groups, `(entity, time)` keys
    pub dropped_singletons: Vec<(Label, Label)>,
    /// Categorical expansion summary, single-level categoricals included
    pub expansion: ExpansionReport,
    /// Alternating-projection sweeps of two-way demeaning, 0 when unused
    pub iterations: usize,
    /// Ratio of the extreme singular values of the transformed design
    pub condition_number: f64,
}

impl FitDiagnostics {
    /// Categoricals that expanded to no columns
    pub fn degenerate(&self) -> &[String] {
        &self.expansion.degenerate
    }
}

/// Result of a fixed-effects panel regression
#[derive(Debug, Clone, Serialize)]
pub struct PanelEffectsResult {
    pub(crate) names: Vec<String>,
    pub(crate) params: Array1<f64>,
    pub(crate) cov: Array2<f64>,
    pub(crate) std_errors: Array1<f64>,
    pub(crate) t_stats: Array1<f64>,
    pub(crate) p_values: Array1<f64>,
    pub(crate) ci_lower: Array1<f64>,
    pub(crate) ci_upper: Array1<f64>,
    pub(crate) coefficients: Vec<Coefficient>,
    pub(crate) dependent_name: String,
    pub(crate) demeaned_dependent: Array1<f64>,
    pub(crate) fitted_values: Array1<f64>,
    pub(crate) residuals: Array1<f64>,
    pub(crate) effects: Effects,
    pub(crate) df: DegreesOfFreedom,
    pub(crate) statistics: ModelStatistics,
    pub(crate) diagnostics: FitDiagnostics,
    pub(crate) config: PanelConfig,
}

impl PanelEffectsResult {
    /// Column names, in the order of every parameter vector
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn params(&self) -> &Array1<f64> {
        &self.params
    }

    /// Estimate of a named parameter
    pub fn param(&self, name: &str) -> Option<f64> {
        self.position(name).map(|j| self.params[j])
    }

    /// Standard error of a named parameter
    pub fn std_error(&self, name: &str) -> Option<f64> {
        self.position(name).map(|j| self.std_errors[j])
    }

    /// Parameter covariance
    pub fn cov(&self) -> &Array2<f64> {
        &self.cov
    }

    pub fn std_errors(&self) -> &Array1<f64> {
        &self.std_errors
    }

    pub fn t_stats(&self) -> &Array1<f64> {
        &self.t_stats
    }

    pub fn p_values(&self) -> &Array1<f64> {
        &self.p_values
    }

    /// `k x 2` matrix of lower and upper confidence bounds
    pub fn conf_int(&self) -> Array2<f64> {
        let mut bounds = Array2::zeros((self.params.len(), 2));
        bounds.column_mut(0).assign(&self.ci_lower);
        bounds.column_mut(1).assign(&self.ci_upper);
        bounds
    }

    /// Coefficient table
    pub fn coefficients_table(&self) -> &[Coefficient] {
        &self.coefficients
    }

    pub fn dependent_name(&self) -> &str {
        &self.dependent_name
    }

    /// Dependent variable after absorbing the effects
    pub fn demeaned_dependent(&self) -> &Array1<f64> {
        &self.demeaned_dependent
    }

    pub fn effects(&self) -> Effects {
        self.effects
    }

    pub fn df(&self) -> &DegreesOfFreedom {
        &self.df
    }

    pub fn n_obs(&self) -> usize {
        self.df.n_obs
    }

    pub fn statistics(&self) -> &ModelStatistics {
        &self.statistics
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    /// Configuration the model was fitted with
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Residual sum of squares
    pub fn rss(&self) -> f64 {
        self.statistics.rss
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl ModelResultTrait for PanelEffectsResult {
    fn coefficients(&self) -> &[Coefficient] {
        &self.coefficients
    }

    fn fitted_values(&self) -> &Array1<f64> {
        &self.fitted_values
    }

    fn residuals(&self) -> &Array1<f64> {
        &self.residuals
    }

    fn r_squared(&self) -> Option<f64> {
        self.statistics.r_squared
    }

    fn adj_r_squared(&self) -> Option<f64> {
        self.statistics.adj_r_squared
    }

    fn aic(&self) -> Option<f64> {
        self.statistics.aic
    }

    fn bic(&self) -> Option<f64> {
        self.statistics.bic
    }

    fn log_likelihood(&self) -> Option<f64> {
        self.statistics.log_likelihood
    }

    fn residual_std_error(&self) -> Option<f64> {
        Some(self.statistics.residual_std_error)
    }

    fn df_residual(&self) -> Option<usize> {
        Some(self.df.residual)
    }

    fn df_model(&self) -> Option<usize> {
        Some(self.df.model)
    }
}
