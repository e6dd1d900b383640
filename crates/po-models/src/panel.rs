//! Fixed-effects panel regression
//!
//! The estimator runs a fixed pipeline:
//! - adapt and align the dependent and independent inputs ([`po_core::panel`]),
//! - expand categorical regressors into indicator columns,
//! - drop singleton groups and absorb entity and/or time effects
//!   ([`WithinTransformer`]),
//! - solve the least-squares problem on the transformed data through an SVD
//!   ([`ols`]),
//! - estimate the parameter covariance ([`covariance`]).
//!
//! [`panel_ols`] is the one-call entry point; [`PanelOls`] exposes the full
//! configuration.

pub mod covariance;
pub mod effects;
pub mod model;
pub mod ols;
pub mod result;


pub use effects::{Demeaned, Effects, SingletonFilter, WithinTransformer};
pub use model::PanelOls;
pub use ols::LeastSquares;
pub use result::{FitDiagnostics, PanelEffectsResult};

use po_core::panel::{LevelOrder, PanelInput};
use serde::{Deserialize, Serialize};

use crate::base::{ModelError, Result};

/// Panel model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Absorb one effect per entity
    pub entity_effects: bool,
    /// Absorb one effect per time period
    pub time_effects: bool,
    /// Parameter covariance estimator
    pub cov_type: CovarianceType,
    /// Grouping used by [`CovarianceType::Clustered`]
    pub cluster_by: ClusterBy,
    /// Apply the small-sample correction to the covariance
    pub debiased: bool,
    /// Confidence level for intervals
    pub confidence_level: f64,
    /// Whether to include a constant
    pub intercept: bool,
    /// Level ordering of categorical regressors, decides the reference level
    pub level_order: LevelOrder,
    /// Drop the reference level of each categorical
    pub drop_first: bool,
    /// Relative singular-value cutoff, `max(n, k) * eps` when unset
    pub rank_tolerance: Option<f64>,
    /// Convergence tolerance of two-way demeaning on unbalanced panels
    pub demean_tolerance: f64,
    /// Iteration cap of two-way demeaning on unbalanced panels
    pub max_iter: usize,
}

/// Parameter covariance estimators
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CovarianceType {
    /// Homoskedastic: `s² (X'X)⁻¹`
    #[default]
    Classic,
    /// Heteroskedasticity-robust sandwich (White)
    Robust,
    /// Cluster-robust sandwich
    Clustered,
}

/// Cluster dimension of the clustered covariance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterBy {
    #[default]
    Entity,
    Time,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            entity_effects: false,
            time_effects: false,
            cov_type: CovarianceType::Classic,
            cluster_by: ClusterBy::Entity,
            debiased: false,
            confidence_level: 0.95,
            intercept: false,
            level_order: LevelOrder::FirstSeen,
            drop_first: true,
            rank_tolerance: None,
            demean_tolerance: 1e-10,
            max_iter: 10_000,
        }
    }
}

impl PanelConfig {
    pub fn entity_effects(mut self, yes: bool) -> Self {
        self.entity_effects = yes;
        self
    }

    pub fn time_effects(mut self, yes: bool) -> Self {
        self.time_effects = yes;
        self
    }

    pub fn cov_type(mut self, cov_type: CovarianceType) -> Self {
        self.cov_type = cov_type;
        self
    }

    /// Clustered covariance over the given dimension
    pub fn clustered(mut self, by: ClusterBy) -> Self {
        self.cov_type = CovarianceType::Clustered;
        self.cluster_by = by;
        self
    }

    pub fn debiased(mut self, yes: bool) -> Self {
        self.debiased = yes;
        self
    }

    pub fn confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn intercept(mut self, yes: bool) -> Self {
        self.intercept = yes;
        self
    }

    pub fn level_order(mut self, order: LevelOrder) -> Self {
        self.level_order = order;
        self
    }

    pub fn drop_first(mut self, yes: bool) -> Self {
        self.drop_first = yes;
        self
    }

    pub fn rank_tolerance(mut self, tolerance: f64) -> Self {
        self.rank_tolerance = Some(tolerance);
        self
    }

    pub fn demean_tolerance(mut self, tolerance: f64) -> Self {
        self.demean_tolerance = tolerance;
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Effects selected by the two flags
    pub fn effects(&self) -> Effects {
        Effects::from_flags(self.entity_effects, self.time_effects)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ModelError::invalid_config(format!(
                "confidence_level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if let Some(tol) = self.rank_tolerance {
            if !(tol > 0.0 && tol.is_finite()) {
                return Err(ModelError::invalid_config(format!(
                    "rank_tolerance must be positive, got {}",
                    tol
                )));
            }
        }
        if !(self.demean_tolerance > 0.0 && self.demean_tolerance.is_finite()) {
            return Err(ModelError::invalid_config(format!(
                "demean_tolerance must be positive, got {}",
                self.demean_tolerance
            )));
        }
        if self.max_iter == 0 {
            return Err(ModelError::invalid_config("max_iter must be at least 1"));
        }
        Ok(())
    }
}

/// Fit a fixed-effects panel regression in one call
///
/// Both inputs may use any accepted encoding; see [`PanelInput`].
///
/// # Examples
///
/// ```
/// use ndarray::array;
/// use po_core::panel::PanelInput;
/// use po_models::panel::{CovarianceType, panel_ols};
///
/// // [time, entity]
/// let y = array![[1.0, 2.0, 5.0], [2.0, 3.0, 6.0]];
/// let x = array![[1.0, 2.0, 3.0], [1.0, 2.0, 4.0]];
/// let fit = panel_ols(
///     PanelInput::array2(y),
///     PanelInput::array2(x),
///     true,
///     false,
///     CovarianceType::Classic,
/// )
/// .unwrap();
/// assert!((fit.params()[0] - 1.0).abs() < 1e-12);
/// ```
pub fn panel_ols(
    dependent: PanelInput,
    independent: PanelInput,
    entity_effects: bool,
    time_effects: bool,
    cov_type: CovarianceType,
) -> Result<PanelEffectsResult> {
    PanelOls::new(dependent, independent)
        .entity_effects(entity_effects)
        .time_effects(time_effects)
        .cov_type(cov_type)
        .fit()
}
