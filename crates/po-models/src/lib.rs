//! Statistical models for PanelOxide
//!
//! `panel` holds the fixed-effects panel regression: entity and/or time
//! effects absorbed by demeaning, least squares through an SVD, and
//! classic, robust or cluster-robust standard errors.

pub mod base;
pub mod error;
pub mod panel;

pub use base::{Coefficient, ModelResultTrait, Result};
pub use error::{ErrorKind, ModelError};
pub use panel::{
    ClusterBy, CovarianceType, PanelConfig, PanelEffectsResult, PanelOls, panel_ols,
};
