//! Model-related error types

use thiserror::Error;

use po_core::PanelError;
use po_core::data::DataError;

/// Model-related errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// Input could not be turned into an aligned panel
    #[error("Panel error: {0}")]
    Panel(#[from] PanelError),

    /// Design matrix does not have full column rank
    #[error("Rank deficient design: rank {rank} of {ncols} columns, collinear columns: {columns:?}")]
    RankDeficiency {
        /// Columns involved in the linear dependence
        columns: Vec<String>,
        /// Numerical rank of the design
        rank: usize,
        /// Number of design columns
        ncols: usize,
    },

    /// Residual degrees of freedom are not positive
    #[error("Not enough data: {n_obs} observations for {n_params} parameters and {absorbed} absorbed effects")]
    InsufficientData {
        /// Number of observations
        n_obs: usize,
        /// Number of estimated parameters
        n_params: usize,
        /// Degrees of freedom absorbed by fixed effects
        absorbed: usize,
    },

    /// Clustered covariance needs at least two clusters
    #[error("Clustered covariance needs at least two clusters, got {n_clusters}")]
    TooFewClusters { n_clusters: usize },

    /// Numerical computation error
    #[error("Numerical error: {message} (operation: {operation})")]
    NumericalError {
        /// Error message
        message: String,
        /// Operation that failed
        operation: String,
    },

    /// Invalid model configuration
    #[error("Invalid model configuration: {message}")]
    InvalidConfig {
        /// Configuration error message
        message: String,
    },
}

impl From<DataError> for ModelError {
    fn from(err: DataError) -> Self {
        ModelError::Panel(PanelError::Data(err))
    }
}

/// Caller-facing error families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or ambiguous input encoding, duplicate keys
    Shape,
    /// Categorical regressor without usable levels
    DegenerateVariable,
    /// Collinear design, before or after absorption
    RankDeficiency,
    /// Non-positive residual degrees of freedom or nothing left to fit
    InsufficientData,
    /// Configuration and numerical failures
    Other,
}

impl ModelError {
    /// Family this error belongs to
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::Panel(err) => match err {
                PanelError::Shape { .. } | PanelError::DuplicateKey { .. } | PanelError::Data(_) => {
                    ErrorKind::Shape
                }
                PanelError::DegenerateVariable { .. } => ErrorKind::DegenerateVariable,
                PanelError::InsufficientData { .. } => ErrorKind::InsufficientData,
            },
            ModelError::RankDeficiency { .. } => ErrorKind::RankDeficiency,
            ModelError::InsufficientData { .. } | ModelError::TooFewClusters { .. } => {
                ErrorKind::InsufficientData
            }
            ModelError::NumericalError { .. } | ModelError::InvalidConfig { .. } => ErrorKind::Other,
        }
    }

    pub(crate) fn numerical(message: impl Into<String>, operation: &str) -> Self {
        ModelError::NumericalError {
            message: message.into(),
            operation: operation.to_string(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        ModelError::InvalidConfig {
            message: message.into(),
        }
    }
}
