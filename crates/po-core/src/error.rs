use crate::data::DataError;
use crate::panel::Label;

/// Errors raised while turning caller input into an aligned panel
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PanelError {
    #[error("Shape error: {message}")]
    Shape { message: String },

    #[error("Shape error: duplicate observation for entity {entity}, time {time}")]
    DuplicateKey { entity: Label, time: Label },

    #[error("Degenerate variable '{variable}': no observed levels")]
    DegenerateVariable { variable: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

impl PanelError {
    pub(crate) fn shape(message: impl Into<String>) -> Self {
        PanelError::Shape {
            message: message.into(),
        }
    }

    pub(crate) fn insufficient(message: impl Into<String>) -> Self {
        PanelError::InsufficientData {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the shape family (including key collisions)
    pub fn is_shape_error(&self) -> bool {
        matches!(self, PanelError::Shape { .. } | PanelError::DuplicateKey { .. })
    }
}

/// Result type for panel construction
pub type PanelResult<T> = std::result::Result<T, PanelError>;
