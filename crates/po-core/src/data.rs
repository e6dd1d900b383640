//! Tabular data structures for PanelOxide
//!
//! A `DataFrame` of typed `Series` is the labelled-table input of the panel
//! layer. Columns keep their caller-facing names; the panel adapter reads
//! entity/time keys and variables out of it.

mod builder;
mod dataframe;
mod series;


// Re-exports
pub use builder::DataFrameBuilder;
pub use dataframe::DataFrame;
pub use series::Series;

// Type aliases for common use cases
pub type FloatArray = ndarray::Array1<f64>;
pub type IntArray = ndarray::Array1<i64>;
pub type BoolArray = ndarray::Array1<bool>;
pub type StringArray = Vec<Option<String>>;

/// Error types specific to data operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Invalid column type: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
}

/// Result type for data operations
pub type Result<T> = std::result::Result<T, DataError>;
