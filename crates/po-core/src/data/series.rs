//! Series data structure for holding homogeneous data
//!
//! A Series is a one-dimensional array that can hold data of a specific type.
//! It's the building block of DataFrames. Missing values are `NaN` for floats
//! and `None` for string and categorical entries; integer and boolean series
//! are always fully observed.

use super::*;

use std::collections::HashMap;

/// A Series is a typed, one-dimensional array of data
#[derive(Clone, Debug, PartialEq)]
pub enum Series {
    /// Floating point numbers (f64), `NaN` marks a missing value
    Float(FloatArray),
    /// Integer numbers (i64)
    Int(IntArray),
    /// Boolean values
    Bool(BoolArray),
    /// String values
    String(StringArray),
    /// Categorical data: codes into the category list, `None` when missing
    Categorical(Vec<Option<u32>>, Vec<String>),
}

impl Series {
    /// Create a new Float series
    pub fn float(data: impl Into<FloatArray>) -> Self {
        Series::Float(data.into())
    }

    /// Create a new Int series
    pub fn int(data: impl Into<IntArray>) -> Self {
        Series::Int(data.into())
    }

    /// Create a new Bool series
    pub fn bool(data: impl Into<BoolArray>) -> Self {
        Series::Bool(data.into())
    }

    /// Create a fully observed String series
    pub fn string<T: AsRef<str>>(data: &[T]) -> Self {
        Series::String(data.iter().map(|s| Some(s.as_ref().to_string())).collect())
    }

    /// Create a String series with missing entries
    pub fn string_opt<T: AsRef<str>>(data: &[Option<T>]) -> Self {
        Series::String(
            data.iter()
                .map(|s| s.as_ref().map(|v| v.as_ref().to_string()))
                .collect(),
        )
    }

    /// Create a new Categorical series
    ///
    /// Categories are sorted for consistent encoding.
    pub fn categorical<T: AsRef<str>>(data: &[T]) -> Self {
        let mut categories: Vec<String> = data
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect::<std::collections::HashSet<_>>()
            .into_iter()
            .collect();
        categories.sort();

        let category_map: HashMap<&str, u32> = categories
            .iter()
            .enumerate()
            .map(|(i, cat)| (cat.as_str(), i as u32))
            .collect();

        let encoded: Vec<Option<u32>> = data
            .iter()
            .map(|s| category_map.get(s.as_ref()).copied())
            .collect();

        Series::Categorical(encoded, categories)
    }

    /// Get the length of the series
    pub fn len(&self) -> usize {
        match self {
            Series::Float(arr) => arr.len(),
            Series::Int(arr) => arr.len(),
            Series::Bool(arr) => arr.len(),
            Series::String(arr) => arr.len(),
            Series::Categorical(arr, _) => arr.len(),
        }
    }

    /// Check if the series is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the type name of the series
    pub fn dtype(&self) -> &'static str {
        match self {
            Series::Float(_) => "float64",
            Series::Int(_) => "int64",
            Series::Bool(_) => "bool",
            Series::String(_) => "string",
            Series::Categorical(_, _) => "categorical",
        }
    }

    /// Whether the series holds numbers (floats, integers or booleans)
    pub fn is_numeric(&self) -> bool {
        matches!(self, Series::Float(_) | Series::Int(_) | Series::Bool(_))
    }

    /// Convert a numeric series to floats, `NaN` for missing values
    pub fn to_float(&self) -> Result<FloatArray> {
        match self {
            Series::Float(arr) => Ok(arr.clone()),
            Series::Int(arr) => Ok(arr.mapv(|v| v as f64)),
            Series::Bool(arr) => Ok(arr.mapv(|v| if v { 1.0 } else { 0.0 })),
            Series::String(_) => Err(DataError::TypeMismatch {
                expected: "numeric",
                actual: "string",
            }),
            Series::Categorical(_, _) => Err(DataError::TypeMismatch {
                expected: "numeric",
                actual: "categorical",
            }),
        }
    }

    /// Decode a string or categorical series into owned labels
    pub fn to_strings(&self) -> Result<StringArray> {
        match self {
            Series::String(vec) => Ok(vec.clone()),
            Series::Categorical(codes, cats) => Ok(codes
                .iter()
                .map(|code| code.and_then(|c| cats.get(c as usize).cloned()))
                .collect()),
            other => Err(DataError::TypeMismatch {
                expected: "string or categorical",
                actual: other.dtype(),
            }),
        }
    }
}
