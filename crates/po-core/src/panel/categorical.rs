//! Dummy-variable expansion of categorical regressors
//!
//! A categorical variable with `L` observed levels becomes `L - 1` indicator
//! columns named `variable.level`; the reference level (the first level under
//! the configured [`LevelOrder`]) is dropped so the indicators are not
//! collinear with the absorbed effects. Numeric variables pass through.

use std::collections::HashSet;

use log::warn;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{EntityContainer, PanelColumn};
use crate::error::{PanelError, PanelResult};

/// Ordering of categorical levels, which also picks the reference level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LevelOrder {
    /// First appearance in the canonical (entity, time) order of the panel
    #[default]
    FirstSeen,
    /// Lexicographic order of the level labels
    Sorted,
}

/// What happened to one categorical variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub variable: String,
    /// Observed levels in expansion order
    pub levels: Vec<String>,
    /// Dropped level, `None` when every level was kept
    pub reference: Option<String>,
}

/// Expansion bookkeeping reported back to the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionReport {
    pub categoricals: Vec<CategoricalSummary>,
    /// Categoricals with a single observed level; they expand to no columns
    pub degenerate: Vec<String>,
}

/// Regressor matrix after expansion
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedDesign {
    names: Vec<String>,
    matrix: Array2<f64>,
    report: ExpansionReport,
}

impl ExpandedDesign {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `n x k` matrix, columns in the order of `names`
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn report(&self) -> &ExpansionReport {
        &self.report
    }

    pub fn ncols(&self) -> usize {
        self.names.len()
    }

    pub fn into_parts(self) -> (Vec<String>, Array2<f64>, ExpansionReport) {
        (self.names, self.matrix, self.report)
    }
}

struct ExpandedVariable {
    columns: Vec<(String, Array1<f64>)>,
    summary: Option<CategoricalSummary>,
}

/// Expands categorical regressors into indicator columns
#[derive(Debug, Clone, Copy)]
pub struct CategoricalExpander {
    order: LevelOrder,
    drop_first: bool,
}

impl Default for CategoricalExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoricalExpander {
    pub fn new() -> Self {
        Self {
            order: LevelOrder::FirstSeen,
            drop_first: true,
        }
    }

    pub fn with_order(mut self, order: LevelOrder) -> Self {
        self.order = order;
        self
    }

    /// Keep every level instead of dropping the reference level
    pub fn with_drop_first(mut self, drop_first: bool) -> Self {
        self.drop_first = drop_first;
        self
    }

    /// Observed levels of a categorical column in expansion order
    pub fn levels(&self, values: &[Option<String>]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut levels: Vec<String> = values
            .iter()
            .flatten()
            .filter(|v| seen.insert(v.as_str()))
            .cloned()
            .collect();
        if self.order == LevelOrder::Sorted {
            levels.sort();
        }
        levels
    }

    /// Expand every regressor, keeping variable order
    ///
    /// Variables are expanded independently and in parallel.
    pub fn expand(&self, n_obs: usize, regressors: &[EntityContainer]) -> PanelResult<ExpandedDesign> {
        let expanded: Vec<ExpandedVariable> = regressors
            .par_iter()
            .map(|var| self.expand_variable(n_obs, var))
            .collect::<PanelResult<_>>()?;

        let mut names: Vec<String> = Vec::new();
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        let mut report = ExpansionReport::default();
        for var in expanded {
            if let Some(summary) = var.summary {
                if summary.levels.len() == 1 && self.drop_first {
                    warn!(
                        "categorical '{}' has a single level '{}' and expands to no columns",
                        summary.variable, summary.levels[0]
                    );
                    report.degenerate.push(summary.variable.clone());
                }
                report.categoricals.push(summary);
            }
            for (name, column) in var.columns {
                if !seen.insert(name.clone()) {
                    return Err(PanelError::shape(format!(
                        "expanded column name '{}' is not unique",
                        name
                    )));
                }
                names.push(name);
                columns.push(column);
            }
        }

        let mut matrix = Array2::zeros((n_obs, columns.len()));
        for (j, column) in columns.iter().enumerate() {
            matrix.column_mut(j).assign(column);
        }

        Ok(ExpandedDesign {
            names,
            matrix,
            report,
        })
    }

    fn expand_variable(&self, n_obs: usize, var: &EntityContainer) -> PanelResult<ExpandedVariable> {
        if var.len() != n_obs {
            return Err(PanelError::shape(format!(
                "variable '{}' has {} observations, expected {}",
                var.name(),
                var.len(),
                n_obs
            )));
        }

        match var.column() {
            PanelColumn::Numeric(values) => Ok(ExpandedVariable {
                columns: vec![(var.name().to_string(), values.clone())],
                summary: None,
            }),
            PanelColumn::Categorical(values) => {
                let levels = self.levels(values);
                if levels.is_empty() {
                    return Err(PanelError::DegenerateVariable {
                        variable: var.name().to_string(),
                    });
                }

                let skip = usize::from(self.drop_first);
                let columns = levels
                    .iter()
                    .skip(skip)
                    .map(|level| {
                        let indicator: Array1<f64> = values
                            .iter()
                            .map(|v| match v {
                                Some(v) if v == level => 1.0,
                                _ => 0.0,
                            })
                            .collect();
                        (format!("{}.{}", var.name(), level), indicator)
                    })
                    .collect();

                let reference = self.drop_first.then(|| levels[0].clone());
                Ok(ExpandedVariable {
                    columns,
                    summary: Some(CategoricalSummary {
                        variable: var.name().to_string(),
                        levels,
                        reference,
                    }),
                })
            }
        }
    }
}
