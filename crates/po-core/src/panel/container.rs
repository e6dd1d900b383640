//! Canonical per-variable panel storage
//!
//! Every accepted input shape is resolved into a [`PanelData`]: one
//! [`EntityContainer`] per variable, all aligned position-by-position on a
//! shared [`PanelIndex`].

use std::collections::HashSet;

use ndarray::Array1;

use super::{Label, PanelIndex};
use crate::error::{PanelError, PanelResult};

/// Values of one variable, tagged numeric or categorical at adaptation time
#[derive(Debug, Clone, PartialEq)]
pub enum PanelColumn {
    /// Numeric observations, `NaN` marks a missing slot
    Numeric(Array1<f64>),
    /// Categorical observations, `None` marks a missing slot
    Categorical(Vec<Option<String>>),
}

impl PanelColumn {
    pub fn len(&self) -> usize {
        match self {
            PanelColumn::Numeric(values) => values.len(),
            PanelColumn::Categorical(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, PanelColumn::Categorical(_))
    }

    /// Whether slot `idx` holds an observed value
    pub fn is_observed(&self, idx: usize) -> bool {
        match self {
            PanelColumn::Numeric(values) => values.get(idx).is_some_and(|v| !v.is_nan()),
            PanelColumn::Categorical(values) => values.get(idx).is_some_and(Option::is_some),
        }
    }

    /// Number of observed slots
    pub fn observed_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_observed(i)).count()
    }

    /// Gather the slots at `positions`, in order
    pub(crate) fn take(&self, positions: &[usize]) -> Self {
        match self {
            PanelColumn::Numeric(values) => {
                PanelColumn::Numeric(positions.iter().map(|&i| values[i]).collect())
            }
            PanelColumn::Categorical(values) => {
                PanelColumn::Categorical(positions.iter().map(|&i| values[i].clone()).collect())
            }
        }
    }
}

/// One named variable observed across entities and time periods
#[derive(Debug, Clone, PartialEq)]
pub struct EntityContainer {
    name: String,
    column: PanelColumn,
}

impl EntityContainer {
    pub fn new(name: impl Into<String>, column: PanelColumn) -> Self {
        Self {
            name: name.into(),
            column,
        }
    }

    pub fn numeric(name: impl Into<String>, values: impl Into<Array1<f64>>) -> Self {
        Self::new(name, PanelColumn::Numeric(values.into()))
    }

    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self::new(name, PanelColumn::Categorical(values))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column(&self) -> &PanelColumn {
        &self.column
    }

    pub fn is_categorical(&self) -> bool {
        self.column.is_categorical()
    }

    pub fn len(&self) -> usize {
        self.column.len()
    }

    pub fn is_empty(&self) -> bool {
        self.column.is_empty()
    }

    pub(crate) fn take(&self, positions: &[usize]) -> Self {
        Self {
            name: self.name.clone(),
            column: self.column.take(positions),
        }
    }
}

/// A set of variables sharing one panel index
#[derive(Debug, Clone, PartialEq)]
pub struct PanelData {
    index: PanelIndex,
    variables: Vec<EntityContainer>,
}

impl PanelData {
    /// Bundle variables with their index
    ///
    /// Every variable must have one slot per index position and names must
    /// be unique.
    pub fn new(index: PanelIndex, variables: Vec<EntityContainer>) -> PanelResult<Self> {
        let mut seen = HashSet::new();
        for var in &variables {
            if var.len() != index.len() {
                return Err(PanelError::shape(format!(
                    "variable '{}' has {} observations, panel index has {}",
                    var.name(),
                    var.len(),
                    index.len()
                )));
            }
            if !seen.insert(var.name()) {
                return Err(PanelError::shape(format!(
                    "variable name '{}' is used more than once",
                    var.name()
                )));
            }
        }
        Ok(Self { index, variables })
    }

    pub fn index(&self) -> &PanelIndex {
        &self.index
    }

    pub fn variables(&self) -> &[EntityContainer] {
        &self.variables
    }

    pub fn n_variables(&self) -> usize {
        self.variables.len()
    }

    /// Number of index positions
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.variables.iter().map(EntityContainer::name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&EntityContainer> {
        self.variables.iter().find(|v| v.name() == name)
    }

    /// Numeric value of `name` at an (entity, time) slot, `None` when the slot
    /// is unobserved or the variable is categorical
    pub fn value(&self, name: &str, entity: &Label, time: &Label) -> Option<f64> {
        let pos = self.index.position(entity, time)?;
        match self.get(name)?.column() {
            PanelColumn::Numeric(values) => Some(values[pos]).filter(|v| !v.is_nan()),
            PanelColumn::Categorical(_) => None,
        }
    }

    pub fn into_parts(self) -> (PanelIndex, Vec<EntityContainer>) {
        (self.index, self.variables)
    }
}
