//! Shape adapters: every accepted input encoding resolves into `PanelData`
//!
//! Three encodings are accepted:
//! - tabular: a `DataFrame` with explicit entity and time key columns,
//! - array-major: a raw `[variable, time, entity]` array (a `[time, entity]`
//!   matrix is the single-variable case),
//! - labelled array: the same layout with named variables and labelled axes.
//!
//! The variant is resolved once in [`PanelInput::into_panel`]; nothing past
//! that point knows which encoding the caller used.

use std::collections::HashSet;

use log::debug;
use ndarray::{Array1, Array2, Array3, Axis};

use super::{EntityContainer, Label, PanelColumn, PanelData, PanelIndex};
use crate::data::{DataFrame, Series};
use crate::error::{PanelError, PanelResult};

/// Caller input in one of the accepted encodings
#[derive(Debug, Clone)]
pub enum PanelInput {
    Tabular(TabularPanel),
    ArrayMajor(ArrayPanel),
    LabelledArray(LabelledArray),
}

impl PanelInput {
    /// Tabular input keyed by the `entity` and `time` columns of `frame`
    pub fn tabular(frame: DataFrame, entity: &str, time: &str) -> PanelResult<Self> {
        TabularPanel::new(frame, entity, time).map(PanelInput::Tabular)
    }

    /// Raw `[variable, time, entity]` array
    pub fn array3(values: Array3<f64>) -> Self {
        PanelInput::ArrayMajor(ArrayPanel::new(values))
    }

    /// Raw `[time, entity]` array holding a single variable
    pub fn array2(values: Array2<f64>) -> Self {
        PanelInput::ArrayMajor(ArrayPanel::from_slice(values))
    }

    pub fn labelled(array: LabelledArray) -> Self {
        PanelInput::LabelledArray(array)
    }

    /// Resolve the input into the canonical representation
    ///
    /// `default_name` names variables of raw arrays that carry no name of
    /// their own.
    pub fn into_panel(self, default_name: &str) -> PanelResult<PanelData> {
        let panel = match self {
            PanelInput::Tabular(table) => table.into_panel()?,
            PanelInput::ArrayMajor(array) => array.into_panel(default_name)?,
            PanelInput::LabelledArray(array) => array.into_panel()?,
        };
        debug!(
            "adapted panel: {} variables, {} slots, {} entities x {} periods",
            panel.n_variables(),
            panel.len(),
            panel.index().n_entities(),
            panel.index().n_times()
        );
        Ok(panel)
    }
}

impl From<TabularPanel> for PanelInput {
    fn from(value: TabularPanel) -> Self {
        PanelInput::Tabular(value)
    }
}

impl From<ArrayPanel> for PanelInput {
    fn from(value: ArrayPanel) -> Self {
        PanelInput::ArrayMajor(value)
    }
}

impl From<LabelledArray> for PanelInput {
    fn from(value: LabelledArray) -> Self {
        PanelInput::LabelledArray(value)
    }
}

// ==================== Tabular ====================

/// A data frame whose rows are keyed by (entity, time)
#[derive(Debug, Clone)]
pub struct TabularPanel {
    frame: DataFrame,
    entity: String,
    time: String,
}

impl TabularPanel {
    pub fn new(frame: DataFrame, entity: &str, time: &str) -> PanelResult<Self> {
        if entity == time {
            return Err(PanelError::shape(format!(
                "entity and time keys must be different columns, both are '{}'",
                entity
            )));
        }
        for key in [entity, time] {
            if !frame.has_column(key) {
                return Err(PanelError::shape(format!("key column '{}' not found", key)));
            }
        }
        Ok(Self {
            frame,
            entity: entity.to_string(),
            time: time.to_string(),
        })
    }

    /// Split one column off as the dependent variable
    ///
    /// Returns `(dependent, independent)`, both keyed by the same columns.
    pub fn split_dependent(self, dependent: &str) -> PanelResult<(PanelInput, PanelInput)> {
        if dependent == self.entity || dependent == self.time {
            return Err(PanelError::shape(format!(
                "dependent column '{}' is a key column",
                dependent
            )));
        }
        if !self.frame.has_column(dependent) {
            return Err(PanelError::shape(format!(
                "dependent column '{}' not found",
                dependent
            )));
        }

        let dep_frame = self
            .frame
            .select([self.entity.as_str(), self.time.as_str(), dependent])?;
        let exog_frame = self.frame.drop(&[dependent])?;

        Ok((
            PanelInput::Tabular(TabularPanel {
                frame: dep_frame,
                entity: self.entity.clone(),
                time: self.time.clone(),
            }),
            PanelInput::Tabular(TabularPanel {
                frame: exog_frame,
                entity: self.entity,
                time: self.time,
            }),
        ))
    }

    fn into_panel(self) -> PanelResult<PanelData> {
        let entities = key_labels(&self.frame, &self.entity)?;
        let times = key_labels(&self.frame, &self.time)?;
        let keys: Vec<(Label, Label)> = entities.into_iter().zip(times).collect();
        let (index, order) = PanelIndex::from_keys(&keys)?;

        let mut variables = Vec::new();
        for (name, series) in self.frame.iter() {
            if name == self.entity || name == self.time {
                continue;
            }
            let column = if series.is_numeric() {
                let values = series.to_float()?;
                PanelColumn::Numeric(order.iter().map(|&pos| values[pos]).collect())
            } else {
                let values = series.to_strings()?;
                PanelColumn::Categorical(order.iter().map(|&pos| values[pos].clone()).collect())
            };
            variables.push(EntityContainer::new(name, column));
        }

        if variables.is_empty() {
            return Err(PanelError::shape(
                "table has no variable columns besides the entity and time keys",
            ));
        }

        PanelData::new(index, variables)
    }
}

fn key_labels(frame: &DataFrame, column: &str) -> PanelResult<Vec<Label>> {
    let series = frame
        .get_column(column)
        .ok_or_else(|| PanelError::shape(format!("key column '{}' not found", column)))?;

    match series {
        Series::Int(values) => Ok(values.iter().map(|&v| Label::Int(v)).collect()),
        Series::String(_) | Series::Categorical(_, _) => series
            .to_strings()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.map(Label::Str).ok_or_else(|| {
                    PanelError::shape(format!("key column '{}' is missing in row {}", column, row))
                })
            })
            .collect(),
        other => Err(PanelError::shape(format!(
            "key column '{}' must hold integers or strings, got {}",
            column,
            other.dtype()
        ))),
    }
}

// ==================== Raw arrays ====================

/// Unlabelled `[variable, time, entity]` array
///
/// Entities and periods are labelled `0..n`; variable names are synthesized
/// from a base name: `name` for one variable, `name.0`, `name.1`, ...
/// otherwise.
#[derive(Debug, Clone)]
pub struct ArrayPanel {
    values: Array3<f64>,
    name: Option<String>,
}

impl ArrayPanel {
    pub fn new(values: Array3<f64>) -> Self {
        Self { values, name: None }
    }

    /// Single `[time, entity]` slice
    pub fn from_slice(values: Array2<f64>) -> Self {
        Self::new(values.insert_axis(Axis(0)))
    }

    /// Base name used for the synthesized variable names
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn into_panel(self, default_name: &str) -> PanelResult<PanelData> {
        let (n_vars, n_times, n_entities) = self.values.dim();
        let base = self.name.as_deref().unwrap_or(default_name);
        let names = synthesized_names(base, n_vars);
        let entities: Vec<Label> = (0..n_entities).map(Label::from).collect();
        let times: Vec<Label> = (0..n_times).map(Label::from).collect();
        build_from_cube(&self.values, names, &entities, &times)
    }
}

fn synthesized_names(base: &str, n_vars: usize) -> Vec<String> {
    if n_vars == 1 {
        vec![base.to_string()]
    } else {
        (0..n_vars).map(|i| format!("{}.{}", base, i)).collect()
    }
}

/// `[variable, time, entity]` array with named variables and labelled axes
#[derive(Debug, Clone)]
pub struct LabelledArray {
    values: Array3<f64>,
    variables: Vec<String>,
    times: Vec<Label>,
    entities: Vec<Label>,
}

impl LabelledArray {
    pub fn new(
        values: Array3<f64>,
        variables: Vec<String>,
        times: Vec<Label>,
        entities: Vec<Label>,
    ) -> PanelResult<Self> {
        let (n_vars, n_times, n_entities) = values.dim();
        check_axis("variable", n_vars, variables.len())?;
        check_axis("time", n_times, times.len())?;
        check_axis("entity", n_entities, entities.len())?;
        check_distinct("variable", variables.iter())?;
        check_distinct("time", times.iter())?;
        check_distinct("entity", entities.iter())?;

        Ok(Self {
            values,
            variables,
            times,
            entities,
        })
    }

    /// Single named `[time, entity]` slice
    pub fn from_slice(
        name: impl Into<String>,
        values: Array2<f64>,
        times: Vec<Label>,
        entities: Vec<Label>,
    ) -> PanelResult<Self> {
        Self::new(values.insert_axis(Axis(0)), vec![name.into()], times, entities)
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    fn into_panel(self) -> PanelResult<PanelData> {
        build_from_cube(&self.values, self.variables, &self.entities, &self.times)
    }
}

fn check_axis(axis: &str, actual: usize, labels: usize) -> PanelResult<()> {
    if actual != labels {
        return Err(PanelError::shape(format!(
            "{} axis has length {} but {} labels were given",
            axis, actual, labels
        )));
    }
    Ok(())
}

fn check_distinct<'a, T>(axis: &str, labels: impl Iterator<Item = &'a T>) -> PanelResult<()>
where
    T: std::hash::Hash + Eq + std::fmt::Display + 'a,
{
    let mut seen = HashSet::new();
    for label in labels {
        if !seen.insert(label) {
            return Err(PanelError::shape(format!(
                "{} label '{}' appears more than once",
                axis, label
            )));
        }
    }
    Ok(())
}

fn build_from_cube(
    values: &Array3<f64>,
    names: Vec<String>,
    entities: &[Label],
    times: &[Label],
) -> PanelResult<PanelData> {
    let (n_vars, n_times, n_entities) = values.dim();
    if n_vars == 0 {
        return Err(PanelError::shape("array has no variables"));
    }
    if n_times == 0 || n_entities == 0 {
        return Err(PanelError::shape(format!(
            "array has an empty axis: {} periods x {} entities",
            n_times, n_entities
        )));
    }

    // keys are laid out entity-major: position = e * n_times + t
    let (index, order) = PanelIndex::cross(entities, times)?;
    let variables = names
        .into_iter()
        .enumerate()
        .map(|(v, name)| {
            let column: Array1<f64> = order
                .iter()
                .map(|&pos| values[[v, pos % n_times, pos / n_times]])
                .collect();
            EntityContainer::numeric(name, column)
        })
        .collect();

    PanelData::new(index, variables)
}
