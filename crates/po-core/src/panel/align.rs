//! Alignment of dependent and independent variables on a common index

use log::debug;
use ndarray::Array1;

use super::{EntityContainer, Label, PanelColumn, PanelData, PanelIndex};
use crate::error::{PanelError, PanelResult};

/// Dependent and independent variables restricted to the slots where all of
/// them are observed
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPanel {
    index: PanelIndex,
    dependent_name: String,
    dependent: Array1<f64>,
    regressors: Vec<EntityContainer>,
    n_dropped: usize,
}

impl AlignedPanel {
    pub fn index(&self) -> &PanelIndex {
        &self.index
    }

    pub fn dependent_name(&self) -> &str {
        &self.dependent_name
    }

    pub fn dependent(&self) -> &Array1<f64> {
        &self.dependent
    }

    /// Independent variables, fully observed on `index`
    pub fn regressors(&self) -> &[EntityContainer] {
        &self.regressors
    }

    /// Dependent-variable slots removed because some variable was missing
    pub fn n_dropped(&self) -> usize {
        self.n_dropped
    }

    pub fn n_obs(&self) -> usize {
        self.index.len()
    }
}

/// Intersect `dependent` with every variable of `exog`
///
/// `dependent` must hold exactly one numeric variable. Slots where the
/// dependent or any regressor is missing are dropped pairwise; an empty
/// intersection is [`PanelError::InsufficientData`]. A categorical regressor
/// without a single observed value is [`PanelError::DegenerateVariable`];
/// an infinite numeric value is a shape error.
pub fn align(dependent: PanelData, exog: PanelData) -> PanelResult<AlignedPanel> {
    if dependent.n_variables() != 1 {
        return Err(PanelError::shape(format!(
            "dependent input must hold exactly one variable, got {}",
            dependent.n_variables()
        )));
    }
    let (dep_index, mut dep_vars) = dependent.into_parts();
    let dep_var = dep_vars.remove(0);
    let dep_values = match dep_var.column() {
        PanelColumn::Numeric(values) => values,
        PanelColumn::Categorical(_) => {
            return Err(PanelError::shape(format!(
                "dependent variable '{}' must be numeric",
                dep_var.name()
            )));
        }
    };

    if let Some(var) = exog
        .variables()
        .iter()
        .find(|v| v.name() == dep_var.name())
    {
        return Err(PanelError::shape(format!(
            "variable '{}' is both the dependent and an independent variable",
            var.name()
        )));
    }

    if let Some(var) = exog
        .variables()
        .iter()
        .find(|v| v.is_categorical() && v.column().observed_count() == 0)
    {
        return Err(PanelError::DegenerateVariable {
            variable: var.name().to_string(),
        });
    }

    if dep_values.iter().any(|v| v.is_infinite()) {
        return Err(PanelError::shape(format!(
            "dependent variable '{}' holds an infinite value",
            dep_var.name()
        )));
    }
    if let Some(var) = exog.variables().iter().find(|v| match v.column() {
        PanelColumn::Numeric(values) => values.iter().any(|x| x.is_infinite()),
        PanelColumn::Categorical(_) => false,
    }) {
        return Err(PanelError::shape(format!(
            "variable '{}' holds an infinite value",
            var.name()
        )));
    }

    let exog_index = exog.index();
    let mut keys: Vec<(Label, Label)> = Vec::new();
    let mut dep_positions = Vec::new();
    let mut exog_positions = Vec::new();
    for pos in 0..dep_index.len() {
        if dep_values[pos].is_nan() {
            continue;
        }
        let Some((entity, time)) = dep_index.key(pos) else {
            continue;
        };
        let Some(exog_pos) = exog_index.position(entity, time) else {
            continue;
        };
        if exog
            .variables()
            .iter()
            .all(|v| v.column().is_observed(exog_pos))
        {
            keys.push((entity.clone(), time.clone()));
            dep_positions.push(pos);
            exog_positions.push(exog_pos);
        }
    }

    if keys.is_empty() {
        return Err(PanelError::insufficient(
            "dependent and independent variables share no fully observed (entity, time) slot",
        ));
    }

    let (index, order) = PanelIndex::from_keys(&keys)?;
    let dep_take: Vec<usize> = order.iter().map(|&i| dep_positions[i]).collect();
    let exog_take: Vec<usize> = order.iter().map(|&i| exog_positions[i]).collect();

    let dependent: Array1<f64> = dep_take.iter().map(|&i| dep_values[i]).collect();
    let regressors: Vec<EntityContainer> = exog
        .variables()
        .iter()
        .map(|v| v.take(&exog_take))
        .collect();

    let n_dropped = dep_index.len() - index.len();
    debug!(
        "aligned panel: kept {} of {} slots across {} entities",
        index.len(),
        dep_index.len(),
        index.n_entities()
    );

    Ok(AlignedPanel {
        index,
        dependent_name: dep_var.name().to_string(),
        dependent,
        regressors,
        n_dropped,
    })
}
