//! Absorption of entity and time effects
//!
//! Effects are removed by demeaning instead of estimating one dummy per
//! group. One-way effects need a single pass. Two-way effects use the
//! closed form `x - x̄_e - x̄_t + x̄` on balanced panels; on unbalanced panels
//! that formula is not a projection, so entity and time demeaning alternate
//! until every group mean vanishes (method of alternating projections).

use std::collections::HashSet;

use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use po_core::panel::{Label, PanelIndex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Headroom over the expected rounding error of demeaning
const ABSORPTION_MARGIN: f64 = 100.0;

/// Which fixed effects are absorbed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effects {
    #[default]
    None,
    Entity,
    Time,
    TwoWay,
}

impl Effects {
    pub fn from_flags(entity: bool, time: bool) -> Self {
        match (entity, time) {
            (false, false) => Effects::None,
            (true, false) => Effects::Entity,
            (false, true) => Effects::Time,
            (true, true) => Effects::TwoWay,
        }
    }

    pub fn has_entity(self) -> bool {
        matches!(self, Effects::Entity | Effects::TwoWay)
    }

    pub fn has_time(self) -> bool {
        matches!(self, Effects::Time | Effects::TwoWay)
    }

    pub fn is_none(self) -> bool {
        self == Effects::None
    }
}

// ==================== Singletons ====================

/// Observations surviving singleton removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingletonFilter {
    /// Surviving positions, ascending
    pub keep: Vec<usize>,
    /// Keys of the removed observations, in index order
    pub dropped: Vec<(Label, Label)>,
}

impl SingletonFilter {
    /// Remove groups observed exactly once under the absorbed effects
    ///
    /// An entity seen in a single period (or a period with a single entity,
    /// under time effects) is fully explained by its own effect. Removing it
    /// may create new singletons, so the pass repeats until nothing changes.
    pub fn apply(index: &PanelIndex, effects: Effects) -> Self {
        let mut alive = vec![true; index.len()];
        loop {
            let mut removed = false;
            if effects.has_entity() {
                removed |= remove_singletons(index.entity_codes(), index.n_entities(), &mut alive);
            }
            if effects.has_time() {
                removed |= remove_singletons(index.time_codes(), index.n_times(), &mut alive);
            }
            if !removed {
                break;
            }
        }

        let keep: Vec<usize> = (0..index.len()).filter(|&i| alive[i]).collect();
        let dropped: Vec<(Label, Label)> = (0..index.len())
            .filter(|&i| !alive[i])
            .filter_map(|i| index.key(i).map(|(e, t)| (e.clone(), t.clone())))
            .collect();

        if !dropped.is_empty() {
            warn!(
                "dropped {} singleton observation(s) before absorbing effects",
                dropped.len()
            );
        }
        Self { keep, dropped }
    }

    pub fn is_empty(&self) -> bool {
        self.dropped.is_empty()
    }
}

fn remove_singletons(codes: &[usize], n_groups: usize, alive: &mut [bool]) -> bool {
    let mut counts = vec![0usize; n_groups];
    for (i, &code) in codes.iter().enumerate() {
        if alive[i] {
            counts[code] += 1;
        }
    }
    let mut removed = false;
    for (i, &code) in codes.iter().enumerate() {
        if alive[i] && counts[code] == 1 {
            alive[i] = false;
            removed = true;
        }
    }
    removed
}

// ==================== Demeaning ====================

/// Dependent variable and regressors after absorbing the effects
#[derive(Debug, Clone, PartialEq)]
pub struct Demeaned {
    pub y: Array1<f64>,
    pub x: Array2<f64>,
    /// Largest number of alternating-projection sweeps over all columns
    pub iterations: usize,
    /// Whether every column met the tolerance
    pub converged: bool,
}

struct DemeanedColumn {
    values: Array1<f64>,
    iterations: usize,
    converged: bool,
}

/// Within transformation over a fixed panel index
#[derive(Debug, Clone)]
pub struct WithinTransformer {
    effects: Effects,
    entity_groups: Vec<Vec<usize>>,
    time_groups: Vec<Vec<usize>>,
    balanced: bool,
    absorbed: usize,
    tolerance: f64,
    max_iter: usize,
}

impl WithinTransformer {
    pub fn new(index: &PanelIndex, effects: Effects) -> Self {
        let entity_groups = index.entity_groups();
        let time_groups = index.time_groups();
        let absorbed = match effects {
            Effects::None => 0,
            Effects::Entity => index.n_entities(),
            Effects::Time => index.n_times(),
            Effects::TwoWay => {
                let components = connected_components(
                    index.entity_codes(),
                    index.time_codes(),
                    index.n_entities(),
                    index.n_times(),
                );
                index.n_entities() + index.n_times() - components
            }
        };
        debug!(
            "within transform: {:?} effects, {} entities, {} periods, {} absorbed d.f.",
            effects,
            index.n_entities(),
            index.n_times(),
            absorbed
        );

        Self {
            effects,
            entity_groups,
            time_groups,
            balanced: index.is_balanced(),
            absorbed,
            tolerance: 1e-10,
            max_iter: 10_000,
        }
    }

    /// Convergence tolerance of alternating projections, relative to the
    /// column's largest absolute value
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn effects(&self) -> Effects {
        self.effects
    }

    /// Degrees of freedom consumed by the absorbed effects
    ///
    /// Entity effects absorb one per entity and time effects one per period.
    /// With both, one restriction per connected component of the
    /// entity-period graph is shared, so a connected panel absorbs
    /// `entities + periods - 1`.
    pub fn absorbed_df(&self) -> usize {
        self.absorbed
    }

    /// Demean the dependent variable and every regressor column
    ///
    /// Columns are transformed independently on the rayon pool.
    pub fn transform(&self, y: &Array1<f64>, x: &Array2<f64>) -> Demeaned {
        let dep = self.demean_column(y.view());
        let columns: Vec<DemeanedColumn> = (0..x.ncols())
            .into_par_iter()
            .map(|j| self.demean_column(x.column(j)))
            .collect();

        let mut demeaned_x = Array2::zeros((x.nrows(), x.ncols()));
        let mut iterations = dep.iterations;
        let mut converged = dep.converged;
        for (j, column) in columns.into_iter().enumerate() {
            demeaned_x.column_mut(j).assign(&column.values);
            iterations = iterations.max(column.iterations);
            converged &= column.converged;
        }

        if !converged {
            warn!(
                "two-way demeaning did not converge within {} iterations",
                self.max_iter
            );
        }

        Demeaned {
            y: dep.values,
            x: demeaned_x,
            iterations,
            converged,
        }
    }

    /// Demean a single column
    pub fn demean(&self, column: ArrayView1<f64>) -> Array1<f64> {
        self.demean_column(column).values
    }

    fn demean_column(&self, column: ArrayView1<f64>) -> DemeanedColumn {
        let mut values = column.to_owned();
        let mut iterations = 0;
        let mut converged = true;
        match self.effects {
            Effects::None => {}
            Effects::Entity => subtract_group_means(&mut values, &self.entity_groups),
            Effects::Time => subtract_group_means(&mut values, &self.time_groups),
            Effects::TwoWay if self.balanced => {
                let entity_means = group_means(&values, &self.entity_groups);
                let time_means = group_means(&values, &self.time_groups);
                let grand = values.mean().unwrap_or(0.0);
                for (means, groups) in [(&entity_means, &self.entity_groups), (&time_means, &self.time_groups)] {
                    for (mean, group) in means.iter().zip(groups) {
                        for &i in group {
                            values[i] -= mean;
                        }
                    }
                }
                values.mapv_inplace(|v| v + grand);
            }
            Effects::TwoWay => {
                let scale = values.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
                let threshold = self.tolerance * scale;
                converged = false;
                while iterations < self.max_iter {
                    subtract_group_means(&mut values, &self.entity_groups);
                    subtract_group_means(&mut values, &self.time_groups);
                    iterations += 1;
                    if max_abs_group_mean(&values, &self.entity_groups) < threshold
                        && max_abs_group_mean(&values, &self.time_groups) < threshold
                    {
                        converged = true;
                        break;
                    }
                }
            }
        }
        DemeanedColumn {
            values,
            iterations,
            converged,
        }
    }

    /// Regressor columns the effects absorb entirely
    ///
    /// A column is absorbed when what is left after demeaning is rounding
    /// noise: at most `ABSORPTION_MARGIN` times `n·ε` (or the projection
    /// tolerance, when alternating projections ran) times the column's
    /// largest absolute value. Any other column is left to the rank test of
    /// the solver, however small its within variation.
    pub fn absorbed_columns(&self, x: &Array2<f64>, demeaned: &Array2<f64>) -> Vec<usize> {
        if self.effects.is_none() {
            return Vec::new();
        }
        let floor = x.nrows() as f64 * f64::EPSILON;
        let noise = if self.is_iterative() {
            floor.max(self.tolerance)
        } else {
            floor
        };
        x.axis_iter(Axis(1))
            .zip(demeaned.axis_iter(Axis(1)))
            .enumerate()
            .filter(|(_, (before, after))| {
                let scale = before.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
                let residual = after.dot(after).sqrt();
                scale > 0.0 && residual <= ABSORPTION_MARGIN * noise * scale
            })
            .map(|(j, _)| j)
            .collect()
    }

    fn is_iterative(&self) -> bool {
        self.effects == Effects::TwoWay && !self.balanced
    }
}

fn group_means(values: &Array1<f64>, groups: &[Vec<usize>]) -> Vec<f64> {
    groups
        .iter()
        .map(|group| {
            if group.is_empty() {
                0.0
            } else {
                group.iter().map(|&i| values[i]).sum::<f64>() / group.len() as f64
            }
        })
        .collect()
}

fn subtract_group_means(values: &mut Array1<f64>, groups: &[Vec<usize>]) {
    let means = group_means(values, groups);
    for (mean, group) in means.iter().zip(groups) {
        for &i in group {
            values[i] -= mean;
        }
    }
}

fn max_abs_group_mean(values: &Array1<f64>, groups: &[Vec<usize>]) -> f64 {
    group_means(values, groups)
        .into_iter()
        .fold(0.0_f64, |acc, m| acc.max(m.abs()))
}

/// Connected components of the bipartite entity-period graph
fn connected_components(
    entity_codes: &[usize],
    time_codes: &[usize],
    n_entities: usize,
    n_times: usize,
) -> usize {
    let mut parent: Vec<usize> = (0..n_entities + n_times).collect();
    for (&e, &t) in entity_codes.iter().zip(time_codes) {
        let a = find(&mut parent, e);
        let b = find(&mut parent, n_entities + t);
        if a != b {
            parent[a] = b;
        }
    }

    let mut used = vec![false; n_entities + n_times];
    for (&e, &t) in entity_codes.iter().zip(time_codes) {
        used[e] = true;
        used[n_entities + t] = true;
    }
    let roots: HashSet<usize> = (0..parent.len())
        .filter(|&node| used[node])
        .map(|node| find(&mut parent, node))
        .collect();
    roots.len()
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}
