//! Entity/time labels and the panel index built from them

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, PanelResult};

/// Identifier of an entity or a time period
///
/// Integer labels sort before string labels; within a kind the natural
/// ordering applies. This ordering defines the canonical iteration order of
/// every panel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Int(i64),
    Str(String),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Int(v) => write!(f, "{}", v),
            Label::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Label::Int(value)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Label::Int(i64::from(value))
    }
}

impl From<usize> for Label {
    fn from(value: usize) -> Self {
        Label::Int(value as i64)
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Label::Str(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Label::Str(value)
    }
}

/// Ordered set of observed (entity, time) slots
///
/// Observations are stored entity-major: sorted by entity label, then by
/// time label. `entities` and `times` hold the sorted distinct labels and
/// each observation refers to them by code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelIndex {
    entities: Vec<Label>,
    times: Vec<Label>,
    entity_codes: Vec<usize>,
    time_codes: Vec<usize>,
}

impl PanelIndex {
    /// Build an index from keys in arbitrary order
    ///
    /// Returns the index together with `order`, where `order[i]` is the
    /// position in `keys` of the i-th canonical observation. A repeated key
    /// is a [`PanelError::DuplicateKey`].
    pub fn from_keys(keys: &[(Label, Label)]) -> PanelResult<(Self, Vec<usize>)> {
        let mut sorted: BTreeMap<(&Label, &Label), usize> = BTreeMap::new();
        for (pos, (entity, time)) in keys.iter().enumerate() {
            if sorted.insert((entity, time), pos).is_some() {
                return Err(PanelError::DuplicateKey {
                    entity: entity.clone(),
                    time: time.clone(),
                });
            }
        }

        let mut entities: Vec<Label> = keys.iter().map(|(e, _)| e.clone()).collect();
        entities.sort();
        entities.dedup();
        let mut times: Vec<Label> = keys.iter().map(|(_, t)| t.clone()).collect();
        times.sort();
        times.dedup();

        let mut entity_codes = Vec::with_capacity(keys.len());
        let mut time_codes = Vec::with_capacity(keys.len());
        let mut order = Vec::with_capacity(keys.len());
        for ((entity, time), pos) in sorted {
            entity_codes.push(code_of(&entities, entity));
            time_codes.push(code_of(&times, time));
            order.push(pos);
        }

        Ok((
            Self {
                entities,
                times,
                entity_codes,
                time_codes,
            },
            order,
        ))
    }

    /// Full cross product of the given labels, entity-major
    pub fn cross(entities: &[Label], times: &[Label]) -> PanelResult<(Self, Vec<usize>)> {
        let keys: Vec<(Label, Label)> = entities
            .iter()
            .flat_map(|e| times.iter().map(move |t| (e.clone(), t.clone())))
            .collect();
        Self::from_keys(&keys)
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.entity_codes.len()
    }

    /// Check if index is empty
    pub fn is_empty(&self) -> bool {
        self.entity_codes.is_empty()
    }

    /// Distinct entity labels, sorted
    pub fn entities(&self) -> &[Label] {
        &self.entities
    }

    /// Distinct time labels, sorted
    pub fn times(&self) -> &[Label] {
        &self.times
    }

    pub fn n_entities(&self) -> usize {
        self.entities.len()
    }

    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    /// Entity code of every observation
    pub fn entity_codes(&self) -> &[usize] {
        &self.entity_codes
    }

    /// Time code of every observation
    pub fn time_codes(&self) -> &[usize] {
        &self.time_codes
    }

    /// Labels of the i-th observation
    pub fn key(&self, idx: usize) -> Option<(&Label, &Label)> {
        let e = *self.entity_codes.get(idx)?;
        let t = *self.time_codes.get(idx)?;
        Some((&self.entities[e], &self.times[t]))
    }

    /// Position of an (entity, time) slot, if observed
    pub fn position(&self, entity: &Label, time: &Label) -> Option<usize> {
        let e = self.entities.binary_search(entity).ok()?;
        let t = self.times.binary_search(time).ok()?;
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match (self.entity_codes[mid], self.time_codes[mid]).cmp(&(e, t)) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    /// Whether every entity is observed in every period
    pub fn is_balanced(&self) -> bool {
        self.len() == self.n_entities() * self.n_times()
    }

    /// Observation positions grouped by entity code
    pub fn entity_groups(&self) -> Vec<Vec<usize>> {
        group_positions(&self.entity_codes, self.n_entities())
    }

    /// Observation positions grouped by time code
    pub fn time_groups(&self) -> Vec<Vec<usize>> {
        group_positions(&self.time_codes, self.n_times())
    }

    /// Restrict the index to the given observation positions
    ///
    /// Labels that no longer occur are removed and codes are reassigned, so
    /// the result is indistinguishable from an index built directly from the
    /// surviving keys.
    pub fn subset(&self, positions: &[usize]) -> PanelResult<Self> {
        let keys: Vec<(Label, Label)> = positions
            .iter()
            .map(|&pos| {
                self.key(pos)
                    .map(|(e, t)| (e.clone(), t.clone()))
                    .ok_or_else(|| {
                        PanelError::shape(format!(
                            "position {} outside panel index of length {}",
                            pos,
                            self.len()
                        ))
                    })
            })
            .collect::<PanelResult<_>>()?;
        Self::from_keys(&keys).map(|(index, _)| index)
    }
}

fn code_of(labels: &[Label], label: &Label) -> usize {
    // labels is built from the same keys, so the search always succeeds
    labels.binary_search(label).unwrap_or_default()
}

fn group_positions(codes: &[usize], n_groups: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); n_groups];
    for (pos, &code) in codes.iter().enumerate() {
        groups[code].push(pos);
    }
    groups
}
