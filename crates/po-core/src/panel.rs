//! Panel data normalization
//!
//! Turns caller input of any accepted shape into one canonical, aligned
//! representation:
//!
//! 1. [`PanelInput`] is resolved into [`PanelData`] (one [`EntityContainer`]
//!    per variable over a shared [`PanelIndex`]),
//! 2. [`align`] intersects dependent and independent variables,
//! 3. [`CategoricalExpander`] replaces categorical regressors with indicator
//!    columns.

mod adapter;
mod align;
mod categorical;
mod container;
mod index;

#[cfg(test)]
mod tests;

pub use adapter::{ArrayPanel, LabelledArray, PanelInput, TabularPanel};
pub use align::{AlignedPanel, align};
pub use categorical::{
    CategoricalExpander, CategoricalSummary, ExpandedDesign, ExpansionReport, LevelOrder,
};
pub use container::{EntityContainer, PanelColumn, PanelData};
pub use index::{Label, PanelIndex};
