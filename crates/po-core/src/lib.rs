//! Core data structures for PanelOxide
//!
//! `data` holds the tabular building blocks (typed series and data frames),
//! `panel` turns caller input of any accepted shape into one aligned,
//! entity/time indexed representation ready for estimation.

pub mod data;
pub mod error;
pub mod panel;

pub use error::{PanelError, PanelResult};
