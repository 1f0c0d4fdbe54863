//! Height-field storage.
//!
//! Provides the [`Cell`] and [`Grid`] types the erosion passes operate on.

mod cell;
mod grid;

pub use cell::{Cell, Field};
pub use grid::{Grid, MassBudget};
