//! Grid-based hydraulic erosion.
//!
//! A square grid of cells, each holding rock, water and suspended sediment,
//! is worn down by repeated cycles of rain, dissolution, downhill flow and
//! evaporation. Flow is double-buffered so every cell sees its neighbors'
//! pre-pass state regardless of traversal order.

pub mod geometry;
pub mod terrain;
pub mod random;
pub mod pipeline;
pub mod erosion;

pub use terrain::{Cell, Field, Grid, MassBudget};
pub use random::{RandomSource, Sequence};
pub use pipeline::{ErosionPass, PassId, PassProgress, Schedule};
pub use erosion::{ConfigError, EngineBuilder, ErosionConfig, ErosionEngine, ErosionError};
