//! Hydraulic erosion on a square height grid.
//!
//! [`ErosionEngine`] owns the grid and runs cycles of rain, dissolve, flow,
//! resolve and evaporate, with optional smoothing. The individual passes live
//! in [`cpu`] and can also be driven one at a time through the engine.

mod config;
pub mod cpu;
mod engine;

pub use config::{ConfigError, ErosionConfig};
pub use engine::{EngineBuilder, ErosionEngine, ErosionError};
