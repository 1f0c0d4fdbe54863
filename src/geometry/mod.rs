//! Square-grid geometry.
//!
//! Neighborhood enumeration shared by the grid and every erosion pass.

pub mod neighbors;

pub use neighbors::Neighbor;
