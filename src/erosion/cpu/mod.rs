//! CPU implementations of the erosion passes.

pub mod drainage;
pub mod hydraulic;
pub mod smooth;
