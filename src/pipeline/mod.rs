//! Pass pipeline for erosion cycles.
//!
//! Each pass implements [`ErosionPass`]; a [`Schedule`] runs them in order
//! and reports progress after each one so callers can cancel between passes.

mod pass;

pub use pass::{
    ErosionPass, PassContext, PassId, PassProgress, Schedule,
    RainPass, DissolvePass, FlowPass, ResolvePass, EvaporatePass, SmoothPass,
};
