//! Erosion pass trait and per-cycle orchestration.

use std::fmt;
use std::ops::ControlFlow;

use crate::erosion::cpu::hydraulic::{apply_dissolve, dissolve, evaporate, flow, rain, resolve};
use crate::erosion::cpu::smooth::smooth;
use crate::erosion::{ErosionConfig, ErosionError};
use crate::random::RandomSource;
use crate::terrain::Grid;

/// Unique identifier for erosion passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    /// Stochastic rainfall.
    Rain,
    /// Rock to suspended sediment.
    Dissolve,
    /// Staged downhill transport.
    Flow,
    /// Apply staged deltas.
    Resolve,
    /// Evaporation and drying.
    Evaporate,
    /// Neighborhood low-pass filter.
    Smooth,
}

impl PassId {
    /// Returns the name of the pass.
    pub fn name(&self) -> &'static str {
        match self {
            PassId::Rain => "rain",
            PassId::Dissolve => "dissolve",
            PassId::Flow => "flow",
            PassId::Resolve => "resolve",
            PassId::Evaporate => "evaporate",
            PassId::Smooth => "smooth",
        }
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything a pass may touch.
pub struct PassContext<'a> {
    pub grid: &'a mut Grid,
    pub config: &'a ErosionConfig,
    pub rng: &'a mut dyn RandomSource,
}

/// Reported to callbacks after each completed pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassProgress {
    /// 1-based cycle within the current `cycle` call.
    pub cycle: u32,
    /// Cycles requested by the current `cycle` call.
    pub cycles: u32,
    /// The pass that just finished.
    pub pass: PassId,
}

/// A single traversal of the grid.
///
/// Passes are stateless; everything they read or write comes through the
/// [`PassContext`].
pub trait ErosionPass {
    /// Returns the unique identifier for this pass.
    fn id(&self) -> PassId;

    /// Returns a human-readable name for the pass.
    fn name(&self) -> &str {
        self.id().name()
    }

    /// Runs the pass over the whole grid.
    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError>;
}

/// Rainfall pass.
pub struct RainPass;

impl ErosionPass for RainPass {
    fn id(&self) -> PassId {
        PassId::Rain
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError> {
        let wet = rain(ctx.grid, ctx.config, &mut *ctx.rng);
        log::debug!("rain: {} cells wetted", wet);
        Ok(())
    }
}

/// Dissolution pass. Fails on non-finite results without touching the grid.
pub struct DissolvePass;

impl ErosionPass for DissolvePass {
    fn id(&self) -> PassId {
        PassId::Dissolve
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError> {
        let deltas = dissolve(ctx.grid, ctx.config)?;
        let total = apply_dissolve(ctx.grid, &deltas);
        log::debug!("dissolve: {:.6} rock suspended", total);
        Ok(())
    }
}

/// Staged flow pass. Must be followed by [`ResolvePass`] in the same cycle.
pub struct FlowPass;

impl ErosionPass for FlowPass {
    fn id(&self) -> PassId {
        PassId::Flow
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError> {
        let stats = flow(ctx.grid, ctx.config, &mut *ctx.rng);
        log::debug!(
            "flow: {} cells moved {:.6} water and {:.6} sediment ({} single-target)",
            stats.moving_cells,
            stats.water_moved,
            stats.sediment_moved,
            stats.single_target_cells
        );
        Ok(())
    }
}

/// Applies staged flow deltas.
pub struct ResolvePass;

impl ErosionPass for ResolvePass {
    fn id(&self) -> PassId {
        PassId::Resolve
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError> {
        resolve(ctx.grid);
        Ok(())
    }
}

/// Evaporation and drying pass.
pub struct EvaporatePass;

impl ErosionPass for EvaporatePass {
    fn id(&self) -> PassId {
        PassId::Evaporate
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError> {
        let dried = evaporate(ctx.grid, ctx.config);
        log::debug!("evaporate: {:.6} sediment dried to rock", dried);
        Ok(())
    }
}

/// Smoothing pass using `smooth_weight`.
pub struct SmoothPass;

impl ErosionPass for SmoothPass {
    fn id(&self) -> PassId {
        PassId::Smooth
    }

    fn run(&self, ctx: &mut PassContext<'_>) -> Result<(), ErosionError> {
        smooth(ctx.grid, ctx.config.smooth_weight);
        Ok(())
    }
}

/// Ordered list of passes making up one erosion cycle.
pub struct Schedule {
    passes: Vec<Box<dyn ErosionPass>>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl Schedule {
    /// Creates an empty schedule.
    pub fn new() -> Self {
        Self { passes: Vec::new() }
    }

    /// Rain, dissolve, flow, resolve, evaporate.
    pub fn standard() -> Self {
        let mut schedule = Self::new();
        schedule
            .add_pass(RainPass)
            .add_pass(DissolvePass)
            .add_pass(FlowPass)
            .add_pass(ResolvePass)
            .add_pass(EvaporatePass);
        schedule
    }

    /// Appends a pass.
    pub fn add_pass<P: ErosionPass + 'static>(&mut self, pass: P) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Returns the number of passes per cycle.
    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Pass identifiers in execution order.
    pub fn pass_ids(&self) -> Vec<PassId> {
        self.passes.iter().map(|p| p.id()).collect()
    }

    /// Checks that every flow pass is followed directly by a resolve.
    ///
    /// Any other pass in between would change primary water or sediment after
    /// the outflows were staged against them.
    pub fn validate(&self) -> Result<(), ErosionError> {
        let mut pending_flow: Option<usize> = None;

        for (idx, pass) in self.passes.iter().enumerate() {
            let id = pass.id();
            if let Some(flow_idx) = pending_flow {
                if id != PassId::Resolve {
                    return Err(ErosionError::InvalidSchedule(format!(
                        "{} at position {} runs between flow at {} and its resolve",
                        id, idx, flow_idx
                    )));
                }
            }
            match id {
                PassId::Flow => pending_flow = Some(idx),
                PassId::Resolve => pending_flow = None,
                _ => {}
            }
        }

        match pending_flow {
            Some(idx) => Err(ErosionError::InvalidSchedule(format!(
                "flow at position {} is never resolved",
                idx
            ))),
            None => Ok(()),
        }
    }

    /// Runs one cycle, reporting each finished pass to `on_pass`.
    ///
    /// `on_pass` may return `Break` to stop. The request is honored at the
    /// first pass boundary where no staged deltas are outstanding, so a stop
    /// requested after a flow pass takes effect after the following resolve.
    pub fn run_cycle<F>(
        &self,
        ctx: &mut PassContext<'_>,
        cycle: u32,
        cycles: u32,
        on_pass: &mut F,
    ) -> Result<(), ErosionError>
    where
        F: FnMut(&PassProgress) -> ControlFlow<()>,
    {
        let mut staged = false;
        let mut stop_requested = false;

        for pass in &self.passes {
            let id = pass.id();
            pass.run(ctx)?;

            match id {
                PassId::Flow => staged = true,
                PassId::Resolve => staged = false,
                _ => {}
            }

            let progress = PassProgress { cycle, cycles, pass: id };
            if on_pass(&progress).is_break() {
                stop_requested = true;
            }
            if stop_requested && !staged {
                return Err(ErosionError::Cancelled { cycle, pass: id });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Sequence;
    use crate::terrain::Field;

    fn run(
        schedule: &Schedule,
        grid: &mut Grid,
        config: &ErosionConfig,
    ) -> Result<Vec<PassId>, ErosionError> {
        let mut rng = Sequence::constant(0.0);
        let mut ctx = PassContext { grid, config, rng: &mut rng };
        let mut seen = Vec::new();
        schedule.run_cycle(&mut ctx, 1, 1, &mut |p: &PassProgress| {
            seen.push(p.pass);
            ControlFlow::Continue(())
        })?;
        Ok(seen)
    }

    #[test]
    fn test_standard_order() {
        let schedule = Schedule::standard();
        assert_eq!(
            schedule.pass_ids(),
            vec![PassId::Rain, PassId::Dissolve, PassId::Flow, PassId::Resolve, PassId::Evaporate]
        );
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn test_unresolved_flow_is_rejected() {
        let mut schedule = Schedule::new();
        schedule.add_pass(RainPass).add_pass(FlowPass);
        assert!(matches!(schedule.validate(), Err(ErosionError::InvalidSchedule(_))));

        let mut doubled = Schedule::new();
        doubled.add_pass(FlowPass).add_pass(FlowPass).add_pass(ResolvePass);
        assert!(matches!(doubled.validate(), Err(ErosionError::InvalidSchedule(_))));
    }

    #[test]
    fn test_pass_between_flow_and_resolve_is_rejected() {
        let mut smoothed = Schedule::new();
        smoothed.add_pass(FlowPass).add_pass(SmoothPass).add_pass(ResolvePass);
        assert!(matches!(smoothed.validate(), Err(ErosionError::InvalidSchedule(_))));

        let mut evaporated = Schedule::new();
        evaporated.add_pass(FlowPass).add_pass(EvaporatePass).add_pass(ResolvePass);
        assert!(matches!(evaporated.validate(), Err(ErosionError::InvalidSchedule(_))));

        let mut ok = Schedule::new();
        ok.add_pass(FlowPass).add_pass(ResolvePass).add_pass(SmoothPass);
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_run_cycle_reports_every_pass() {
        let mut grid = Grid::flat(3, 100.0);
        let config = ErosionConfig::with_size(3);
        let seen = run(&Schedule::standard(), &mut grid, &config).unwrap();
        assert_eq!(seen, Schedule::standard().pass_ids());
        // A constant 0.0 source rains everywhere.
        assert!(grid.total(Field::Water) > 0.0);
        assert!(!grid.has_staged());
    }

    #[test]
    fn test_stop_after_flow_waits_for_resolve() {
        let rows = [[3.0, 2.0], [2.0, 1.0]];
        let mut grid = Grid::generate(2, |i, j| rows[i][j]);
        let config = ErosionConfig::with_size(2);
        let mut rng = Sequence::constant(0.0);
        let mut ctx = PassContext { grid: &mut grid, config: &config, rng: &mut rng };

        let result = Schedule::standard().run_cycle(&mut ctx, 1, 1, &mut |p: &PassProgress| {
            if p.pass == PassId::Flow {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        match result {
            Err(ErosionError::Cancelled { cycle, pass }) => {
                assert_eq!(cycle, 1);
                assert_eq!(pass, PassId::Resolve);
            }
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert!(!grid.has_staged());
    }

    #[test]
    fn test_pass_names() {
        assert_eq!(SmoothPass.name(), "smooth");
        assert_eq!(PassId::Evaporate.to_string(), "evaporate");
    }
}
