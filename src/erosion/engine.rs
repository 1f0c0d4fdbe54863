//! The erosion engine: owns the grid and drives passes over it.

use std::ops::ControlFlow;

use thiserror::Error;

use crate::erosion::cpu::hydraulic::{self, FlowStats};
use crate::erosion::cpu::smooth::smooth;
use crate::erosion::{ConfigError, ErosionConfig};
use crate::pipeline::{ErosionPass, PassContext, PassId, PassProgress, Schedule, SmoothPass};
use crate::random::RandomSource;
use crate::terrain::{Field, Grid, MassBudget};

/// Errors raised while building or running an engine.
#[derive(Error, Debug)]
pub enum ErosionError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Both a height table and a height function were supplied")]
    AmbiguousHeights,
    #[error(
        "Height table must be {expected}x{expected}: got {rows} rows, first bad row {bad_row:?}"
    )]
    HeightsShape {
        expected: usize,
        rows: usize,
        bad_row: Option<usize>,
    },
    #[error("Initial height at ({i}, {j}) is not finite: {value}")]
    InvalidHeight { i: usize, j: usize, value: f64 },
    #[error("Non-finite {field} at ({i}, {j}): {value}")]
    NonFinite {
        i: usize,
        j: usize,
        field: Field,
        value: f64,
    },
    #[error("Non-finite {name}: {value}")]
    NonFiniteInput { name: &'static str, value: f64 },
    #[error("Invalid pass schedule: {0}")]
    InvalidSchedule(String),
    #[error("Cancelled in cycle {cycle} after the {pass} pass")]
    Cancelled { cycle: u32, pass: PassId },
}

type HeightFn<'a> = Box<dyn FnMut(usize, usize) -> f64 + 'a>;

/// Collects the initial terrain and pass schedule for an [`ErosionEngine`].
///
/// Supply at most one of [`heights`](Self::heights) and
/// [`height_fn`](Self::height_fn). With neither, rock heights are drawn as
/// `100 + u * 100` from the engine's random source.
pub struct EngineBuilder<'a> {
    config: ErosionConfig,
    heights: Option<Vec<Vec<f64>>>,
    height_fn: Option<HeightFn<'a>>,
    schedule: Option<Schedule>,
}

impl<'a> EngineBuilder<'a> {
    pub fn new(config: ErosionConfig) -> Self {
        Self {
            config,
            heights: None,
            height_fn: None,
            schedule: None,
        }
    }

    /// Initial rock heights as a `size x size` table.
    pub fn heights(mut self, heights: Vec<Vec<f64>>) -> Self {
        self.heights = Some(heights);
        self
    }

    /// Initial rock heights from a callback `(i, j) -> height`.
    pub fn height_fn<F>(mut self, height: F) -> Self
    where
        F: FnMut(usize, usize) -> f64 + 'a,
    {
        self.height_fn = Some(Box::new(height));
        self
    }

    /// Replaces the standard per-cycle pass order.
    pub fn schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Validates everything and builds the engine around `rng`.
    pub fn build<R: RandomSource>(self, mut rng: R) -> Result<ErosionEngine<R>, ErosionError> {
        self.config.validate()?;
        let size = self.config.size;

        let grid = match (self.heights, self.height_fn) {
            (Some(_), Some(_)) => return Err(ErosionError::AmbiguousHeights),
            (Some(table), None) => {
                check_shape(&table, size)?;
                Grid::generate(size, |i, j| table[i][j])
            }
            (None, Some(mut height)) => Grid::generate(size, |i, j| height(i, j)),
            (None, None) => Grid::generate(size, |_, _| 100.0 + rng.next_unit() * 100.0),
        };

        let mut bad = None;
        grid.for_each_cell(|i, j, cell| {
            if bad.is_none() && !cell.rock.is_finite() {
                bad = Some(ErosionError::InvalidHeight { i, j, value: cell.rock });
            }
        });
        if let Some(err) = bad {
            return Err(err);
        }

        let schedule = self.schedule.unwrap_or_default();
        schedule.validate()?;

        log::debug!(
            "Built {}x{} erosion engine with passes {:?}",
            size,
            size,
            schedule.pass_ids()
        );

        Ok(ErosionEngine {
            grid,
            config: self.config,
            rng,
            schedule,
            cycles_run: 0,
        })
    }
}

fn check_shape(table: &[Vec<f64>], size: usize) -> Result<(), ErosionError> {
    let bad_row = table.iter().position(|row| row.len() != size);
    if table.len() != size || bad_row.is_some() {
        return Err(ErosionError::HeightsShape {
            expected: size,
            rows: table.len(),
            bad_row,
        });
    }
    Ok(())
}

/// Hydraulic erosion over a square grid.
///
/// Every mutating operation takes `&mut self`; an engine is driven by one
/// caller at a time.
pub struct ErosionEngine<R> {
    grid: Grid,
    config: ErosionConfig,
    rng: R,
    schedule: Schedule,
    cycles_run: u64,
}

impl<R: RandomSource> ErosionEngine<R> {
    /// Engine with heights drawn from `rng`.
    pub fn new(config: ErosionConfig, rng: R) -> Result<Self, ErosionError> {
        EngineBuilder::new(config).build(rng)
    }

    /// Engine over an explicit height table.
    pub fn with_heights(
        config: ErosionConfig,
        heights: Vec<Vec<f64>>,
        rng: R,
    ) -> Result<Self, ErosionError> {
        EngineBuilder::new(config).heights(heights).build(rng)
    }

    /// Engine with heights from a callback.
    pub fn with_height_fn<F>(config: ErosionConfig, height: F, rng: R) -> Result<Self, ErosionError>
    where
        F: FnMut(usize, usize) -> f64,
    {
        EngineBuilder::new(config).height_fn(height).build(rng)
    }

    /// Runs `n` cycles, then the final smooth if enabled.
    pub fn cycle(&mut self, n: u32) -> Result<(), ErosionError> {
        self.cycle_with_callbacks(n, |_| ControlFlow::Continue(()))
    }

    /// Runs `n` cycles, reporting every completed pass.
    ///
    /// # Arguments
    /// * `n` - Number of cycles; 0 runs only the final smooth
    /// * `on_pass` - Called after each pass; `Break` cancels the run
    ///
    /// # Returns
    /// `ErosionError::Cancelled` if `on_pass` broke. Passes already completed
    /// stay applied and no staged flow is left behind.
    pub fn cycle_with_callbacks<F>(&mut self, n: u32, mut on_pass: F) -> Result<(), ErosionError>
    where
        F: FnMut(&PassProgress) -> ControlFlow<()>,
    {
        for c in 1..=n {
            log::debug!("Cycle {}/{} (total {})", c, n, self.cycles_run + 1);

            let mut ctx = PassContext {
                grid: &mut self.grid,
                config: &self.config,
                rng: &mut self.rng,
            };
            self.schedule.run_cycle(&mut ctx, c, n, &mut on_pass)?;
            self.cycles_run += 1;

            let every = u64::from(self.config.smooth_every);
            if every > 0 && self.cycles_run % every == 0 {
                self.run_smooth(c, n, &mut on_pass)?;
            }
        }

        if self.config.final_smooth {
            self.run_smooth(n, n, &mut on_pass)?;
        }

        let budget = self.grid.budget();
        log::info!(
            "Eroded {} cycles (total {}): rock={:.3} water={:.3} sediment={:.3} material={:.3}",
            n,
            self.cycles_run,
            budget.rock,
            budget.water,
            budget.sediment,
            budget.material()
        );

        Ok(())
    }

    fn run_smooth<F>(
        &mut self,
        cycle: u32,
        cycles: u32,
        on_pass: &mut F,
    ) -> Result<(), ErosionError>
    where
        F: FnMut(&PassProgress) -> ControlFlow<()>,
    {
        let mut ctx = PassContext {
            grid: &mut self.grid,
            config: &self.config,
            rng: &mut self.rng,
        };
        SmoothPass.run(&mut ctx)?;

        let progress = PassProgress { cycle, cycles, pass: PassId::Smooth };
        match on_pass(&progress) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(ErosionError::Cancelled { cycle, pass: PassId::Smooth }),
        }
    }

    /// One rain pass. Returns the number of cells rained on.
    pub fn rain(&mut self) -> usize {
        hydraulic::rain(&mut self.grid, &self.config, &mut self.rng)
    }

    /// Adds water to every cell; `None` uses `amount_of_rain`.
    ///
    /// A non-finite amount fails with `ErosionError::NonFiniteInput` and
    /// leaves the grid untouched.
    pub fn hydrate(&mut self, amount: Option<f64>) -> Result<(), ErosionError> {
        let amount = amount.unwrap_or(self.config.amount_of_rain);
        hydraulic::hydrate(&mut self.grid, amount)
    }

    /// One dissolve pass. Returns the rock turned into sediment.
    ///
    /// On error the grid is left untouched.
    pub fn dissolve(&mut self) -> Result<f64, ErosionError> {
        let deltas = hydraulic::dissolve(&self.grid, &self.config)?;
        Ok(hydraulic::apply_dissolve(&mut self.grid, &deltas))
    }

    /// One flow pass. Deltas stay staged until [`resolve`](Self::resolve).
    pub fn flow(&mut self) -> FlowStats {
        hydraulic::flow(&mut self.grid, &self.config, &mut self.rng)
    }

    /// Applies staged deltas. Returns the number of cells whose rock was clamped.
    pub fn resolve(&mut self) -> usize {
        hydraulic::resolve(&mut self.grid)
    }

    /// One evaporation pass. Returns the sediment dried back to rock.
    ///
    /// Call [`resolve`](Self::resolve) first if a flow pass is pending.
    pub fn evaporate(&mut self) -> f64 {
        hydraulic::evaporate(&mut self.grid, &self.config)
    }

    /// One smoothing pass with the configured weight.
    ///
    /// Must not run while flow deltas are staged: outflows were computed
    /// against the unsmoothed water, and resolving them afterwards can drive
    /// cells negative. Call [`resolve`](Self::resolve) first.
    pub fn smooth(&mut self) {
        smooth(&mut self.grid, self.config.smooth_weight);
    }

    /// Total height (rock + sediment + water) per cell.
    pub fn heights(&self) -> Vec<Vec<f64>> {
        self.grid.heights()
    }

    /// Snapshot of one raw field.
    pub fn pluck(&self, field: Field) -> Vec<Vec<f64>> {
        self.grid.pluck(field)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn budget(&self) -> MassBudget {
        self.grid.budget()
    }

    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    /// Cycles completed over the engine's lifetime.
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Consumes the engine, returning its grid.
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}
