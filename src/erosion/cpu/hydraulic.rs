//! Hydraulic erosion passes: rain, dissolve, flow, resolve, evaporate.
//!
//! Every pass traverses the grid once in row-major order. Only the flow pass
//! needs double buffering: it reads primary fields and writes `water_next` /
//! `sediment_next` exclusively, so a cell visited late in the pass still sees
//! its neighbors' pre-pass heights. [`resolve`] then folds the staged deltas
//! back in.

use crate::erosion::{ErosionConfig, ErosionError};
use crate::random::RandomSource;
use crate::terrain::{Field, Grid};

use super::drainage::{drainage, Drainage, LowerNeighbor};

/// Summary of one flow pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowStats {
    /// Cells that sent water downhill.
    pub moving_cells: usize,
    /// Cells that sent everything to a single neighbor.
    pub single_target_cells: usize,
    /// Total water staged for transfer.
    pub water_moved: f64,
    /// Total sediment staged for transfer.
    pub sediment_moved: f64,
}

/// Where a cell's outflow goes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    /// Split across all lower neighbors by `ratio`.
    Proportional,
    /// All of it to one neighbor.
    Single(LowerNeighbor),
}

/// Rains on the grid. Returns the number of cells that received rain.
///
/// Each cell takes one draw; below `chance_of_rain` it gains `amount_of_rain`
/// and every present 8-neighbor gains `amount_of_rain * rain_splash`. Writes
/// are direct: rain never reads water, so order does not matter.
pub fn rain(grid: &mut Grid, config: &ErosionConfig, rng: &mut dyn RandomSource) -> usize {
    let size = grid.size();
    let amount = config.amount_of_rain;
    let splash = amount * config.rain_splash;
    let mut wet = 0;

    for i in 0..size {
        for j in 0..size {
            if rng.next_unit() >= config.chance_of_rain {
                continue;
            }
            wet += 1;
            grid.cell_mut(i, j).water += amount;

            if splash > 0.0 {
                for n in grid.neighbors_8(i, j) {
                    grid.cell_mut(n.i, n.j).water += splash;
                }
            }
        }
    }

    wet
}

/// Adds `amount` of water to every cell, flooring the result at zero.
///
/// A non-finite `amount` is rejected before any cell is touched.
pub fn hydrate(grid: &mut Grid, amount: f64) -> Result<(), ErosionError> {
    if !amount.is_finite() {
        return Err(ErosionError::NonFiniteInput {
            name: "hydrate amount",
            value: amount,
        });
    }
    grid.for_each_cell_mut(|_, _, cell| {
        cell.water = (cell.water + amount).max(0.0);
    });
    Ok(())
}

/// Computes how much rock each cell dissolves into sediment this pass.
///
/// Returns one delta per cell in row-major order; apply them with
/// [`apply_dissolve`]. Per wet cell, `delta = dissolve_rate * water - sediment / 2`; the
/// `sediment / 2` term makes each pass dissolve less as sediment builds up.
/// Positive deltas are capped by the available rock and by `max_dissolve`.
///
/// The grid is only read here, so a non-finite result leaves it untouched.
pub fn dissolve(grid: &Grid, config: &ErosionConfig) -> Result<Vec<f64>, ErosionError> {
    let size = grid.size();
    let mut deltas = vec![0.0; grid.len()];

    for i in 0..size {
        for j in 0..size {
            let cell = grid.cell(i, j);
            if cell.water <= 0.0 {
                continue;
            }

            let mut delta = config.dissolve_rate * cell.water - cell.sediment / 2.0;
            if !delta.is_finite() {
                return Err(ErosionError::NonFinite {
                    i,
                    j,
                    field: Field::Sediment,
                    value: delta,
                });
            }
            if delta <= 0.0 {
                continue;
            }

            delta = delta.min(cell.rock.max(0.0));
            if let Some(cap) = config.max_dissolve {
                delta = delta.min(cap);
            }
            if delta <= 0.0 {
                continue;
            }

            let rock = cell.rock - delta;
            if !rock.is_finite() {
                return Err(ErosionError::NonFinite { i, j, field: Field::Rock, value: rock });
            }
            let sediment = cell.sediment + delta;
            if !sediment.is_finite() {
                return Err(ErosionError::NonFinite {
                    i,
                    j,
                    field: Field::Sediment,
                    value: sediment,
                });
            }

            deltas[i * size + j] = delta;
        }
    }

    Ok(deltas)
}

/// Applies deltas produced by [`dissolve`]: `rock -= delta; sediment += delta`.
pub fn apply_dissolve(grid: &mut Grid, deltas: &[f64]) -> f64 {
    debug_assert_eq!(deltas.len(), grid.len());

    let size = grid.size();
    let mut total = 0.0;
    grid.for_each_cell_mut(|i, j, cell| {
        let delta = deltas[i * size + j];
        if delta > 0.0 {
            cell.rock -= delta;
            cell.sediment += delta;
            total += delta;
        }
    });
    total
}

fn choose_target(d: &Drainage, config: &ErosionConfig, rng: &mut dyn RandomSource) -> Target {
    if config.fast_drop {
        if let Some(lowest) = d.lowest() {
            return Target::Single(*lowest);
        }
    }

    if config.randomness > 0.0 && rng.next_unit() < config.randomness {
        let count = d.neighbors.len();
        let pick = ((rng.next_unit() * count as f64) as usize).min(count - 1);
        return Target::Single(d.neighbors[pick]);
    }

    Target::Proportional
}

/// Stages the outflow of a single cell. Returns `(water, sediment, single_target)` moved.
///
/// Outflow is `min(water, average_drop * flow_damping)`; sediment leaves in
/// proportion to the water fraction leaving, scaled by `sediment_transport`.
fn route_cell(
    grid: &mut Grid,
    config: &ErosionConfig,
    i: usize,
    j: usize,
    rng: &mut dyn RandomSource,
) -> (f64, f64, bool) {
    let cell = *grid.cell(i, j);
    if cell.water <= 0.0 {
        return (0.0, 0.0, false);
    }

    let d = drainage(grid, i, j);
    if d.is_sink() {
        return (0.0, 0.0, false);
    }

    let outflow = cell.water.min(d.average_drop() * config.flow_damping);
    if outflow <= 0.0 {
        return (0.0, 0.0, false);
    }

    let carried = cell.sediment * (outflow / cell.water) * config.sediment_transport;
    let carried = carried.min(cell.sediment).max(0.0);

    let target = choose_target(&d, config, rng);

    let src = grid.cell_mut(i, j);
    src.water_next -= outflow;
    src.sediment_next -= carried;

    match target {
        Target::Single(n) => {
            let dst = grid.cell_mut(n.i, n.j);
            dst.water_next += outflow;
            dst.sediment_next += carried;
            (outflow, carried, true)
        }
        Target::Proportional => {
            for n in &d.neighbors {
                let dst = grid.cell_mut(n.i, n.j);
                dst.water_next += outflow * n.ratio;
                dst.sediment_next += carried * n.ratio;
            }
            (outflow, carried, false)
        }
    }
}

/// Moves water and entrained sediment downhill into the staging fields.
///
/// Reads only primary fields and writes only staging fields; call
/// [`resolve`] afterwards to apply the result.
pub fn flow(grid: &mut Grid, config: &ErosionConfig, rng: &mut dyn RandomSource) -> FlowStats {
    let size = grid.size();
    let mut stats = FlowStats::default();

    for i in 0..size {
        for j in 0..size {
            let (water, sediment, single) = route_cell(grid, config, i, j, rng);
            if water > 0.0 {
                stats.moving_cells += 1;
                stats.water_moved += water;
                stats.sediment_moved += sediment;
                if single {
                    stats.single_target_cells += 1;
                }
            }
        }
    }

    stats
}

/// Folds staged deltas into primary fields and clears staging.
///
/// Water and sediment are floored at zero. Negative rock is clamped to zero;
/// returns how many cells needed that.
pub fn resolve(grid: &mut Grid) -> usize {
    let mut clamped_rock = 0;

    grid.for_each_cell_mut(|i, j, cell| {
        cell.water = (cell.water + cell.water_next).max(0.0);
        cell.sediment = (cell.sediment + cell.sediment_next).max(0.0);
        cell.water_next = 0.0;
        cell.sediment_next = 0.0;

        if cell.rock < 0.0 {
            log::debug!("Clamping negative rock {} at ({}, {})", cell.rock, i, j);
            cell.rock = 0.0;
            clamped_rock += 1;
        }
    });

    if clamped_rock > 0 {
        log::warn!("Clamped negative rock in {} cells", clamped_rock);
    }

    clamped_rock
}

/// Evaporates water and dries sediment the remaining water cannot hold.
///
/// Returns the total sediment converted back into rock.
pub fn evaporate(grid: &mut Grid, config: &ErosionConfig) -> f64 {
    let retain = 1.0 - config.evaporation_rate;
    let mut dried = 0.0;

    grid.for_each_cell_mut(|_, _, cell| {
        cell.water *= retain;

        if cell.water < config.dry_threshold {
            cell.water = 0.0;
            cell.rock += cell.sediment;
            dried += cell.sediment;
            cell.sediment = 0.0;
            return;
        }

        let max_sediment = cell.water * config.saturation_ratio;
        if cell.sediment > max_sediment {
            let excess = cell.sediment - max_sediment;
            cell.rock += excess;
            cell.sediment = max_sediment;
            dried += excess;
        }
    });

    dried
}
