//! Downhill neighbor analysis used by the flow pass.
//!
//! Pure queries over a [`Grid`]; nothing here mutates state.

use crate::terrain::Grid;

/// A strictly lower 8-neighbor of the cell under analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LowerNeighbor {
    pub i: usize,
    pub j: usize,
    /// Surface height of the neighbor.
    pub height: f64,
    /// `center height - neighbor height`, always positive.
    pub drop: f64,
    /// `drop / total_drop`; the neighbor's share of a proportional split.
    pub ratio: f64,
}

/// The lower neighborhood of one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Drainage {
    /// Surface height of the cell itself.
    pub height: f64,
    /// Mean height of the cell together with its lower neighbors.
    pub average_height: f64,
    /// Sum of all drops.
    pub total_drop: f64,
    /// Lower neighbors in row-major order.
    pub neighbors: Vec<LowerNeighbor>,
}

impl Drainage {
    /// True when no neighbor is strictly lower (local minimum or plateau).
    pub fn is_sink(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// `total_drop / (count + 1)`; the cell itself counts as one slot so
    /// it stays partly filled.
    pub fn average_drop(&self) -> f64 {
        self.total_drop / (self.neighbors.len() + 1) as f64
    }

    /// The lowest neighbor; ties go to the first in traversal order.
    pub fn lowest(&self) -> Option<&LowerNeighbor> {
        let mut best: Option<&LowerNeighbor> = None;
        for n in &self.neighbors {
            if best.map_or(true, |b| n.height < b.height) {
                best = Some(n);
            }
        }
        best
    }
}

/// Collects the strictly lower 8-neighbors of `(i, j)` with drops and ratios.
///
/// Off-grid positions are skipped. Heights include water.
pub fn drainage(grid: &Grid, i: usize, j: usize) -> Drainage {
    let height = grid.cell(i, j).height();

    let mut neighbors = Vec::with_capacity(8);
    let mut total_drop = 0.0;
    let mut total_height = height;

    for n in grid.neighbors_8(i, j) {
        let h = grid.cell(n.i, n.j).height();
        if h >= height {
            continue;
        }
        let drop = height - h;
        total_drop += drop;
        total_height += h;
        neighbors.push(LowerNeighbor {
            i: n.i,
            j: n.j,
            height: h,
            drop,
            ratio: 0.0,
        });
    }

    for n in &mut neighbors {
        n.ratio = n.drop / total_drop;
    }

    let average_height = total_height / (neighbors.len() + 1) as f64;

    Drainage {
        height,
        average_height,
        total_drop,
        neighbors,
    }
}
