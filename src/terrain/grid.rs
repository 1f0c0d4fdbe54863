//! Dense square grid of erosion cells.

use crate::geometry::neighbors::{neighbor_4, neighbor_8, neighbors_in_radius, Neighbor};
use super::cell::{Cell, Field};

/// Grid-wide sums of each conserved quantity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassBudget {
    pub rock: f64,
    pub water: f64,
    pub sediment: f64,
}

impl MassBudget {
    /// Solid material: rock plus suspended sediment.
    pub fn material(&self) -> f64 {
        self.rock + self.sediment
    }

    /// Everything, water included.
    pub fn total(&self) -> f64 {
        self.rock + self.sediment + self.water
    }
}

/// An N×N array of [`Cell`]s stored in row-major order.
///
/// Index `(i, j)` is row `i`, column `j`. Nothing is ever added or removed
/// after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    size: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Builds a grid whose rock heights come from `height(i, j)`.
    ///
    /// Water and sediment start at zero.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn generate<F>(size: usize, mut height: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        assert!(size >= 1, "grid size must be at least 1");

        let mut cells = Vec::with_capacity(size * size);
        for i in 0..size {
            for j in 0..size {
                cells.push(Cell::with_rock(height(i, j)));
            }
        }

        Self { size, cells }
    }

    /// Builds a grid with the same rock height everywhere.
    pub fn flat(size: usize, rock: f64) -> Self {
        Self::generate(size, |_, _| rock)
    }

    /// Side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells (`size * size`).
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false; a grid holds at least one cell.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    fn index(&self, i: usize, j: usize) -> Option<usize> {
        if i < self.size && j < self.size {
            Some(i * self.size + j)
        } else {
            None
        }
    }

    /// Returns the cell at `(i, j)`, or `None` off-grid.
    pub fn get(&self, i: usize, j: usize) -> Option<&Cell> {
        self.index(i, j).map(|idx| &self.cells[idx])
    }

    /// Returns the cell at `(i, j)` mutably, or `None` off-grid.
    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut Cell> {
        match self.index(i, j) {
            Some(idx) => Some(&mut self.cells[idx]),
            None => None,
        }
    }

    /// Cell access for coordinates already known to be on-grid.
    #[inline]
    pub(crate) fn cell(&self, i: usize, j: usize) -> &Cell {
        &self.cells[i * self.size + j]
    }

    #[inline]
    pub(crate) fn cell_mut(&mut self, i: usize, j: usize) -> &mut Cell {
        &mut self.cells[i * self.size + j]
    }

    /// Positions within `radius` of `(i, j)`; see [`neighbors_in_radius`].
    ///
    /// Returns an empty list when `(i, j)` itself is off-grid.
    pub fn neighbors(
        &self,
        i: usize,
        j: usize,
        radius: usize,
        include_center: bool,
    ) -> Vec<Neighbor> {
        if self.index(i, j).is_none() {
            return Vec::new();
        }
        neighbors_in_radius(self.size, i, j, radius, include_center)
    }

    /// The present 8-neighbors of `(i, j)` in row-major order.
    pub fn neighbors_8(&self, i: usize, j: usize) -> Vec<Neighbor> {
        if self.index(i, j).is_none() {
            return Vec::new();
        }
        neighbor_8(self.size, i, j)
    }

    /// The present 4-neighbors of `(i, j)` (north, south, west, east).
    pub fn neighbors_4(&self, i: usize, j: usize) -> Vec<Neighbor> {
        if self.index(i, j).is_none() {
            return Vec::new();
        }
        neighbor_4(self.size, i, j)
    }

    /// Visits every cell in row-major order.
    pub fn for_each_cell<F>(&self, mut f: F)
    where
        F: FnMut(usize, usize, &Cell),
    {
        for (idx, cell) in self.cells.iter().enumerate() {
            f(idx / self.size, idx % self.size, cell);
        }
    }

    /// Visits every cell mutably in row-major order.
    pub fn for_each_cell_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize, &mut Cell),
    {
        let size = self.size;
        for (idx, cell) in self.cells.iter_mut().enumerate() {
            f(idx / size, idx % size, cell);
        }
    }

    /// Row-major view of the raw cells.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Collects `f(cell)` for every position into a `size × size` table.
    pub fn map<F>(&self, mut f: F) -> Vec<Vec<f64>>
    where
        F: FnMut(&Cell) -> f64,
    {
        self.cells
            .chunks(self.size)
            .map(|row| row.iter().map(&mut f).collect())
            .collect()
    }

    /// Snapshot of one raw field.
    pub fn pluck(&self, field: Field) -> Vec<Vec<f64>> {
        self.map(|cell| cell.get(field))
    }

    /// Snapshot of total surface heights (`rock + sediment + water`).
    pub fn heights(&self) -> Vec<Vec<f64>> {
        self.map(Cell::height)
    }

    /// Sum of one field across the grid.
    pub fn total(&self, field: Field) -> f64 {
        self.cells.iter().map(|cell| cell.get(field)).sum()
    }

    /// Sums of rock, water and sediment.
    pub fn budget(&self) -> MassBudget {
        self.cells.iter().fold(MassBudget::default(), |mut acc, cell| {
            acc.rock += cell.rock;
            acc.water += cell.water;
            acc.sediment += cell.sediment;
            acc
        })
    }

    /// Minimum and maximum surface height.
    pub fn height_range(&self) -> (f64, f64) {
        let mut min = f64::MAX;
        let mut max = f64::MIN;

        for cell in &self.cells {
            let h = cell.height();
            min = min.min(h);
            max = max.max(h);
        }

        (min, max)
    }

    /// Returns true if any cell still holds staged deltas.
    pub fn has_staged(&self) -> bool {
        self.cells.iter().any(Cell::has_staged)
    }
}
