//! Weighted neighborhood smoothing.

use crate::terrain::Grid;

/// Low-pass filters rock, sediment and water over each 8-neighborhood.
///
/// A cell's own value counts `weight` times and each present neighbor once.
/// New values are computed from a snapshot of the whole grid and then written
/// back, so no cell sees a neighbor that was already smoothed this pass.
///
/// The average is taken over differences from the cell's own value, which
/// leaves a uniform field bit-for-bit unchanged.
pub fn smooth(grid: &mut Grid, weight: f64) {
    let snapshot = grid.clone();

    grid.for_each_cell_mut(|i, j, cell| {
        let own = snapshot.cell(i, j);
        let mut count = weight;
        let mut rock = 0.0;
        let mut sediment = 0.0;
        let mut water = 0.0;

        for n in snapshot.neighbors_8(i, j) {
            let other = snapshot.cell(n.i, n.j);
            rock += other.rock - own.rock;
            sediment += other.sediment - own.sediment;
            water += other.water - own.water;
            count += 1.0;
        }

        if count <= 0.0 {
            return;
        }

        cell.rock = own.rock + rock / count;
        cell.sediment = own.sediment + sediment / count;
        cell.water = own.water + water / count;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::Field;

    fn assert_table_close(actual: &[Vec<f64>], expected: &[[f64; 4]; 4]) {
        for i in 0..4 {
            for j in 0..4 {
                assert!(
                    (actual[i][j] - expected[i][j]).abs() < 1e-9,
                    "({}, {}): {} vs {}",
                    i,
                    j,
                    actual[i][j],
                    expected[i][j]
                );
            }
        }
    }

    #[test]
    fn test_reference_grid() {
        let rows = [
            [100.0, 100.0, 150.0, 100.0],
            [100.0, 150.0, 150.0, 150.0],
            [100.0, 100.0, 150.0, 100.0],
            [100.0, 100.0, 100.0, 100.0],
        ];
        let mut grid = Grid::generate(4, |i, j| rows[i][j]);

        smooth(&mut grid, 3.0);

        let expected = [
            [108.33333333333333, 118.75, 137.5, 125.0],
            [106.25, 127.27272727272728, 131.8181818181818, 137.5],
            [106.25, 113.63636363636364, 127.27272727272728, 118.75],
            [100.0, 106.25, 106.25, 108.33333333333333],
        ];
        assert_table_close(&grid.pluck(Field::Rock), &expected);
    }

    #[test]
    fn test_flat_grid_is_unchanged() {
        let mut grid = Grid::flat(5, 123.456);
        grid.for_each_cell_mut(|_, _, cell| {
            cell.water = 0.7;
            cell.sediment = 0.03;
        });
        let before = grid.clone();

        smooth(&mut grid, 3.0);

        assert_eq!(grid, before);
    }

    #[test]
    fn test_uses_snapshot_not_partial_results() {
        // A single spike must spread symmetrically; in-place smoothing would
        // bias toward cells visited after the spike.
        let mut grid = Grid::generate(3, |i, j| if (i, j) == (1, 1) { 90.0 } else { 0.0 });

        smooth(&mut grid, 1.0);

        let rock = grid.pluck(Field::Rock);
        assert_eq!(rock[0][0], rock[2][2]);
        assert_eq!(rock[0][1], rock[2][1]);
        assert_eq!(rock[1][0], rock[1][2]);
        assert!((rock[1][1] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_cell_grid() {
        let mut grid = Grid::flat(1, 42.0);
        smooth(&mut grid, 0.0);
        assert_eq!(grid.get(0, 0).unwrap().rock, 42.0);
    }
}
