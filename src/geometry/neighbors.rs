//! Bounds-checked neighbor mapping on a square grid.
//!
//! The grid does not wrap: a step that leaves `[0, size)` on either axis
//! yields no neighbor at all rather than a clamped or wrapped cell. Every
//! enumeration here is row-major (`i` outer, `j` inner) so that callers which
//! break ties by "first seen" get the same answer on every run.

/// A grid position produced by a neighborhood query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Neighbor {
    /// Row.
    pub i: usize,
    /// Column.
    pub j: usize,
}

/// Applies a signed step to `(i, j)`, returning `None` when the result is off-grid.
#[inline]
pub fn offset(size: usize, i: usize, j: usize, di: isize, dj: isize) -> Option<(usize, usize)> {
    let ni = i as isize + di;
    let nj = j as isize + dj;
    let range = 0..size as isize;
    if range.contains(&ni) && range.contains(&nj) {
        Some((ni as usize, nj as usize))
    } else {
        None
    }
}

/// Returns the 4-neighborhood (von Neumann) of `(i, j)`.
///
/// Order is north, south, west, east; absent positions are skipped.
pub fn neighbor_4(size: usize, i: usize, j: usize) -> Vec<Neighbor> {
    debug_assert!(i < size && j < size);

    [(-1, 0), (1, 0), (0, -1), (0, 1)]
        .into_iter()
        .filter_map(|(di, dj)| offset(size, i, j, di, dj))
        .map(|(i, j)| Neighbor { i, j })
        .collect()
}

/// Returns every position in the square of side `2 * radius + 1` centered on `(i, j)`.
///
/// The center is included only when `include_center` is set. Positions outside
/// the grid are omitted, so `len()` is always the number of real cells and can
/// be used directly as an averaging divisor.
pub fn neighbors_in_radius(
    size: usize,
    i: usize,
    j: usize,
    radius: usize,
    include_center: bool,
) -> Vec<Neighbor> {
    debug_assert!(i < size && j < size);

    let r = radius as isize;
    let side = 2 * radius + 1;
    let mut out = Vec::with_capacity(side * side);

    for di in -r..=r {
        for dj in -r..=r {
            if di == 0 && dj == 0 && !include_center {
                continue;
            }
            if let Some((ni, nj)) = offset(size, i, j, di, dj) {
                out.push(Neighbor { i: ni, j: nj });
            }
        }
    }

    out
}

/// Returns the 8-neighborhood (Moore) of `(i, j)`, excluding the center.
pub fn neighbor_8(size: usize, i: usize, j: usize) -> Vec<Neighbor> {
    neighbors_in_radius(size, i, j, 1, false)
}
