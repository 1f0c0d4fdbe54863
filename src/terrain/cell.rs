//! Per-cell scalar state.

use std::fmt;

/// One grid position's worth of erosion state.
///
/// `water_next` and `sediment_next` are staging accumulators written by the
/// flow pass and drained by the resolve pass; between passes they are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cell {
    /// Solid, immobile mass.
    pub rock: f64,
    /// Mobile fluid volume.
    pub water: f64,
    /// Rock mass suspended in the water.
    pub sediment: f64,
    /// Staged water delta for the current flow pass.
    pub water_next: f64,
    /// Staged sediment delta for the current flow pass.
    pub sediment_next: f64,
}

impl Cell {
    /// Creates a dry cell with the given rock height.
    pub fn with_rock(rock: f64) -> Self {
        Self {
            rock,
            ..Default::default()
        }
    }

    /// Surface height including standing water: `rock + sediment + water`.
    #[inline]
    pub fn height(&self) -> f64 {
        self.rock + self.sediment + self.water
    }

    /// Ground height without water: `rock + sediment`.
    #[inline]
    pub fn ground_height(&self) -> f64 {
        self.rock + self.sediment
    }

    /// Reads a single scalar.
    #[inline]
    pub fn get(&self, field: Field) -> f64 {
        match field {
            Field::Rock => self.rock,
            Field::Water => self.water,
            Field::Sediment => self.sediment,
            Field::StagedWater => self.water_next,
            Field::StagedSediment => self.sediment_next,
        }
    }

    /// Returns true while staged deltas are waiting to be resolved.
    pub fn has_staged(&self) -> bool {
        self.water_next != 0.0 || self.sediment_next != 0.0
    }
}

/// Names one scalar stored in a [`Cell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Rock,
    Water,
    Sediment,
    StagedWater,
    StagedSediment,
}

impl Field {
    /// Returns all fields in declaration order.
    pub const fn all() -> [Field; 5] {
        [
            Field::Rock,
            Field::Water,
            Field::Sediment,
            Field::StagedWater,
            Field::StagedSediment,
        ]
    }

    /// Returns the field name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            Field::Rock => "rock",
            Field::Water => "water",
            Field::Sediment => "sediment",
            Field::StagedWater => "water_next",
            Field::StagedSediment => "sediment_next",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_includes_water() {
        let cell = Cell {
            rock: 100.0,
            sediment: 50.0,
            water: 25.0,
            ..Default::default()
        };
        assert_eq!(cell.height(), 175.0);
        assert_eq!(cell.ground_height(), 150.0);
    }

    #[test]
    fn test_get_matches_fields() {
        let cell = Cell {
            rock: 1.0,
            water: 2.0,
            sediment: 3.0,
            water_next: 4.0,
            sediment_next: 5.0,
        };
        let values: Vec<f64> = Field::all().iter().map(|&f| cell.get(f)).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(cell.has_staged());
        assert!(!Cell::with_rock(10.0).has_staged());
    }
}
