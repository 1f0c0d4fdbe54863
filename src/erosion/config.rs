//! Erosion configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating an [`ErosionConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Grid size must be at least 1, got {0}")]
    InvalidSize(usize),
    #[error("Parameter '{name}' = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("Parameter '{name}' must be finite")]
    NonFinite { name: &'static str },
}

/// Parameters for the hydraulic erosion cycle.
///
/// Missing fields in a JSON file fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionConfig {
    /// Grid side length.
    pub size: usize,

    /// Probability (0-1) that a cell receives rain in a cycle.
    pub chance_of_rain: f64,
    /// Water added to a cell when it rains there.
    pub amount_of_rain: f64,
    /// Fraction of `amount_of_rain` also added to each 8-neighbor. 0 disables splash.
    pub rain_splash: f64,

    /// Sediment produced per unit of water in one dissolve pass. Must be non-negative.
    pub dissolve_rate: f64,
    /// Optional cap on rock dissolved from one cell per pass.
    pub max_dissolve: Option<f64>,

    /// Fraction of water lost per evaporation pass (0-1).
    pub evaporation_rate: f64,
    /// Sediment the water can hold, per unit of water.
    pub saturation_ratio: f64,
    /// Water below this level is removed and its sediment dries out.
    pub dry_threshold: f64,

    /// Probability (0-1) that a cell sends its outflow to one random lower neighbor.
    pub randomness: f64,
    /// Always send the whole outflow to the lowest neighbor.
    pub fast_drop: bool,
    /// Fraction of the average drop that may leave a cell per pass.
    pub flow_damping: f64,
    /// Scale on the sediment carried along with flowing water (1 = proportional).
    pub sediment_transport: f64,

    /// How many neighbors' worth a cell's own value counts for when smoothing.
    pub smooth_weight: f64,
    /// Smooth every N cycles. 0 disables periodic smoothing.
    pub smooth_every: u32,
    /// Smooth once after the last cycle of each `cycle` call.
    pub final_smooth: bool,
}

impl Default for ErosionConfig {
    fn default() -> Self {
        Self {
            size: 10,

            chance_of_rain: 0.25,
            amount_of_rain: 1.0,
            rain_splash: 0.0,

            dissolve_rate: 0.02,
            max_dissolve: None,

            evaporation_rate: 0.3,
            saturation_ratio: 0.05,
            dry_threshold: 0.01,

            randomness: 0.1,
            fast_drop: false,
            flow_damping: 0.5,
            sediment_transport: 1.0,

            smooth_weight: 3.0,
            smooth_every: 0,
            final_smooth: true,
        }
    }
}

impl ErosionConfig {
    /// Default parameters on a grid of the given size.
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Light rain and slow dissolution; keeps most of the initial relief.
    pub fn gentle(size: usize) -> Self {
        Self {
            size,
            chance_of_rain: 0.15,
            amount_of_rain: 0.5,
            dissolve_rate: 0.01,
            evaporation_rate: 0.4,
            randomness: 0.05,
            ..Default::default()
        }
    }

    /// Heavy splashing rain and fast dissolution; carves channels quickly.
    pub fn aggressive(size: usize) -> Self {
        Self {
            size,
            chance_of_rain: 0.5,
            amount_of_rain: 2.0,
            rain_splash: 0.25,
            dissolve_rate: 0.05,
            evaporation_rate: 0.2,
            saturation_ratio: 0.1,
            randomness: 0.2,
            smooth_every: 10,
            ..Default::default()
        }
    }

    /// Checks every parameter against its allowed range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size < 1 {
            return Err(ConfigError::InvalidSize(self.size));
        }

        check_range("chance_of_rain", self.chance_of_rain, 0.0, 1.0)?;
        check_range("amount_of_rain", self.amount_of_rain, 0.0, f64::MAX)?;
        check_range("rain_splash", self.rain_splash, 0.0, 1.0)?;
        check_range("dissolve_rate", self.dissolve_rate, 0.0, f64::MAX)?;
        if let Some(cap) = self.max_dissolve {
            check_range("max_dissolve", cap, 0.0, f64::MAX)?;
        }
        check_range("evaporation_rate", self.evaporation_rate, 0.0, 1.0)?;
        check_range("saturation_ratio", self.saturation_ratio, 0.0, f64::MAX)?;
        check_range("dry_threshold", self.dry_threshold, 0.0, f64::MAX)?;
        check_range("randomness", self.randomness, 0.0, 1.0)?;
        check_range("flow_damping", self.flow_damping, 0.0, 1.0)?;
        check_range("sediment_transport", self.sediment_transport, 0.0, f64::MAX)?;
        check_range("smooth_weight", self.smooth_weight, 0.0, f64::MAX)?;

        Ok(())
    }

    /// Loads a configuration from a JSON file and validates it.
    pub fn load_json(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as pretty-printed JSON.
    pub fn save_json(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NonFinite { name })
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    check_finite(name, value)?;
    if value < min || value > max {
        return Err(ConfigError::OutOfRange { name, value, min, max });
    }
    Ok(())
}
