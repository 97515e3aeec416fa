//! Erosion simulation parameters and configuration

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Erosion intensity preset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErosionPreset {
    /// No erosion - raw terrain
    None,
    /// Minimal erosion - subtle smoothing
    Minimal,
    /// Normal erosion - balanced
    #[default]
    Normal,
    /// Dramatic erosion - deep valleys and canyons
    Dramatic,
    /// Realistic erosion - high iteration count
    Realistic,
}

impl ErosionPreset {
    pub fn all() -> &'static [Self] {
        &[Self::None, Self::Minimal, Self::Normal, Self::Dramatic, Self::Realistic]
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::None => "No erosion (raw terrain)",
            Self::Minimal => "Subtle smoothing",
            Self::Normal => "Balanced erosion",
            Self::Dramatic => "Deep valleys and canyons",
            Self::Realistic => "High-quality simulation",
        }
    }
}

impl std::fmt::Display for ErosionPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Minimal => write!(f, "minimal"),
            Self::Normal => write!(f, "normal"),
            Self::Dramatic => write!(f, "dramatic"),
            Self::Realistic => write!(f, "realistic"),
        }
    }
}

impl FromStr for ErosionPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::UnknownPreset(s.to_string()))
    }
}

/// Droplet-based hydraulic erosion parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HydraulicParams {
    /// Number of water droplets to simulate
    pub iterations: usize,

    /// Fraction of the free sediment capacity eroded per step
    pub erosion_strength: f32,

    /// Fraction of the excess sediment deposited per step when over capacity
    pub deposition_strength: f32,

    /// Fractional water loss per step (0.0-1.0)
    pub evaporation_rate: f32,

    /// Sediment carrying capacity multiplier
    pub sediment_capacity: f32,

    /// Floor for the slope term of the capacity on flat ground
    pub min_slope: f32,

    /// Acceleration constant for the speed update
    pub gravity: f32,

    /// Maximum path length (steps) per droplet
    pub max_droplet_lifetime: usize,

    /// Momentum conservation factor (0.0-1.0)
    /// Higher values = droplets keep their heading, lower = follow steepest descent
    pub inertia: f32,

    /// Initial water volume for each droplet
    pub initial_water: f32,

    /// Initial speed for each droplet
    pub initial_speed: f32,

    /// Water volume below which a droplet has evaporated
    pub min_water: f32,
}

impl Default for HydraulicParams {
    fn default() -> Self {
        Self {
            iterations: 100,
            erosion_strength: 0.3,
            deposition_strength: 0.3,
            evaporation_rate: 0.01,
            sediment_capacity: 4.0,
            min_slope: 0.01,
            gravity: 9.81,
            max_droplet_lifetime: 30,
            inertia: 0.05,
            initial_water: 1.0,
            initial_speed: 1.0,
            min_water: 0.001,
        }
    }
}

/// Talus-angle slope relaxation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalParams {
    /// Number of full-grid sweeps
    pub iterations: usize,
    /// Stability threshold in degrees
    pub talus_angle: f32,
    /// Fraction of the excess moved per sweep
    pub erosion_rate: f32,
    /// Minimum height difference (meters) to trigger a transfer
    pub min_height_difference: f32,
}

impl Default for ThermalParams {
    fn default() -> Self {
        Self {
            iterations: 50,
            talus_angle: 45.0,
            erosion_rate: 0.5,
            min_height_difference: 0.1,
        }
    }
}

/// Directional abrasion/deposition parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindParams {
    /// Number of passes
    pub iterations: usize,
    /// Wind heading in grid space (+x = increasing column, +y = increasing row)
    pub wind_direction: [f32; 2],
    /// Overall magnitude of the per-pass transfer
    pub wind_strength: f32,
    /// Removal rate on windward faces
    pub abrasion_rate: f32,
    /// Fraction of the carried load dropped at each downwind cell
    pub deposition_rate: f32,
}

impl Default for WindParams {
    fn default() -> Self {
        Self {
            iterations: 50,
            wind_direction: [1.0, 0.0],
            wind_strength: 0.2,
            abrasion_rate: 0.1,
            deposition_rate: 0.05,
        }
    }
}

/// Flow-driven sediment smoothing parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SedimentParams {
    /// Upstream cell count a channel can carry without losing bed material
    pub transport_capacity: f32,
    /// Fraction of the moving load that settles at each downstream cell
    pub deposition_rate: f32,
}

impl Default for SedimentParams {
    fn default() -> Self {
        Self {
            transport_capacity: 8.0,
            deposition_rate: 0.5,
        }
    }
}

/// Drainage network extraction parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrainageParams {
    /// Streams shorter than this (world units) are dropped
    pub min_stream_length: f32,
    /// Minimum flow accumulation for a cell to be part of a channel.
    /// `None` uses the grid resolution (about the square root of the cell count).
    pub source_accumulation: Option<f32>,
}

impl Default for DrainageParams {
    fn default() -> Self {
        Self {
            min_stream_length: 0.0,
            source_accumulation: None,
        }
    }
}

/// Global erosion pipeline parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErosionParams {
    pub hydraulic: HydraulicParams,
    pub thermal: ThermalParams,
    pub wind: WindParams,
    pub sediment: SedimentParams,
    pub drainage: DrainageParams,

    /// Enable droplet-based hydraulic erosion
    pub enable_hydraulic: bool,
    /// Enable talus-angle thermal erosion
    pub enable_thermal: bool,
    /// Enable wind abrasion
    pub enable_wind: bool,
    /// Enable flow-driven sediment smoothing
    pub enable_sediment_transport: bool,
    /// Extract drainage patterns at the end of the pipeline
    pub enable_drainage: bool,
}

impl Default for ErosionParams {
    fn default() -> Self {
        Self {
            hydraulic: HydraulicParams::default(),
            thermal: ThermalParams::default(),
            wind: WindParams::default(),
            sediment: SedimentParams::default(),
            drainage: DrainageParams::default(),
            enable_hydraulic: true,
            enable_thermal: true,
            enable_wind: true,
            enable_sediment_transport: true,
            enable_drainage: true,
        }
    }
}

impl ErosionParams {
    /// Create a fast configuration for testing (fewer iterations)
    pub fn fast() -> Self {
        Self {
            hydraulic: HydraulicParams { iterations: 50, ..Default::default() },
            thermal: ThermalParams { iterations: 10, ..Default::default() },
            wind: WindParams { iterations: 10, ..Default::default() },
            ..Default::default()
        }
    }

    /// Only hydraulic erosion
    pub fn hydraulic_only() -> Self {
        Self {
            enable_thermal: false,
            enable_wind: false,
            enable_sediment_transport: false,
            ..Default::default()
        }
    }

    /// Create parameters from a preset
    pub fn from_preset(preset: ErosionPreset) -> Self {
        match preset {
            ErosionPreset::None => Self {
                enable_hydraulic: false,
                enable_thermal: false,
                enable_wind: false,
                enable_sediment_transport: false,
                ..Default::default()
            },
            ErosionPreset::Minimal => Self {
                hydraulic: HydraulicParams {
                    iterations: 50,
                    erosion_strength: 0.1,
                    ..Default::default()
                },
                thermal: ThermalParams { iterations: 10, ..Default::default() },
                enable_wind: false,
                ..Default::default()
            },
            ErosionPreset::Normal => Self::default(),
            ErosionPreset::Dramatic => Self {
                hydraulic: HydraulicParams {
                    iterations: 2_000,
                    erosion_strength: 0.5,
                    sediment_capacity: 8.0,
                    max_droplet_lifetime: 60,
                    ..Default::default()
                },
                thermal: ThermalParams {
                    talus_angle: 35.0,
                    ..Default::default()
                },
                wind: WindParams {
                    wind_strength: 0.4,
                    ..Default::default()
                },
                ..Default::default()
            },
            ErosionPreset::Realistic => Self {
                hydraulic: HydraulicParams {
                    iterations: 20_000,
                    inertia: 0.1,
                    max_droplet_lifetime: 80,
                    evaporation_rate: 0.005,
                    ..Default::default()
                },
                thermal: ThermalParams {
                    iterations: 100,
                    talus_angle: 38.0,
                    erosion_rate: 0.3,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load parameters from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_table() {
        let h = HydraulicParams::default();
        assert_eq!(h.iterations, 100);
        assert_eq!(h.erosion_strength, 0.3);
        assert_eq!(h.deposition_strength, 0.3);
        assert_eq!(h.evaporation_rate, 0.01);
        assert_eq!(h.sediment_capacity, 4.0);
        assert_eq!(h.min_slope, 0.01);
        assert_eq!(h.gravity, 9.81);
        assert_eq!(h.max_droplet_lifetime, 30);
        assert_eq!(h.inertia, 0.05);

        let t = ThermalParams::default();
        assert_eq!((t.iterations, t.talus_angle, t.erosion_rate, t.min_height_difference), (50, 45.0, 0.5, 0.1));

        let w = WindParams::default();
        assert_eq!(w.iterations, 50);
        assert_eq!(w.wind_direction, [1.0, 0.0]);
        assert_eq!((w.wind_strength, w.abrasion_rate, w.deposition_rate), (0.2, 0.1, 0.05));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let params = ErosionParams::from_json_str(
            r#"{ "hydraulic": { "iterations": 7 }, "enable_wind": false }"#,
        )
        .unwrap();
        assert_eq!(params.hydraulic.iterations, 7);
        assert_eq!(params.hydraulic.inertia, 0.05);
        assert!(!params.enable_wind);
        assert_eq!(params.thermal, ThermalParams::default());
    }

    #[test]
    fn test_json_round_trip_preserves_preset() {
        let params = ErosionParams::from_preset(ErosionPreset::Dramatic);
        let json = params.to_json_pretty().unwrap();
        assert_eq!(ErosionParams::from_json_str(&json).unwrap(), params);
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            ErosionParams::from_json_str("{ not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_preset_parsing() {
        for preset in ErosionPreset::all() {
            assert_eq!(preset.to_string().parse::<ErosionPreset>().unwrap(), *preset);
        }
        assert_eq!("  Dramatic ".parse::<ErosionPreset>().unwrap(), ErosionPreset::Dramatic);
        assert!(matches!("extreme".parse::<ErosionPreset>(), Err(ConfigError::UnknownPreset(_))));
    }

    #[test]
    fn test_none_preset_disables_mutating_passes() {
        let params = ErosionParams::from_preset(ErosionPreset::None);
        assert!(!params.enable_hydraulic);
        assert!(!params.enable_thermal);
        assert!(!params.enable_wind);
        assert!(!params.enable_sediment_transport);
    }
}
