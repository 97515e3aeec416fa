//! Terrain erosion and hydrology library
//!
//! Erosion passes and drainage analysis over a square row-major heightmap
//! owned by the caller. Re-exports modules for use by binaries and tools.

pub mod erosion;
pub mod error;
pub mod grid;
pub mod terrain;

pub use erosion::{simulate_erosion, ErosionParams, ErosionPass, ErosionPreset, ErosionReport, ErosionStats};
pub use error::{ConfigError, GridError};
