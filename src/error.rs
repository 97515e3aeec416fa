//! Error types for grid validation and configuration loading.

use thiserror::Error;

/// Contract violations on the heightmap buffer or its companion arrays.
///
/// These are programmer errors: a pass that returns one of these has not
/// touched the buffer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("grid resolution must be positive")]
    ZeroResolution,
    #[error("height data has {len} samples, expected {expected} for resolution {resolution}")]
    SizeMismatch {
        len: usize,
        resolution: usize,
        expected: usize,
    },
    #[error("tile size must be finite and non-negative, got {0}")]
    InvalidTileSize(f32),
    #[error("flow map has {len} samples, expected {expected}")]
    FlowMapMismatch { len: usize, expected: usize },
}

/// Errors raised while loading erosion parameters.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown erosion preset '{0}' (expected none, minimal, normal, dramatic or realistic)")]
    UnknownPreset(String),
}
