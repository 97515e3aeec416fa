//! Procedural test terrain.
//!
//! Layered terrain synthesis on a square grid:
//! 1. Multi-octave fBm for base terrain variation
//! 2. Domain warping for natural-looking features
//! 3. Ridged noise for sharp mountain crests
//!
//! Used by the binaries and tests to get a realistic surface to erode.

use noise::{NoiseFn, Perlin, Seedable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for terrain generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Base frequency over the whole grid (features per map width)
    pub base_frequency: f64,
    /// Number of noise octaves
    pub octaves: u32,
    /// Amplitude decay per octave (0.0-1.0)
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Domain warping strength
    pub warp_strength: f64,
    /// Ridge noise power (higher = sharper ridges)
    pub ridge_power: f64,
    /// Share of the ridge layer in the final blend (0.0-1.0)
    pub ridge_weight: f64,
    /// Elevation of the highest possible point
    pub height_scale: f32,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self {
            base_frequency: 3.0,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
            warp_strength: 0.15,
            ridge_power: 2.0,
            ridge_weight: 0.4,
            height_scale: 100.0,
        }
    }
}

/// Generate a `resolution × resolution` row-major heightmap in
/// `[0, height_scale]`. The same seed always gives the same terrain.
pub fn generate_terrain(resolution: usize, seed: u64, params: &TerrainParams) -> Vec<f32> {
    let terrain_noise = Perlin::new(1).set_seed(seed as u32);
    let warp_noise = Perlin::new(1).set_seed((seed as u32).wrapping_add(1111));
    let ridge_noise = Perlin::new(1).set_seed((seed as u32).wrapping_add(2222));
    let ridge_weight = params.ridge_weight.clamp(0.0, 1.0);

    // Cells are independent; collecting in order keeps the output deterministic
    (0..resolution * resolution)
        .into_par_iter()
        .map(|i| {
            let nx = (i % resolution) as f64 / resolution as f64;
            let ny = (i / resolution) as f64 / resolution as f64;
            let (wx, wy) = apply_domain_warp(nx, ny, &warp_noise, params.warp_strength);

            let fx = wx * params.base_frequency;
            let fy = wy * params.base_frequency;
            let base = fbm(&terrain_noise, fx, fy, params.octaves, params.persistence, params.lacunarity);
            let ridges = ridged(&ridge_noise, fx, fy, params.ridge_power);

            // fBm is in [-1, 1], ridges in [0, 1]
            let blended = (base * 0.5 + 0.5) * (1.0 - ridge_weight) + ridges * ridge_weight;
            blended.clamp(0.0, 1.0) as f32 * params.height_scale
        })
        .collect()
}

/// Fractal Brownian Motion, normalized to about [-1, 1]
fn fbm(
    noise: &Perlin,
    x: f64,
    y: f64,
    octaves: u32,
    persistence: f64,
    lacunarity: f64,
) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    if max_value > 0.0 {
        total / max_value
    } else {
        0.0
    }
}

/// Ridged noise in [0, 1]: sharp crests where the noise crosses zero
fn ridged(noise: &Perlin, x: f64, y: f64, power: f64) -> f64 {
    let n = 1.0 - noise.get([x * 2.0, y * 2.0]).abs();
    n.clamp(0.0, 1.0).powf(power)
}

/// Domain warping - distort coordinates for organic shapes
fn apply_domain_warp(x: f64, y: f64, noise: &Perlin, strength: f64) -> (f64, f64) {
    let warp_scale = 4.0;

    let warp_x1 = noise.get([x * warp_scale, y * warp_scale]);
    let warp_y1 = noise.get([x * warp_scale + 5.2, y * warp_scale + 1.3]);

    // Warp the warp for a more organic feel
    let x2 = x + warp_x1 * strength;
    let y2 = y + warp_y1 * strength;

    let warp_x2 = noise.get([x2 * warp_scale * 2.0, y2 * warp_scale * 2.0]);
    let warp_y2 = noise.get([x2 * warp_scale * 2.0 + 3.7, y2 * warp_scale * 2.0 + 8.1]);

    (
        x + (warp_x1 + warp_x2 * 0.5) * strength,
        y + (warp_y1 + warp_y2 * 0.5) * strength,
    )
}
