//! Thermal erosion: gravity-driven collapse of slopes steeper than the talus angle.
//!
//! Each sweep reads the heights as they were at the start of the sweep and
//! accumulates transfers into a delta buffer, so the visiting order never
//! changes the result. Material only moves between cells, never leaves the grid.

use crate::erosion::params::ThermalParams;
use crate::erosion::utils::slope_angle;
use crate::erosion::ErosionStats;
use crate::error::GridError;
use crate::grid::{check_grid, check_tile_size, neighbors_8_dir, step_distance};

/// Run `params.iterations` relaxation sweeps over the grid.
pub fn simulate(
    heights: &mut [f32],
    resolution: usize,
    tile_size: f32,
    params: &ThermalParams,
) -> Result<ErosionStats, GridError> {
    check_grid(heights.len(), resolution)?;
    check_tile_size(tile_size)?;

    let mut stats = ErosionStats::default();
    if tile_size == 0.0 || params.iterations == 0 {
        return Ok(stats);
    }
    stats.iterations = params.iterations;

    let talus_tan = params.talus_angle.to_radians().tan();
    let rate = params.erosion_rate.clamp(0.0, 1.0);
    let cells = heights.len();
    let mut delta = vec![0.0f32; cells];

    for _ in 0..params.iterations {
        delta.fill(0.0);
        let mut moved_this_sweep = 0.0f64;

        for i in 0..cells {
            let h = heights[i];

            // Collect lower neighbors whose slope exceeds the talus angle.
            let mut candidates = [(0usize, 0.0f32); 8];
            let mut count = 0usize;
            let mut total_excess = 0.0f32;
            let mut max_excess = 0.0f32;
            for (dir, n) in neighbors_8_dir(i, resolution) {
                let diff = h - heights[n];
                if diff <= params.min_height_difference {
                    continue;
                }
                let distance = step_distance(dir) * tile_size;
                if slope_angle(h, heights[n], distance) <= params.talus_angle {
                    continue;
                }
                // Height above the steepest stable difference
                let excess = diff - talus_tan * distance;
                if excess <= 0.0 {
                    continue;
                }
                candidates[count] = (n, excess);
                count += 1;
                total_excess += excess;
                max_excess = max_excess.max(excess);
            }
            if count == 0 {
                continue;
            }

            // Half the largest excess would level the steepest pair.
            let amount = rate * max_excess * 0.5;
            if amount <= 0.0 {
                continue;
            }

            delta[i] -= amount;
            for &(n, excess) in &candidates[..count] {
                delta[n] += amount * (excess / total_excess);
            }
            moved_this_sweep += amount as f64;
            stats.max_erosion = stats.max_erosion.max(amount);
        }

        for (h, d) in heights.iter_mut().zip(&delta) {
            *h += *d;
        }
        stats.steps_taken += 1;
        stats.total_eroded += moved_this_sweep;
        stats.total_deposited += moved_this_sweep;

        if moved_this_sweep == 0.0 {
            // Stable: later sweeps would not change anything.
            break;
        }
    }

    log::debug!(
        "thermal: {} sweeps, moved {:.3}",
        stats.steps_taken,
        stats.total_eroded
    );

    Ok(stats)
}
