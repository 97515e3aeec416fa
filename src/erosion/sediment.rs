//! Flow-driven sediment transport.
//!
//! A single smoothing sweep over the stream network: cells carrying more flow
//! than the channel can handle lose bed material, which travels down the D8
//! flow path and settles a fraction at a time. Meant to run once after
//! hydraulic erosion to clean up droplet noise along channels.

use crate::erosion::rivers::{downstream, flow_directions};
use crate::erosion::ErosionStats;
use crate::error::GridError;
use crate::grid::check_grid;

/// Loads smaller than this settle in place instead of travelling further.
const MIN_LOAD: f32 = 1e-6;

/// Redistribute bed material along the flow network.
///
/// For every cell whose accumulation exceeds `transport_capacity`, a share
/// `(acc - capacity) / acc` of half the drop to its downstream neighbor is
/// picked up. The pickup grows with the surplus `acc - capacity` but the share
/// is bounded below 1, so a cell never loses more than half its drop and the
/// channel slope never inverts. The load then walks downstream, leaving
/// `deposition_rate` of what remains at each cell it enters; whatever reaches
/// a pit stays there.
///
/// All transfers are computed against the heights at the start of the sweep and
/// applied at the end, so the grid total is unchanged.
pub fn simulate_transport(
    heights: &mut [f32],
    resolution: usize,
    flow_accumulation: &[f32],
    transport_capacity: f32,
    deposition_rate: f32,
) -> Result<ErosionStats, GridError> {
    check_grid(heights.len(), resolution)?;
    if flow_accumulation.len() != heights.len() {
        return Err(GridError::FlowMapMismatch {
            len: flow_accumulation.len(),
            expected: heights.len(),
        });
    }

    let mut stats = ErosionStats { iterations: 1, ..Default::default() };
    let capacity = transport_capacity.max(0.0);
    let settle_rate = deposition_rate.clamp(0.0, 1.0);
    let flow_dir = flow_directions(heights, resolution);
    let mut delta = vec![0.0f32; heights.len()];

    for i in 0..heights.len() {
        let acc = flow_accumulation[i];
        if !acc.is_finite() || acc <= capacity {
            continue;
        }
        let Some(d) = downstream(i, &flow_dir, resolution) else {
            continue;
        };

        let drop = heights[i] - heights[d];
        let picked = (acc - capacity) / acc * 0.5 * drop;
        if picked <= 0.0 {
            continue;
        }
        delta[i] -= picked;
        stats.record_erosion(picked);

        let mut load = picked;
        let mut cell = d;
        loop {
            stats.steps_taken += 1;
            let next = downstream(cell, &flow_dir, resolution);
            let settled = match next {
                Some(_) if load >= MIN_LOAD => load * settle_rate,
                _ => load,
            };
            delta[cell] += settled;
            load -= settled;
            match next {
                Some(n) if load > 0.0 => cell = n,
                _ => break,
            }
        }
        stats.record_deposit(picked);
    }

    for (h, d) in heights.iter_mut().zip(&delta) {
        *h += *d;
    }

    log::debug!(
        "sediment transport: moved {:.3} along {} steps",
        stats.total_eroded,
        stats.steps_taken
    );

    Ok(stats)
}
