//! Wind erosion: abrasion of windward faces and downwind deposition.
//!
//! Cells are visited upwind first, so the load a cell hands to its downwind
//! neighbor is always in place before that neighbor is processed. Load blown
//! past the downwind grid edge is lost.

use crate::erosion::params::WindParams;
use crate::erosion::ErosionStats;
use crate::error::GridError;
use crate::grid::{check_grid, check_tile_size, coords};

/// Snap a heading to the nearest of the 8 grid steps.
fn snap_direction(dir_x: f32, dir_y: f32) -> (i64, i64) {
    (dir_x.round() as i64, dir_y.round() as i64)
}

fn offset(index: usize, resolution: usize, dx: i64, dy: i64) -> Option<usize> {
    let (x, y) = coords(index, resolution);
    let nx = x as i64 + dx;
    let ny = y as i64 + dy;
    let res = resolution as i64;
    if nx < 0 || ny < 0 || nx >= res || ny >= res {
        return None;
    }
    Some(ny as usize * resolution + nx as usize)
}

/// Cell indices ordered from the upwind edge to the downwind edge.
fn sweep_order(resolution: usize, dir_x: f32, dir_y: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..resolution * resolution).collect();
    order.sort_by(|&a, &b| {
        let (ax, ay) = coords(a, resolution);
        let (bx, by) = coords(b, resolution);
        let pa = ax as f32 * dir_x + ay as f32 * dir_y;
        let pb = bx as f32 * dir_x + by as f32 * dir_y;
        pa.total_cmp(&pb).then(a.cmp(&b))
    });
    order
}

/// Run `params.iterations` wind passes over the grid.
///
/// Per pass, for each cell in upwind order:
/// 1. A cell rising above its upwind neighbor faces the wind and loses
///    `wind_strength * abrasion_rate` of that rise to the wind's load
/// 2. The load arriving from upwind, plus what was just abraded, moves on to
///    the downwind neighbor
/// 3. There, `deposition_rate` of the load settles (more in the lee of a
///    drop, where the wind loses its grip) and the rest keeps travelling
pub fn simulate(
    heights: &mut [f32],
    resolution: usize,
    tile_size: f32,
    params: &WindParams,
) -> Result<ErosionStats, GridError> {
    check_grid(heights.len(), resolution)?;
    check_tile_size(tile_size)?;

    let mut stats = ErosionStats::default();
    let [wx, wy] = params.wind_direction;
    let len = (wx * wx + wy * wy).sqrt();
    if tile_size == 0.0
        || params.iterations == 0
        || params.wind_strength <= 0.0
        || !len.is_finite()
        || len == 0.0
    {
        return Ok(stats);
    }
    stats.iterations = params.iterations;

    let (dir_x, dir_y) = (wx / len, wy / len);
    let (dx, dy) = snap_direction(dir_x, dir_y);
    let order = sweep_order(resolution, dir_x, dir_y);
    let abrasion = (params.wind_strength * params.abrasion_rate).clamp(0.0, 1.0);
    let deposition = params.deposition_rate.clamp(0.0, 1.0);

    let mut load = vec![0.0f32; heights.len()];

    for _ in 0..params.iterations {
        load.fill(0.0);

        for &i in &order {
            let h = heights[i];

            // Windward faces lose part of their rise over the upwind cell
            let mut removed = 0.0;
            if let Some(up) = offset(i, resolution, -dx, -dy) {
                let exposure = h - heights[up];
                if exposure > 0.0 {
                    removed = abrasion * exposure;
                    heights[i] -= removed;
                    stats.record_erosion(removed);
                }
            }

            let carried = load[i] + removed;
            if carried <= 0.0 {
                continue;
            }

            match offset(i, resolution, dx, dy) {
                Some(down) => {
                    // Steeper lee drops shelter more of the load
                    let lee_slope = ((heights[i] - heights[down]) / tile_size).max(0.0);
                    let settle = (deposition * (1.0 + lee_slope)).min(1.0);
                    let deposit = carried * settle;
                    heights[down] += deposit;
                    stats.record_deposit(deposit);
                    load[down] += carried - deposit;
                }
                None => stats.lost += carried as f64,
            }
        }
        stats.steps_taken += 1;
    }

    log::debug!(
        "wind: {} passes, abraded {:.3}, deposited {:.3}, blown off {:.3}",
        stats.iterations,
        stats.total_eroded,
        stats.total_deposited,
        stats.lost
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ridge(resolution: usize, column: usize, height: f32) -> Vec<f32> {
        (0..resolution * resolution)
            .map(|i| if i % resolution == column { height } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_sweep_order_is_upwind_first() {
        let order = sweep_order(4, 1.0, 0.0);
        let first_cols: Vec<usize> = order[..4].iter().map(|&i| i % 4).collect();
        assert!(first_cols.iter().all(|&x| x == 0));

        let order = sweep_order(4, -1.0, 0.0);
        assert!(order[..4].iter().all(|&i| i % 4 == 3));

        let order = sweep_order(4, 0.0, 1.0);
        assert!(order[..4].iter().all(|&i| i / 4 == 0));
    }

    #[test]
    fn test_snap_direction() {
        assert_eq!(snap_direction(1.0, 0.0), (1, 0));
        let d = std::f32::consts::FRAC_1_SQRT_2;
        assert_eq!(snap_direction(d, d), (1, 1));
        assert_eq!(snap_direction(-0.92, 0.38), (-1, 0));
    }

    #[test]
    fn test_windward_ridge_moves_downwind() {
        let res = 10;
        let mut heights = ridge(res, 4, 5.0);
        let params = WindParams { iterations: 1, ..WindParams::default() };
        let stats = simulate(&mut heights, res, 1.0, &params).unwrap();

        assert!(stats.total_eroded > 0.0);
        for y in 0..res {
            let row = &heights[y * res..(y + 1) * res];
            assert!(row[4] < 5.0, "ridge should be abraded");
            assert!(row[5] > 0.0, "downwind cell should receive deposit");
            assert_eq!(row[3], 0.0, "upwind cell is untouched");
        }
    }

    #[test]
    fn test_reverse_wind_deposits_on_other_side() {
        let res = 10;
        let mut heights = ridge(res, 4, 5.0);
        let params = WindParams {
            iterations: 1,
            wind_direction: [-1.0, 0.0],
            ..WindParams::default()
        };
        simulate(&mut heights, res, 1.0, &params).unwrap();
        assert!(heights[3] > 0.0);
        assert_eq!(heights[5], 0.0);
    }

    #[test]
    fn test_mass_balance_accounts_for_edge_loss() {
        let res = 12;
        let mut heights: Vec<f32> = (0..res * res)
            .map(|i| ((i * 7919) % 13) as f32)
            .collect();
        let before: f64 = heights.iter().map(|&h| h as f64).sum();
        let stats = simulate(&mut heights, res, 1.0, &WindParams::default()).unwrap();
        let after: f64 = heights.iter().map(|&h| h as f64).sum();
        assert!(
            (after - before + stats.lost).abs() < 1e-2,
            "change {} lost {}",
            after - before,
            stats.lost
        );
    }

    #[test]
    fn test_calm_wind_is_noop() {
        let res = 8;
        let mut heights = ridge(res, 3, 4.0);
        let before = heights.clone();
        let calm = WindParams { wind_direction: [0.0, 0.0], ..WindParams::default() };
        simulate(&mut heights, res, 1.0, &calm).unwrap();
        let still = WindParams { wind_strength: 0.0, ..WindParams::default() };
        simulate(&mut heights, res, 1.0, &still).unwrap();
        assert_eq!(heights, before);
    }

    #[test]
    fn test_flat_grid_is_unchanged() {
        let mut heights = vec![3.0f32; 64];
        simulate(&mut heights, 8, 1.0, &WindParams::default()).unwrap();
        assert!(heights.iter().all(|&h| h == 3.0));
    }
}
