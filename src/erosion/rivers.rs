//! Flow accumulation and drainage network extraction.
//!
//! This module implements river network analysis using:
//! 1. D8 flow direction - each cell drains to its single steepest-descent neighbor
//! 2. Flow accumulation - counts upstream drainage area for each cell
//! 3. Strahler ordering - stream hierarchy, rising where equal-order streams merge
//! 4. Stream tracing - follows drainage paths from each segment head downhill
//!
//! Nothing here mutates the heightmap; every analysis returns a fresh buffer.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::erosion::params::DrainageParams;
use crate::error::GridError;
use crate::grid::{check_grid, check_tile_size, coords, neighbor, neighbors_8, step_distance, NO_FLOW};

/// Rise added per cell when filling depressions for routing.
pub const FILL_EPSILON: f32 = 1e-3;

/// One traced stream segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrainagePattern {
    /// Grid cells `(x, y)` from the segment head downstream. The last point is
    /// the junction with a different-order stream, or a pit.
    pub points: Vec<(usize, usize)>,
    /// Flow accumulation at the head of the segment
    pub flow_strength: f32,
    /// Strahler stream order (1 = headwater)
    pub stream_order: u32,
    /// Path length in world units
    pub length: f32,
}

/// Summary statistics of an extracted drainage network
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSummary {
    /// Number of stream segments per order; index 0 is order 1
    pub streams_by_order: Vec<usize>,
    /// Mean segment length per order (world units)
    pub avg_length_by_order: Vec<f32>,
    /// Total length of all segments (world units)
    pub total_length: f32,
    /// Mean ratio N(k) / N(k+1) over consecutive orders; 0 with fewer than 2 orders
    pub bifurcation_ratio: f32,
}

/// Compute the D8 flow direction of each cell.
/// Cells without a strictly lower neighbor get [`NO_FLOW`].
pub fn compute_flow_direction(heights: &[f32], resolution: usize) -> Result<Vec<u8>, GridError> {
    check_grid(heights.len(), resolution)?;
    Ok(flow_directions(heights, resolution))
}

pub(crate) fn flow_directions(heights: &[f32], resolution: usize) -> Vec<u8> {
    (0..heights.len())
        .into_par_iter()
        .map(|i| {
            let current = heights[i];
            let mut steepest_dir = NO_FLOW;
            let mut steepest_drop = 0.0f32;

            for dir in 0..8 {
                let Some(n) = neighbor(i, dir, resolution) else {
                    continue;
                };
                let slope = (current - heights[n]) / step_distance(dir);
                if slope > steepest_drop {
                    steepest_drop = slope;
                    steepest_dir = dir as u8;
                }
            }

            steepest_dir
        })
        .collect()
}

/// Cell downstream of `index`, if it drains anywhere.
#[inline]
pub fn downstream(index: usize, flow_dir: &[u8], resolution: usize) -> Option<usize> {
    match flow_dir[index] {
        NO_FLOW => None,
        dir => neighbor(index, dir as usize, resolution),
    }
}

/// Cell indices sorted from highest to lowest elevation.
fn descending_order(heights: &[f32]) -> Vec<usize> {
    let mut cells: Vec<usize> = (0..heights.len()).collect();
    cells.sort_by(|&a, &b| heights[b].total_cmp(&heights[a]).then(a.cmp(&b)));
    cells
}

/// Compute flow accumulation for each cell: 1 for the cell itself plus the
/// accumulation of every cell that drains into it. Pits keep what reaches them.
pub fn compute_flow_accumulation(heights: &[f32], resolution: usize) -> Result<Vec<f32>, GridError> {
    check_grid(heights.len(), resolution)?;
    let flow_dir = flow_directions(heights, resolution);
    Ok(accumulate(heights, &flow_dir, resolution))
}

fn accumulate(heights: &[f32], flow_dir: &[u8], resolution: usize) -> Vec<f32> {
    let mut accumulation = vec![1.0f32; heights.len()];

    // Upstream cells are strictly higher, so they are final by the time we get here
    for i in descending_order(heights) {
        if let Some(d) = downstream(i, flow_dir, resolution) {
            accumulation[d] += accumulation[i];
        }
    }

    accumulation
}

#[derive(Clone, Copy, Debug)]
struct HeapItem {
    height: f32,
    idx: usize,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Min-heap by height via reversed ordering, ties by index for determinism.
impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .height
            .total_cmp(&self.height)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

/// Fill depressions with Priority-Flood (Barnes et al. 2014), draining to the
/// grid border. Every filled cell ends at least `epsilon` above the cell it
/// spills into, so D8 routing over the result reaches the edge from anywhere.
/// Returns a new buffer; the input is untouched.
pub fn fill_depressions(heights: &[f32], resolution: usize, epsilon: f32) -> Result<Vec<f32>, GridError> {
    check_grid(heights.len(), resolution)?;

    let mut filled = heights.to_vec();
    let mut closed = vec![false; heights.len()];
    let mut open = BinaryHeap::new();

    for (i, &h) in heights.iter().enumerate() {
        let (x, y) = coords(i, resolution);
        if x == 0 || y == 0 || x == resolution - 1 || y == resolution - 1 {
            closed[i] = true;
            open.push(HeapItem { height: h, idx: i });
        }
    }

    while let Some(HeapItem { height, idx }) = open.pop() {
        for n in neighbors_8(idx, resolution) {
            if closed[n] {
                continue;
            }
            closed[n] = true;
            filled[n] = filled[n].max(height + epsilon);
            open.push(HeapItem { height: filled[n], idx: n });
        }
    }

    Ok(filled)
}

/// Flow accumulation routed over the depression-filled surface, so interior
/// pits pass their water on instead of swallowing it.
pub fn compute_flow_accumulation_filled(heights: &[f32], resolution: usize) -> Result<Vec<f32>, GridError> {
    let filled = fill_depressions(heights, resolution, FILL_EPSILON)?;
    let flow_dir = flow_directions(&filled, resolution);
    Ok(accumulate(&filled, &flow_dir, resolution))
}

/// Trace the drainage network with the default channel threshold (the grid
/// resolution) and drop streams shorter than `min_stream_length` world units.
pub fn generate_drainage_patterns(
    heights: &[f32],
    resolution: usize,
    tile_size: f32,
    min_stream_length: f32,
) -> Result<Vec<DrainagePattern>, GridError> {
    let params = DrainageParams {
        min_stream_length,
        ..DrainageParams::default()
    };
    generate_drainage_patterns_with(heights, resolution, tile_size, &params)
}

/// Trace the drainage network as Strahler stream segments.
///
/// Channel cells are those with at least `source_accumulation` upstream cells.
/// Each segment starts at a head (a channel cell no same-order stream flows
/// into) and follows steepest descent until the order changes or it reaches a
/// pit. Segments are returned strongest flow first.
pub fn generate_drainage_patterns_with(
    heights: &[f32],
    resolution: usize,
    tile_size: f32,
    params: &DrainageParams,
) -> Result<Vec<DrainagePattern>, GridError> {
    check_grid(heights.len(), resolution)?;
    check_tile_size(tile_size)?;
    if tile_size == 0.0 {
        return Ok(Vec::new());
    }

    let threshold = params.source_accumulation.unwrap_or(resolution as f32);
    let flow_dir = flow_directions(heights, resolution);
    let accumulation = accumulate(heights, &flow_dir, resolution);
    let channel: Vec<bool> = accumulation.iter().map(|&a| a >= threshold).collect();
    let orders = compute_strahler_orders(heights, &flow_dir, &channel, resolution);

    // A cell continues a segment when a same-order stream flows into it
    let mut continues = vec![false; heights.len()];
    for i in 0..heights.len() {
        if !channel[i] {
            continue;
        }
        if let Some(d) = downstream(i, &flow_dir, resolution) {
            if orders[d] == orders[i] {
                continues[d] = true;
            }
        }
    }

    let mut patterns = Vec::new();
    for head in 0..heights.len() {
        if !channel[head] || continues[head] {
            continue;
        }

        let order = orders[head];
        let mut points = vec![coords(head, resolution)];
        let mut length = 0.0f32;
        let mut current = head;

        while let Some(next) = downstream(current, &flow_dir, resolution) {
            length += step_distance(flow_dir[current] as usize) * tile_size;
            points.push(coords(next, resolution));
            if orders[next] != order {
                break;
            }
            current = next;
        }

        if length < params.min_stream_length {
            continue;
        }
        patterns.push(DrainagePattern {
            points,
            flow_strength: accumulation[head],
            stream_order: order,
            length,
        });
    }

    patterns.sort_by(|a, b| {
        b.flow_strength
            .total_cmp(&a.flow_strength)
            .then(b.stream_order.cmp(&a.stream_order))
            .then(a.points[0].1.cmp(&b.points[0].1))
            .then(a.points[0].0.cmp(&b.points[0].0))
    });

    log::debug!(
        "drainage: {} streams (threshold {:.1}, max order {})",
        patterns.len(),
        threshold,
        patterns.iter().map(|p| p.stream_order).max().unwrap_or(0)
    );

    Ok(patterns)
}

/// Strahler order of every channel cell (0 off-channel).
///
/// Cells are visited highest first; each pushes its final order into its
/// downstream cell, which counts how many inflows share the largest order.
fn compute_strahler_orders(heights: &[f32], flow_dir: &[u8], channel: &[bool], resolution: usize) -> Vec<u32> {
    let mut orders = vec![0u32; heights.len()];
    // (largest inflow order, number of inflows with that order)
    let mut inflow = vec![(0u32, 0u32); heights.len()];

    for i in descending_order(heights) {
        if !channel[i] {
            continue;
        }

        let (max_order, count) = inflow[i];
        orders[i] = match count {
            0 => 1,
            1 => max_order,
            _ => max_order + 1,
        };

        if let Some(d) = downstream(i, flow_dir, resolution) {
            let entry = &mut inflow[d];
            match orders[i].cmp(&entry.0) {
                Ordering::Greater => *entry = (orders[i], 1),
                Ordering::Equal => entry.1 += 1,
                Ordering::Less => {}
            }
        }
    }

    orders
}

/// Stream counts, lengths and bifurcation ratio of a drainage network.
pub fn summarize_network(patterns: &[DrainagePattern]) -> NetworkSummary {
    let max_order = patterns.iter().map(|p| p.stream_order).max().unwrap_or(0) as usize;
    let mut streams_by_order = vec![0usize; max_order];
    let mut length_by_order = vec![0.0f32; max_order];

    for p in patterns {
        // Order 0 is off-channel; there is no stream to count
        let Some(k) = (p.stream_order as usize).checked_sub(1) else {
            continue;
        };
        streams_by_order[k] += 1;
        length_by_order[k] += p.length;
    }

    let avg_length_by_order = streams_by_order
        .iter()
        .zip(&length_by_order)
        .map(|(&n, &len)| if n > 0 { len / n as f32 } else { 0.0 })
        .collect();

    let ratios: Vec<f32> = streams_by_order
        .windows(2)
        .filter(|w| w[1] > 0)
        .map(|w| w[0] as f32 / w[1] as f32)
        .collect();
    let bifurcation_ratio = if ratios.is_empty() {
        0.0
    } else {
        ratios.iter().sum::<f32>() / ratios.len() as f32
    };

    NetworkSummary {
        streams_by_order,
        avg_length_by_order,
        total_length: length_by_order.iter().sum(),
        bifurcation_ratio,
    }
}
