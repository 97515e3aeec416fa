//! Sub-cell access to the heightmap.
//!
//! Provides bilinear height sampling and deposition, gradient estimation and
//! slope angles. Coordinates are in grid space (`0..=resolution - 1`) unless
//! stated otherwise. Out-of-range coordinates clamp to the nearest edge sample;
//! this is the edge policy for every pass. `resolution` must be positive and
//! `heights` must hold `resolution²` samples; the passes check this up front.

/// Clamp a grid-space coordinate into `[0, resolution - 1]`. NaN maps to 0.
#[inline]
fn clamp_coord(v: f32, resolution: usize) -> f32 {
    v.max(0.0).min((resolution - 1) as f32)
}

/// The four cells surrounding `(x, y)` and their bilinear weights, in the order
/// (x0,y0), (x1,y0), (x0,y1), (x1,y1). Weights always sum to 1.
#[inline]
fn bilinear_cells(resolution: usize, x: f32, y: f32) -> [(usize, f32); 4] {
    let x = clamp_coord(x, resolution);
    let y = clamp_coord(y, resolution);

    let x0 = (x.floor() as usize).min(resolution - 1);
    let y0 = (y.floor() as usize).min(resolution - 1);
    let x1 = (x0 + 1).min(resolution - 1);
    let y1 = (y0 + 1).min(resolution - 1);

    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    [
        (y0 * resolution + x0, (1.0 - fx) * (1.0 - fy)),
        (y0 * resolution + x1, fx * (1.0 - fy)),
        (y1 * resolution + x0, (1.0 - fx) * fy),
        (y1 * resolution + x1, fx * fy),
    ]
}

/// Sample height at a floating-point position using bilinear interpolation.
pub fn height_at(heights: &[f32], resolution: usize, x: f32, y: f32) -> f32 {
    bilinear_cells(resolution, x, y)
        .iter()
        .map(|&(idx, w)| heights[idx] * w)
        .sum()
}

/// Spread a signed height change over the four cells around `(x, y)` with the
/// same weights [`height_at`] reads with, so the total added is exactly `delta`.
pub fn add_height_at(heights: &mut [f32], resolution: usize, x: f32, y: f32, delta: f32) {
    for (idx, w) in bilinear_cells(resolution, x, y) {
        heights[idx] += delta * w;
    }
}

/// Central-difference slope `(dh/dx, dh/dy)` in world units at `(x, y)`.
/// Points uphill. One-sided at the grid edge; zero when the span is empty.
pub fn gradient_at(heights: &[f32], resolution: usize, tile_size: f32, x: f32, y: f32) -> (f32, f32) {
    let max = (resolution - 1) as f32;
    let x = clamp_coord(x, resolution);
    let y = clamp_coord(y, resolution);

    let x_lo = (x - 1.0).max(0.0);
    let x_hi = (x + 1.0).min(max);
    let y_lo = (y - 1.0).max(0.0);
    let y_hi = (y + 1.0).min(max);

    let span_x = (x_hi - x_lo) * tile_size;
    let span_y = (y_hi - y_lo) * tile_size;

    let grad_x = if span_x > 0.0 {
        (height_at(heights, resolution, x_hi, y) - height_at(heights, resolution, x_lo, y)) / span_x
    } else {
        0.0
    };
    let grad_y = if span_y > 0.0 {
        (height_at(heights, resolution, x, y_hi) - height_at(heights, resolution, x, y_lo)) / span_y
    } else {
        0.0
    };

    (grad_x, grad_y)
}

/// Slope angle in degrees from `h1` down to `h2` over a horizontal `distance`.
pub fn slope_angle(h1: f32, h2: f32, distance: f32) -> f32 {
    (h1 - h2).atan2(distance).to_degrees()
}

/// Whether a normalized coordinate lies in `[0, 1)²`.
pub fn is_in_bounds(x: f32, y: f32) -> bool {
    (0.0..1.0).contains(&x) && (0.0..1.0).contains(&y)
}

/// Whether a grid-space coordinate lies on the sampled grid.
pub fn is_in_grid(x: f32, y: f32, resolution: usize) -> bool {
    let max = (resolution - 1) as f32;
    (0.0..=max).contains(&x) && (0.0..=max).contains(&y)
}
