//! Square row-major heightmap grid helpers.
//!
//! The host owns the elevation buffer; everything here works on a borrowed
//! `&[f32]` plus its resolution (cells per side). Unlike a planetary map the
//! grid never wraps: neighbors that would fall outside are simply omitted.

use crate::error::GridError;

/// Direction encoding for D8 flow routing, clockwise from north.
/// 7 0 1
/// 6 X 2
/// 5 4 3
pub const DX: [i32; 8] = [0, 1, 1, 1, 0, -1, -1, -1];
pub const DY: [i32; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];

/// Special value indicating no flow direction (pit or flat).
pub const NO_FLOW: u8 = 255;

/// Check that a buffer of `len` samples is a `resolution × resolution` grid.
pub fn check_grid(len: usize, resolution: usize) -> Result<(), GridError> {
    if resolution == 0 {
        return Err(GridError::ZeroResolution);
    }
    let expected = resolution.checked_mul(resolution);
    match expected {
        Some(expected) if expected == len => Ok(()),
        _ => Err(GridError::SizeMismatch {
            len,
            resolution,
            expected: expected.unwrap_or(usize::MAX),
        }),
    }
}

/// Negative or non-finite tile sizes are contract violations; zero is a
/// valid "disable" value handled by each pass.
pub fn check_tile_size(tile_size: f32) -> Result<(), GridError> {
    if tile_size.is_finite() && tile_size >= 0.0 {
        Ok(())
    } else {
        Err(GridError::InvalidTileSize(tile_size))
    }
}

#[inline]
pub fn index(x: usize, y: usize, resolution: usize) -> usize {
    y * resolution + x
}

#[inline]
pub fn coords(index: usize, resolution: usize) -> (usize, usize) {
    (index % resolution, index / resolution)
}

/// Neighbor of `index` in D8 direction `dir`, or `None` past the grid edge.
#[inline]
pub fn neighbor(index: usize, dir: usize, resolution: usize) -> Option<usize> {
    let (x, y) = coords(index, resolution);
    let nx = x as i64 + DX[dir] as i64;
    let ny = y as i64 + DY[dir] as i64;
    let res = resolution as i64;
    if nx < 0 || ny < 0 || nx >= res || ny >= res {
        return None;
    }
    Some(ny as usize * resolution + nx as usize)
}

/// Distance in cells for a step in D8 direction `dir`.
#[inline]
pub fn step_distance(dir: usize) -> f32 {
    if dir % 2 == 0 {
        1.0
    } else {
        std::f32::consts::SQRT_2
    }
}

/// The up-to-8 orthogonal and diagonal neighbors of a cell, omitting any
/// outside the grid.
pub fn neighbors_8(index: usize, resolution: usize) -> impl Iterator<Item = usize> {
    (0..8).filter_map(move |dir| neighbor(index, dir, resolution))
}

/// Like [`neighbors_8`], but also yields the D8 direction of each neighbor.
pub fn neighbors_8_dir(index: usize, resolution: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..8).filter_map(move |dir| neighbor(index, dir, resolution).map(|n| (dir, n)))
}
