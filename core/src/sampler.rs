//! Continuous grid sampling
//!
//! Evaluates a [`Grid`] at fractional `(x, y)` coordinates, where `x` runs
//! along columns and `y` along rows. Coordinates are clamped to the grid
//! before any interpolation, so the boundary policy is clamp-to-edge. Every
//! function here is allocation-free; a mesh builder calls them once per
//! vertex.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Interpolation modes for height reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterpolationMode {
    /// Value of the closest cell
    Nearest,

    /// Four-corner linear blend
    #[default]
    Bilinear,

    /// 4x4 Catmull-Rom reconstruction, bilinear within one cell of an edge
    Bicubic,
}

/// Mesh vertex address in grid space.
///
/// Carries the integer cell the vertex was generated from alongside its
/// continuous position. Sampling reads the continuous position only; the
/// cell address is bookkeeping for mesh builders.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GridVertex {
    pub x_index: usize,
    pub y_index: usize,
    pub grid_x: f64,
    pub grid_y: f64,
}

impl GridVertex {
    /// Vertex sitting exactly on cell `(x_index, y_index)`
    pub fn at_cell(x_index: usize, y_index: usize) -> Self {
        Self {
            x_index,
            y_index,
            grid_x: x_index as f64,
            grid_y: y_index as f64,
        }
    }

    /// Vertex at a continuous position; the cell address is its floor
    pub fn at_position(grid_x: f64, grid_y: f64) -> Self {
        Self {
            x_index: floor_index(grid_x),
            y_index: floor_index(grid_y),
            grid_x,
            grid_y,
        }
    }
}

/// Sample `grid` at `(x, y)` under `mode`. Empty grids yield `0.0`.
pub fn sample(grid: &Grid, x: f64, y: f64, mode: InterpolationMode) -> f64 {
    if grid.is_empty() {
        return 0.0;
    }

    let x = clamp_coordinate(x, grid.width());
    let y = clamp_coordinate(y, grid.height());

    match mode {
        InterpolationMode::Nearest => sample_nearest(grid, x, y),
        InterpolationMode::Bilinear => sample_bilinear(grid, x, y),
        InterpolationMode::Bicubic => sample_bicubic(grid, x, y),
    }
}

/// Sample `grid` at a mesh vertex's continuous position
#[inline]
pub fn sample_vertex(grid: &Grid, vertex: &GridVertex, mode: InterpolationMode) -> f64 {
    sample(grid, vertex.grid_x, vertex.grid_y, mode)
}

/// Cubic Catmull-Rom spline through `p1..p2` with outer controls `p0`, `p3`
#[inline]
pub fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * (2.0 * p1
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Clamp a continuous coordinate into `[0, extent - 1]`; NaN maps to `0.0`
#[inline]
fn clamp_coordinate(value: f64, extent: usize) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, (extent - 1) as f64)
}

#[inline]
fn floor_index(value: f64) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.floor() as usize
    }
}

#[inline]
fn sample_nearest(grid: &Grid, x: f64, y: f64) -> f64 {
    // Clamped coordinates are non-negative, so `round` breaks ties upward
    let col = (x.round() as usize).min(grid.width() - 1);
    let row = (y.round() as usize).min(grid.height() - 1);
    grid.get(row, col)
}

#[inline]
fn sample_bilinear(grid: &Grid, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(grid.width() - 1);
    let y1 = (y0 + 1).min(grid.height() - 1);

    // Collapsed corners (on or past the last index) blend nothing
    let tx = if x1 == x0 { 0.0 } else { x - x0 as f64 };
    let ty = if y1 == y0 { 0.0 } else { y - y0 as f64 };

    let v00 = grid.get(y0, x0);
    let v10 = grid.get(y0, x1);
    let v01 = grid.get(y1, x0);
    let v11 = grid.get(y1, x1);

    let top = v00 * (1.0 - tx) + v10 * tx;
    let bottom = v01 * (1.0 - tx) + v11 * tx;
    top * (1.0 - ty) + bottom * ty
}

#[inline]
fn sample_bicubic(grid: &Grid, x: f64, y: f64) -> f64 {
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;

    // The 4x4 stencil needs one cell before and two after on both axes
    if x0 < 1 || y0 < 1 || x0 + 2 >= grid.width() || y0 + 2 >= grid.height() {
        return sample_bilinear(grid, x, y);
    }

    let tx = x - x0 as f64;
    let ty = y - y0 as f64;

    let mut column = [0.0f64; 4];
    for (j, slot) in column.iter_mut().enumerate() {
        let row = grid.row(y0 + j - 1);
        *slot = catmull_rom(row[x0 - 1], row[x0], row[x0 + 1], row[x0 + 2], tx);
    }

    catmull_rom(column[0], column[1], column[2], column[3], ty)
}
