//! Grid smoothing filters
//!
//! Box and Gaussian filters run as separable convolutions: a horizontal 1D
//! pass followed by a vertical one, each reading one buffer and writing the
//! other. The median filter is non-separable and gathers the full square
//! window per cell. All filters clamp neighbour indices to the grid edge and
//! share one invocation shape so callers can switch methods freely.
//!
//! Rows are processed in parallel with rayon. Every output cell depends only
//! on the read buffer, so results do not depend on scheduling.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use log::trace;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Smallest sigma the Gaussian kernel is built with
const MIN_SIGMA: f64 = 1e-6;

/// Smoothing filter selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmoothingMethod {
    /// Identity
    None,

    /// Separable mean filter
    Box,

    /// Separable Gaussian filter
    #[default]
    Gaussian,

    /// Windowed median filter
    Median,
}

/// Bundled arguments for [`smooth`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParams {
    pub method: SmoothingMethod,
    pub radius: i32,
    pub iterations: i32,
    /// Gaussian only; `<= 0` selects `(radius + 1) / 2`
    pub sigma: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            method: SmoothingMethod::Gaussian,
            radius: 1,
            iterations: 1,
            sigma: 0.0,
        }
    }
}

impl SmoothingParams {
    pub fn apply(&self, grid: &Grid) -> Grid {
        smooth(grid, self.method, self.radius, self.iterations, self.sigma)
    }
}

/// Smooth `grid`, returning a new grid of the same shape.
///
/// `SmoothingMethod::None`, a non-positive `radius` or a non-positive
/// `iterations` count returns an unmodified copy. `sigma` is read by the
/// Gaussian filter only.
pub fn smooth(
    grid: &Grid,
    method: SmoothingMethod,
    radius: i32,
    iterations: i32,
    sigma: f64,
) -> Grid {
    if grid.is_empty() || radius <= 0 || iterations <= 0 {
        return grid.clone();
    }
    let radius = radius as usize;
    let iterations = iterations as usize;

    trace!(
        "Smoothing {}x{} grid: {:?} radius={} iterations={}",
        grid.width(),
        grid.height(),
        method,
        radius,
        iterations
    );

    match method {
        SmoothingMethod::None => grid.clone(),
        SmoothingMethod::Box => separable(grid, &box_kernel(radius), iterations),
        SmoothingMethod::Gaussian => {
            let kernel = gaussian_kernel(radius, sigma);
            separable(grid, &kernel, iterations)
        }
        SmoothingMethod::Median => median(grid, radius, iterations),
    }
}

/// Flat kernel of length `2 * radius + 1`
pub fn box_kernel(radius: usize) -> Vec<f64> {
    let size = 2 * radius + 1;
    vec![1.0 / size as f64; size]
}

/// Sigma actually used by the Gaussian filter for the given arguments.
///
/// Both caller-supplied and derived sigmas are floored at `MIN_SIGMA`, so
/// `2σ²` never underflows to zero.
#[inline]
pub fn effective_sigma(radius: usize, sigma: f64) -> f64 {
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        (radius as f64 + 1.0) / 2.0
    };
    MIN_SIGMA.max(sigma)
}

/// Normalised Gaussian kernel of length `2 * radius + 1`
pub fn gaussian_kernel(radius: usize, sigma: f64) -> Vec<f64> {
    let sigma = effective_sigma(radius, sigma);
    let denom = 2.0 * sigma * sigma;
    let r = radius as i64;

    let mut kernel: Vec<f64> = (-r..=r)
        .map(|i| (-((i * i) as f64) / denom).exp())
        .collect();

    let sum: f64 = kernel.iter().sum();
    if sum > 0.0 {
        kernel.iter_mut().for_each(|w| *w /= sum);
    }
    kernel
}

/// Repeated horizontal + vertical convolution with double buffering
fn separable(grid: &Grid, kernel: &[f64], iterations: usize) -> Grid {
    let (width, height) = grid.dimensions();
    let radius = kernel.len() / 2;

    let mut front = grid.as_slice().to_vec();
    let mut back = vec![0.0f64; front.len()];

    for _ in 0..iterations {
        horizontal_pass(&front, &mut back, width, kernel, radius);
        std::mem::swap(&mut front, &mut back);
        vertical_pass(&front, &mut back, width, height, kernel, radius);
        std::mem::swap(&mut front, &mut back);
    }

    grid.with_data(front)
}

fn horizontal_pass(src: &[f64], dst: &mut [f64], width: usize, kernel: &[f64], radius: usize) {
    let last = width - 1;
    dst.par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(out_row, in_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sx = (x + k).saturating_sub(radius).min(last);
                    acc += weight * in_row[sx];
                }
                *out = acc;
            }
        });
}

fn vertical_pass(
    src: &[f64],
    dst: &mut [f64],
    width: usize,
    height: usize,
    kernel: &[f64],
    radius: usize,
) {
    let last = height - 1;
    dst.par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, out_row)| {
            for (x, out) in out_row.iter_mut().enumerate() {
                let mut acc = 0.0;
                for (k, weight) in kernel.iter().enumerate() {
                    let sy = (y + k).saturating_sub(radius).min(last);
                    acc += weight * src[sy * width + x];
                }
                *out = acc;
            }
        });
}

/// Edge-clamped square-window median, repeated `iterations` times
fn median(grid: &Grid, radius: usize, iterations: usize) -> Grid {
    let (width, height) = grid.dimensions();
    let window_len = (2 * radius + 1) * (2 * radius + 1);

    let mut front = grid.as_slice().to_vec();
    let mut back = vec![0.0f64; front.len()];

    for _ in 0..iterations {
        let src = &front;
        back.par_chunks_mut(width)
            .enumerate()
            .for_each_init(
                || Vec::with_capacity(window_len),
                |window, (y, out_row)| {
                    for (x, out) in out_row.iter_mut().enumerate() {
                        window.clear();
                        for dy in 0..=2 * radius {
                            let sy = (y + dy).saturating_sub(radius).min(height - 1);
                            let row = &src[sy * width..(sy + 1) * width];
                            for dx in 0..=2 * radius {
                                let sx = (x + dx).saturating_sub(radius).min(width - 1);
                                window.push(row[sx]);
                            }
                        }
                        *out = middle_value(window);
                    }
                },
            );
        std::mem::swap(&mut front, &mut back);
    }

    grid.with_data(front)
}

/// Median of `window`; averages the two central values for even lengths
fn middle_value(window: &mut [f64]) -> f64 {
    window.sort_by(|a, b| a.total_cmp(b));
    let mid = window.len() / 2;
    if window.len() % 2 == 1 {
        window[mid]
    } else {
        (window[mid - 1] + window[mid]) / 2.0
    }
}
