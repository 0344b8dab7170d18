//! Tone-mapping operators
//!
//! Remaps a grid's value distribution for consistent downstream
//! interpretation. Every operator except `Clamp01` needs global statistics,
//! gathered in one [`GridStats`] pass before the per-cell pass. Degenerate
//! statistics (empty grid, zero range, zero variance) resolve to a flat
//! zero surface instead of dividing by zero. The bounded operators send NaN
//! cells to `0.0`; `None` and `ZScore` pass them through.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::stats::GridStats;

/// Gamma used when the caller's parameter is not positive
pub const DEFAULT_GAMMA: f64 = 2.2;

/// Tone-mapping operator selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ToneMapOperator {
    /// Identity
    #[serde(rename = "NONE")]
    None,

    /// Clamp each sample into `[0, 1]`
    #[serde(rename = "CLAMP_01")]
    Clamp01,

    /// Min-max normalisation into `[0, 1]`
    #[default]
    #[serde(rename = "NORMALIZE_01")]
    Normalize01,

    /// `log1p` compression normalised by the shifted maximum
    #[serde(rename = "LOG1P")]
    Log1p,

    /// Min-max normalisation followed by `v^(1/gamma)`
    #[serde(rename = "GAMMA")]
    Gamma,

    /// Standard score `(v - mean) / std`
    #[serde(rename = "ZSCORE")]
    ZScore,
}

impl ToneMapOperator {
    /// Whether the operator needs a statistics pass
    pub fn needs_stats(self) -> bool {
        !matches!(self, Self::None | Self::Clamp01)
    }

    /// Whether every output sample is guaranteed to lie in `[0, 1]`
    pub fn is_bounded(self) -> bool {
        !matches!(self, Self::None | Self::ZScore)
    }
}

/// Tone-map `grid`, returning a new grid of the same shape
pub fn tone_map(grid: &Grid, operator: ToneMapOperator, param: f64) -> Grid {
    if grid.is_empty() || !operator.needs_stats() {
        return tone_map_with_stats(grid, operator, param, &GridStats::default());
    }
    let stats = GridStats::compute(grid);
    tone_map_with_stats(grid, operator, param, &stats)
}

/// Tone-map `grid` against precomputed statistics.
///
/// `stats` must describe `grid`; it is ignored by `None` and `Clamp01`.
pub fn tone_map_with_stats(
    grid: &Grid,
    operator: ToneMapOperator,
    param: f64,
    stats: &GridStats,
) -> Grid {
    match operator {
        ToneMapOperator::None => grid.clone(),
        ToneMapOperator::Clamp01 => per_cell(grid, unit),
        ToneMapOperator::Normalize01 => {
            if stats.is_degenerate() {
                return zeros_like(grid);
            }
            let (min, range) = (stats.min, stats.range());
            per_cell(grid, |v| unit((v - min) / range))
        }
        ToneMapOperator::Log1p => {
            if stats.is_degenerate() {
                return zeros_like(grid);
            }
            let shift = (-stats.min).max(0.0);
            let denom = (stats.max + shift).ln_1p();
            if denom.is_nan() || denom <= 0.0 {
                return zeros_like(grid);
            }
            per_cell(grid, |v| unit((v + shift).ln_1p() / denom))
        }
        ToneMapOperator::Gamma => {
            if stats.is_degenerate() {
                return zeros_like(grid);
            }
            let gamma = if param > 0.0 { param } else { DEFAULT_GAMMA };
            let exponent = 1.0 / gamma;
            let (min, range) = (stats.min, stats.range());
            per_cell(grid, |v| unit((v - min) / range).powf(exponent))
        }
        ToneMapOperator::ZScore => {
            let mean = stats.mean;
            let std = stats.std_dev_or_unit();
            per_cell(grid, |v| (v - mean) / std)
        }
    }
}

fn per_cell<F>(grid: &Grid, f: F) -> Grid
where
    F: Fn(f64) -> f64 + Sync,
{
    let data: Vec<f64> = grid.as_slice().par_iter().map(|&v| f(v)).collect();
    grid.with_data(data)
}

/// Clamp into `[0, 1]`, mapping NaN to `0.0`
#[inline]
fn unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn zeros_like(grid: &Grid) -> Grid {
    grid.map(|_| 0.0)
}
