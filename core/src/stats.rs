//! Global grid statistics
//!
//! One traversal collects everything the tone-mapping operators need: range
//! bounds and a Welford running mean/variance. Computing the statistics once
//! and handing them to [`crate::tone_mapping::tone_map_with_stats`] lets a
//! caller try several operators on the same grid without repeating the pass.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// Summary statistics over the finite samples of a grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Number of finite samples folded in
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Population variance (`M2 / n`)
    pub variance: f64,
}

impl Default for GridStats {
    fn default() -> Self {
        Self {
            count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            variance: 0.0,
        }
    }
}

impl GridStats {
    /// Single pass over `grid`; non-finite samples are skipped
    pub fn compute(grid: &Grid) -> Self {
        let mut acc = WelfordAccumulator::default();
        for value in grid.iter() {
            acc.push(value);
        }
        acc.finish()
    }

    /// `max - min`
    #[inline]
    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// True when there is no spread to normalise against
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.count == 0 || self.max == self.min
    }

    /// Standard deviation, with `1.0` substituted for a zero-variance grid
    #[inline]
    pub fn std_dev_or_unit(&self) -> f64 {
        if self.variance > 0.0 {
            self.variance.sqrt()
        } else {
            1.0
        }
    }
}

/// Running min/max/mean/variance accumulator
#[derive(Debug, Clone, Copy)]
struct WelfordAccumulator {
    count: usize,
    min: f64,
    max: f64,
    mean: f64,
    m2: f64,
}

impl Default for WelfordAccumulator {
    fn default() -> Self {
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            m2: 0.0,
        }
    }
}

impl WelfordAccumulator {
    #[inline]
    fn push(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);

        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn finish(self) -> GridStats {
        if self.count == 0 {
            return GridStats::default();
        }
        GridStats {
            count: self.count,
            min: self.min,
            max: self.max,
            mean: self.mean,
            variance: (self.m2 / self.count as f64).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_stats_of_simple_grid() {
        let grid = Grid::new(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let stats = GridStats::compute(&grid);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.variance, 1.25);
        assert!(!stats.is_degenerate());
    }

    #[test]
    fn test_empty_grid_stats_are_neutral() {
        let stats = GridStats::compute(&Grid::empty());
        assert_eq!(stats, GridStats::default());
        assert!(stats.is_degenerate());
        assert_eq!(stats.std_dev_or_unit(), 1.0);
    }

    #[test]
    fn test_constant_grid_has_zero_variance() {
        let stats = GridStats::compute(&Grid::filled(5, 5, 7.0));
        assert!(stats.is_degenerate());
        assert_eq!(stats.variance, 0.0);
        assert_eq!(stats.std_dev_or_unit(), 1.0);
    }

    #[test]
    fn test_non_finite_samples_are_skipped() {
        let grid = Grid::new(vec![vec![1.0, f64::NAN, 3.0, f64::INFINITY]]);
        let stats = GridStats::compute(&grid);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.max, 3.0);
        assert_relative_eq!(stats.mean, 2.0);
    }

    #[test]
    fn test_welford_is_stable_with_large_offset() {
        let offset = 1.0e9;
        let grid = Grid::new(vec![vec![offset + 4.0, offset + 7.0, offset + 13.0, offset + 16.0]]);
        let stats = GridStats::compute(&grid);
        assert_relative_eq!(stats.variance, 22.5, epsilon = 1e-6);
    }
}
