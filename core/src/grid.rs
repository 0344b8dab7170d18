//! Rectangular scalar grid
//!
//! The fundamental container of the height-field pipeline: a `height × width`
//! table of `f64` samples stored row-major in one contiguous buffer. Grids are
//! value types; every transform in this crate returns a new grid and the only
//! in-place mutation is [`Grid::replace_contents`], which swaps the backing
//! storage wholesale.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors raised by the fallible grid constructors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Ragged grid: row {row} has {found} columns, expected {expected}")]
    RaggedRows {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Buffer length mismatch: expected {expected} samples, found {found}")]
    LengthMismatch { expected: usize, found: usize },
}

/// Row-major grid of 64-bit samples
#[derive(Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct Grid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Build a grid from row-major rows.
    ///
    /// # Panics
    /// Panics if the rows do not all share the length of the first row.
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        match Self::try_new(rows) {
            Ok(grid) => grid,
            Err(err) => panic!("{}", err),
        }
    }

    /// Build a grid from row-major rows, reporting ragged input as an error
    pub fn try_new(rows: Vec<Vec<f64>>) -> Result<Self, GridError> {
        let width = rows.first().map_or(0, Vec::len);
        let height = rows.len();

        let mut data = Vec::with_capacity(width * height);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(GridError::RaggedRows {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            data.extend(values);
        }

        // A grid of zero-length rows carries no samples
        if width == 0 {
            return Ok(Self::empty());
        }

        Ok(Self { width, height, data })
    }

    /// Wrap an existing row-major buffer
    pub fn from_row_major(width: usize, height: usize, data: Vec<f64>) -> Result<Self, GridError> {
        let expected = width * height;
        if data.len() != expected {
            return Err(GridError::LengthMismatch {
                expected,
                found: data.len(),
            });
        }
        if expected == 0 {
            return Ok(Self::empty());
        }
        Ok(Self { width, height, data })
    }

    /// Grid with every cell set to `value`
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        if width == 0 || height == 0 {
            return Self::empty();
        }
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Grid with no samples
    pub fn empty() -> Self {
        Self::default()
    }

    /// Map an 8-bit intensity raster (row-major) to samples in `[0, 1]`
    pub fn from_luminance(width: usize, height: usize, pixels: &[u8]) -> Result<Self, GridError> {
        let data = pixels.iter().map(|&p| f64::from(p) / 255.0).collect();
        Self::from_row_major(width, height, data)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// Sample at `(row, col)`.
    ///
    /// # Panics
    /// Panics when the address lies outside the grid; callers clamp first.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        assert!(
            row < self.height && col < self.width,
            "grid index ({}, {}) out of bounds for {}x{} grid",
            row,
            col,
            self.height,
            self.width
        );
        self.data[row * self.width + col]
    }

    /// Sample at `(row, col)`, or `None` outside the grid
    #[inline]
    pub fn get_checked(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.height && col < self.width {
            Some(self.data[row * self.width + col])
        } else {
            None
        }
    }

    /// Borrow one row
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.width;
        &self.data[start..start + self.width]
    }

    /// Borrow the row-major sample buffer
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.data.iter().copied()
    }

    /// Copy out as nested rows
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        if self.width == 0 {
            return Vec::new();
        }
        self.data.chunks(self.width).map(<[f64]>::to_vec).collect()
    }

    /// Same-shape grid with `f` applied to every sample
    pub fn map<F>(&self, f: F) -> Grid
    where
        F: Fn(f64) -> f64,
    {
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Swap in `other` as this grid's contents, returning the previous contents.
    ///
    /// Shape and samples change together, so a reader holding `&self` before
    /// or after the call never sees a half-written grid.
    pub fn replace_contents(&mut self, other: Grid) -> Grid {
        std::mem::replace(self, other)
    }

    /// Build a same-shape grid around a freshly computed buffer
    pub(crate) fn with_data(&self, data: Vec<f64>) -> Grid {
        debug_assert_eq!(data.len(), self.data.len());
        Self {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rows", &self.to_rows())
            .finish()
    }
}

impl TryFrom<Vec<Vec<f64>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Grid::try_new(rows)
    }
}

impl From<Grid> for Vec<Vec<f64>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}
