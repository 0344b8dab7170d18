//! Cross-thread grid hand-off
//!
//! [`SharedGrid`] holds the latest published grid behind a read-write lock
//! together with a generation counter. A producer (the pipeline, or a worker
//! thread smoothing a large grid off the render thread) swaps in a complete
//! grid; readers take an `Arc` snapshot and never observe a partially written
//! grid. The generation can be polled without locking to detect staleness.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::grid::Grid;

/// Versioned, atomically swappable grid slot
#[derive(Debug)]
pub struct SharedGrid {
    current: RwLock<Arc<Grid>>,
    generation: AtomicU64,
}

impl Default for SharedGrid {
    fn default() -> Self {
        Self::new(Grid::empty())
    }
}

impl SharedGrid {
    pub fn new(grid: Grid) -> Self {
        Self {
            current: RwLock::new(Arc::new(grid)),
            generation: AtomicU64::new(0),
        }
    }

    /// Current grid; cheap `Arc` clone
    pub fn snapshot(&self) -> Arc<Grid> {
        Arc::clone(&self.current.read())
    }

    /// Current grid together with the generation it was published under
    pub fn versioned_snapshot(&self) -> (u64, Arc<Grid>) {
        let guard = self.current.read();
        (self.generation.load(Ordering::Acquire), Arc::clone(&guard))
    }

    /// Publish `grid`, returning the new generation
    pub fn swap(&self, grid: Grid) -> u64 {
        self.swap_arc(Arc::new(grid))
    }

    /// Publish an already shared grid, returning the new generation
    pub fn swap_arc(&self, grid: Arc<Grid>) -> u64 {
        let mut guard = self.current.write();
        *guard = grid;
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publish `grid` under an externally assigned generation.
    ///
    /// Used by the pipeline so the slot mirrors the controller's own counter.
    pub fn publish(&self, generation: u64, grid: Arc<Grid>) {
        let mut guard = self.current.write();
        *guard = grid;
        self.generation.store(generation, Ordering::Release);
    }

    /// Generation of the most recent publication; lock-free
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// True when something newer than `seen` has been published
    pub fn is_newer_than(&self, seen: u64) -> bool {
        self.generation() != seen
    }
}
