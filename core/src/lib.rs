//! Height-field processing core
//!
//! Turns an arbitrary 2D grid of scalars (feature magnitudes, density
//! estimates, raster intensities) into a smoothed, tone-mapped surface that a
//! mesh builder can sample once per vertex.
//!
//! - [`grid`]: the row-major sample container
//! - [`sampler`]: nearest / bilinear / Catmull-Rom evaluation with clamp-to-edge
//! - [`smoothing`]: separable box and Gaussian filters, windowed median
//! - [`tone_mapping`]: clamp, normalise, log, gamma and z-score operators
//! - [`stats`]: the single statistics pass behind tone mapping
//! - [`pipeline`]: the controller tying the stages together
//! - [`shared`]: versioned grid slot for cross-thread hand-off
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

pub mod config;
pub mod grid;
pub mod pipeline;
pub mod sampler;
pub mod shared;
pub mod smoothing;
pub mod stats;
pub mod tone_mapping;

pub use self::config::{ConfigChange, ConfigError, PipelineConfig};
pub use self::grid::{Grid, GridError};
pub use self::pipeline::{GridPublication, HeightFieldPipeline, PipelineListener, SharedGridPublisher};
pub use self::sampler::{sample, sample_vertex, GridVertex, InterpolationMode};
pub use self::shared::SharedGrid;
pub use self::smoothing::{smooth, SmoothingMethod, SmoothingParams};
pub use self::stats::GridStats;
pub use self::tone_mapping::{tone_map, tone_map_with_stats, ToneMapOperator};

/// Crate version from Cargo metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install an `env_logger` backend honouring `RUST_LOG`.
///
/// Embedding applications that already configure a `log` backend should not
/// call this; repeated calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
