//! Height-field pipeline controller
//!
//! Owns the source-of-truth grid and the processed grid derived from it:
//!
//! ```text
//! original ──smooth?──▶ smoothed ──tone map?──▶ processed ──sample──▶ height
//! ```
//!
//! `processed` is always a pure function of `original` and the current
//! [`PipelineConfig`]. Ingesting new data or changing any configuration field
//! recomputes it in full, swaps in a fresh `Arc<Grid>`, bumps the generation
//! counter and notifies every registered [`PipelineListener`].
//!
//! The controller is driven by a single owner (the render/update cycle) and
//! takes `&mut self` for every state transition.
//!
//! Copyright (c) 2025 Mohammad Atashi <mohammadaliatashi@icloud.com>

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, trace};

use crate::config::{ConfigChange, PipelineConfig};
use crate::grid::Grid;
use crate::sampler::{self, GridVertex, InterpolationMode};
use crate::shared::SharedGrid;
use crate::smoothing::SmoothingMethod;
use crate::stats::GridStats;
use crate::tone_mapping::{self, ToneMapOperator};

/// Announcement of a freshly recomputed processed grid
#[derive(Debug, Clone)]
pub struct GridPublication {
    pub generation: u64,
    pub width: usize,
    pub height: usize,
    pub grid: Arc<Grid>,
}

/// Consumer of processed grids (mesh builders, renderers, caches)
pub trait PipelineListener: Send {
    /// Called at the end of every recomputation
    fn on_processed(&mut self, publication: &GridPublication);
}

impl<F> PipelineListener for F
where
    F: FnMut(&GridPublication) + Send,
{
    fn on_processed(&mut self, publication: &GridPublication) {
        self(publication)
    }
}

/// Listener that mirrors every publication into a [`SharedGrid`]
pub struct SharedGridPublisher {
    target: Arc<SharedGrid>,
}

impl SharedGridPublisher {
    pub fn new(target: Arc<SharedGrid>) -> Self {
        Self { target }
    }
}

impl PipelineListener for SharedGridPublisher {
    fn on_processed(&mut self, publication: &GridPublication) {
        self.target
            .publish(publication.generation, Arc::clone(&publication.grid));
    }
}

/// Smooth → tone-map controller with an on-demand height lookup
pub struct HeightFieldPipeline {
    config: PipelineConfig,
    original: Arc<Grid>,
    processed: Arc<Grid>,
    processed_stats: Option<GridStats>,
    generation: u64,
    listeners: Vec<Box<dyn PipelineListener>>,
}

impl Default for HeightFieldPipeline {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl fmt::Debug for HeightFieldPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeightFieldPipeline")
            .field("config", &self.config)
            .field("dimensions", &self.dimensions())
            .field("generation", &self.generation)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl HeightFieldPipeline {
    /// Pipeline with empty grids; nothing is published until the first ingest
    pub fn new(config: PipelineConfig) -> Self {
        let empty = Arc::new(Grid::empty());
        Self {
            config,
            original: Arc::clone(&empty),
            processed: empty,
            processed_stats: None,
            generation: 0,
            listeners: Vec::new(),
        }
    }

    /// Replace the source grid wholesale and recompute
    pub fn ingest(&mut self, grid: Grid) {
        debug!(
            "Ingesting {}x{} grid (previous {}x{})",
            grid.width(),
            grid.height(),
            self.original.width(),
            self.original.height()
        );
        self.original = Arc::new(grid);
        self.recompute();
    }

    /// Change one configuration field and recompute
    pub fn set_config(&mut self, change: ConfigChange) {
        trace!("Configuration change: {:?}", change);
        self.config.apply(change);
        self.recompute();
    }

    /// Replace the whole configuration and recompute once
    pub fn replace_config(&mut self, config: PipelineConfig) {
        self.config = config;
        self.recompute();
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.set_config(ConfigChange::InterpolationMode(mode));
    }

    pub fn set_smoothing_enabled(&mut self, enabled: bool) {
        self.set_config(ConfigChange::SmoothingEnabled(enabled));
    }

    pub fn set_smoothing_method(&mut self, method: SmoothingMethod) {
        self.set_config(ConfigChange::SmoothingMethod(method));
    }

    pub fn set_smoothing_radius(&mut self, radius: i32) {
        self.set_config(ConfigChange::SmoothingRadius(radius));
    }

    pub fn set_smoothing_iterations(&mut self, iterations: i32) {
        self.set_config(ConfigChange::SmoothingIterations(iterations));
    }

    pub fn set_gaussian_sigma(&mut self, sigma: f64) {
        self.set_config(ConfigChange::GaussianSigma(sigma));
    }

    pub fn set_tone_map_enabled(&mut self, enabled: bool) {
        self.set_config(ConfigChange::ToneMapEnabled(enabled));
    }

    pub fn set_tone_map_operator(&mut self, operator: ToneMapOperator) {
        self.set_config(ConfigChange::ToneMapOperator(operator));
    }

    pub fn set_tone_map_param(&mut self, param: f64) {
        self.set_config(ConfigChange::ToneMapParam(param));
    }

    /// Register a consumer; it hears about the next recomputation onward
    pub fn add_listener(&mut self, listener: Box<dyn PipelineListener>) {
        self.listeners.push(listener);
    }

    /// Mirror every future publication into `target`, seeding it with the
    /// current processed grid
    pub fn publish_to(&mut self, target: Arc<SharedGrid>) {
        target.publish(self.generation, Arc::clone(&self.processed));
        self.add_listener(Box::new(SharedGridPublisher::new(target)));
    }

    /// Height of the processed surface at a mesh vertex's `(grid_x, grid_y)`
    #[inline]
    pub fn height_at(&self, vertex: &GridVertex) -> f64 {
        sampler::sample(
            &self.processed,
            vertex.grid_x,
            vertex.grid_y,
            self.config.interpolation_mode,
        )
    }

    /// Height of the processed surface at a continuous grid position
    #[inline]
    pub fn height_at_xy(&self, x: f64, y: f64) -> f64 {
        sampler::sample(&self.processed, x, y, self.config.interpolation_mode)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn original(&self) -> &Arc<Grid> {
        &self.original
    }

    pub fn processed(&self) -> &Arc<Grid> {
        &self.processed
    }

    /// Statistics gathered for the tone-mapping stage of the last recompute
    pub fn processed_stats(&self) -> Option<&GridStats> {
        self.processed_stats.as_ref()
    }

    /// Number of completed recomputations
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `(width, height)` of the processed grid
    pub fn dimensions(&self) -> (usize, usize) {
        self.processed.dimensions()
    }

    fn recompute(&mut self) {
        let started = Instant::now();

        // Disabled stages share their input instead of copying it
        let smoothed = match self.config.smoothing() {
            Some(params) => {
                trace!("Smoothing stage: {:?}", params);
                Arc::new(params.apply(&self.original))
            }
            None => Arc::clone(&self.original),
        };

        let (processed, stats) = match self.config.tone_mapping() {
            Some((operator, param)) => {
                let stats = operator
                    .needs_stats()
                    .then(|| GridStats::compute(&smoothed));
                let mapped = tone_mapping::tone_map_with_stats(
                    &smoothed,
                    operator,
                    param,
                    &stats.unwrap_or_default(),
                );
                (Arc::new(mapped), stats)
            }
            None => (smoothed, None),
        };

        self.processed = processed;
        self.processed_stats = stats;
        self.generation += 1;

        let (width, height) = self.processed.dimensions();
        debug!(
            "Recomputed {}x{} height field (generation {}) in {:?}",
            width,
            height,
            self.generation,
            started.elapsed()
        );

        let publication = GridPublication {
            generation: self.generation,
            width,
            height,
            grid: Arc::clone(&self.processed),
        };
        for listener in self.listeners.iter_mut() {
            listener.on_processed(&publication);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::smooth;
    use approx::assert_abs_diff_eq;
    use std::sync::Mutex;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn spike() -> Grid {
        Grid::new(vec![
            vec![0.0, 0.0, 0.0],
            vec![0.0, 10.0, 0.0],
            vec![0.0, 0.0, 0.0],
        ])
    }

    fn recording_listener() -> (Arc<Mutex<Vec<(u64, usize, usize)>>>, Box<dyn PipelineListener>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |publication: &GridPublication| {
            sink.lock()
                .unwrap()
                .push((publication.generation, publication.width, publication.height));
        };
        (seen, Box::new(listener))
    }

    #[test]
    fn test_fresh_pipeline_is_empty() {
        let pipeline = HeightFieldPipeline::default();
        assert_eq!(pipeline.generation(), 0);
        assert_eq!(pipeline.dimensions(), (0, 0));
        assert_eq!(pipeline.height_at(&GridVertex::at_cell(2, 2)), 0.0);
    }

    #[test]
    fn test_disabled_stages_pass_through() {
        init_logging();
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(spike());
        assert_eq!(**pipeline.processed(), spike());
        assert_eq!(pipeline.generation(), 1);
        assert!(pipeline.processed_stats().is_none());
    }

    #[test]
    fn test_tone_map_stage() {
        init_logging();
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(Grid::new(vec![vec![2.0, 4.0], vec![6.0, 10.0]]));
        pipeline.set_tone_map_enabled(true);

        let processed = pipeline.processed();
        assert_eq!(processed.get(0, 0), 0.0);
        assert_eq!(processed.get(1, 1), 1.0);
        assert_abs_diff_eq!(processed.get(0, 1), 0.25);
        assert_eq!(pipeline.processed_stats().map(|s| s.max), Some(10.0));
    }

    #[test]
    fn test_processed_is_function_of_original_and_config() {
        init_logging();
        let source = Grid::new(vec![
            vec![1.0, 5.0, 2.0, 8.0],
            vec![3.0, 0.0, 7.0, 4.0],
            vec![6.0, 2.0, 9.0, 1.0],
        ]);
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(source.clone());
        pipeline.set_smoothing_enabled(true);
        pipeline.set_smoothing_method(SmoothingMethod::Box);
        pipeline.set_smoothing_radius(1);
        pipeline.set_tone_map_enabled(true);
        pipeline.set_tone_map_operator(ToneMapOperator::Normalize01);

        let expected = tone_mapping::tone_map(
            &smooth(&source, SmoothingMethod::Box, 1, 1, 0.0),
            ToneMapOperator::Normalize01,
            0.0,
        );
        assert_eq!(**pipeline.processed(), expected);

        // Toggling a stage off and on again lands on the same result
        pipeline.set_smoothing_enabled(false);
        assert_ne!(**pipeline.processed(), expected);
        pipeline.set_smoothing_enabled(true);
        assert_eq!(**pipeline.processed(), expected);
        assert_eq!(**pipeline.original(), source);
    }

    #[test]
    fn test_every_setter_recomputes_and_notifies() {
        init_logging();
        let mut pipeline = HeightFieldPipeline::default();
        let (seen, listener) = recording_listener();
        pipeline.add_listener(listener);

        pipeline.ingest(Grid::filled(4, 3, 1.0));
        pipeline.set_interpolation_mode(InterpolationMode::Bicubic);
        pipeline.set_smoothing_enabled(true);
        pipeline.set_smoothing_method(SmoothingMethod::Median);
        pipeline.set_smoothing_radius(2);
        pipeline.set_smoothing_iterations(2);
        pipeline.set_gaussian_sigma(0.5);
        pipeline.set_tone_map_enabled(true);
        pipeline.set_tone_map_operator(ToneMapOperator::Gamma);
        pipeline.set_tone_map_param(1.5);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 10);
        assert_eq!(pipeline.generation(), 10);
        assert!(seen.iter().enumerate().all(|(i, &(g, w, h))| g == i as u64 + 1 && (w, h) == (4, 3)));
    }

    #[test]
    fn test_ingest_publishes_new_dimensions() {
        let mut pipeline = HeightFieldPipeline::default();
        let (seen, listener) = recording_listener();
        pipeline.add_listener(listener);

        pipeline.ingest(Grid::filled(2, 2, 0.0));
        pipeline.ingest(Grid::filled(5, 7, 0.0));
        assert_eq!(pipeline.dimensions(), (5, 7));
        assert_eq!(seen.lock().unwrap().last(), Some(&(2, 5, 7)));
    }

    #[test]
    fn test_height_at_follows_interpolation_mode() {
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(Grid::new(vec![vec![0.0, 10.0], vec![20.0, 30.0]]));

        let vertex = GridVertex {
            x_index: 0,
            y_index: 0,
            grid_x: 0.5,
            grid_y: 0.5,
        };
        assert_abs_diff_eq!(pipeline.height_at(&vertex), 15.0);

        pipeline.set_interpolation_mode(InterpolationMode::Nearest);
        assert_eq!(pipeline.height_at(&vertex), 30.0);
        assert_eq!(pipeline.height_at_xy(0.5, 0.5), 30.0);
        assert_eq!(pipeline.height_at_xy(-5.0, -5.0), 0.0);
    }

    #[test]
    fn test_height_at_samples_vertex_position_in_every_mode() {
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(Grid::new(vec![
            vec![0.0, 10.0, 4.0, 7.0, 1.0],
            vec![20.0, 30.0, 2.0, 9.0, 5.0],
            vec![3.0, 8.0, 6.0, 12.0, 0.5],
            vec![11.0, 1.0, 14.0, 2.5, 6.0],
            vec![4.0, 16.0, 0.0, 3.0, 8.0],
        ]));

        for mode in [
            InterpolationMode::Nearest,
            InterpolationMode::Bilinear,
            InterpolationMode::Bicubic,
        ] {
            pipeline.set_interpolation_mode(mode);
            for (x, y) in [(0.75, 0.75), (2.4, 1.6), (1.5, 2.5), (3.9, 0.1), (-1.0, 6.0)] {
                let vertex = GridVertex::at_position(x, y);
                assert_eq!(
                    pipeline.height_at(&vertex),
                    sampler::sample(pipeline.processed(), x, y, mode),
                    "{:?} at ({}, {})",
                    mode,
                    x,
                    y
                );
            }
        }

        pipeline.set_interpolation_mode(InterpolationMode::Nearest);
        assert_eq!(pipeline.height_at(&GridVertex::at_position(0.75, 0.75)), 30.0);
    }

    #[test]
    fn test_disabled_stages_share_original() {
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(spike());
        assert!(Arc::ptr_eq(pipeline.processed(), pipeline.original()));

        pipeline.set_tone_map_enabled(true);
        assert!(!Arc::ptr_eq(pipeline.processed(), pipeline.original()));
        pipeline.set_tone_map_enabled(false);
        assert!(Arc::ptr_eq(pipeline.processed(), pipeline.original()));
    }

    #[test]
    fn test_publish_to_shared_grid() {
        let shared = Arc::new(SharedGrid::default());
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.publish_to(Arc::clone(&shared));
        assert_eq!(shared.generation(), 0);

        pipeline.ingest(spike());
        pipeline.set_tone_map_enabled(true);

        let (generation, grid) = shared.versioned_snapshot();
        assert_eq!(generation, pipeline.generation());
        assert!(Arc::ptr_eq(&grid, pipeline.processed()));
        assert_eq!(grid.get(1, 1), 1.0);
    }

    #[test]
    fn test_replace_config_recomputes_once() {
        let mut pipeline = HeightFieldPipeline::default();
        pipeline.ingest(Grid::filled(4, 4, 2.0));
        pipeline.replace_config(PipelineConfig {
            smoothing_enabled: true,
            smoothing_method: SmoothingMethod::Box,
            tone_map_enabled: true,
            tone_map_operator: ToneMapOperator::ZScore,
            ..Default::default()
        });
        assert_eq!(pipeline.generation(), 2);
        assert!(pipeline.processed().iter().all(|v| v == 0.0));
    }
}
