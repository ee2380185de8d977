//! Capability interface shared by every stabilizer the wrapper can host.

use crate::engine::StabilizerEngine;
use crate::error::Result;
use crate::frame::ImageBuffer;
use crate::metrics::PerformanceMetrics;
use crate::params::{validate_parameters, StabilizationParameters};
use crate::transform::Transform;

/// A frame stabilizer. Implementations are single-threaded; callers that
/// need sharing wrap them in [`crate::wrapper::StabilizerWrapper`].
pub trait Stabilize: Send {
    fn initialize(
        &mut self,
        width: usize,
        height: usize,
        params: StabilizationParameters,
    ) -> Result<()>;

    /// Stabilized frame, or the input itself when nothing can be done.
    fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer;

    fn update_parameters(&mut self, params: StabilizationParameters) -> Result<()>;

    fn reset(&mut self);

    fn is_ready(&self) -> bool;

    fn parameters(&self) -> StabilizationParameters;

    fn transform_history(&self) -> Vec<Transform>;

    fn performance_metrics(&self) -> PerformanceMetrics;

    fn last_error(&self) -> Option<String>;
}

impl Stabilize for StabilizerEngine {
    fn initialize(
        &mut self,
        width: usize,
        height: usize,
        params: StabilizationParameters,
    ) -> Result<()> {
        StabilizerEngine::initialize(self, width, height, params)
    }

    fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer {
        StabilizerEngine::process_frame(self, frame)
    }

    fn update_parameters(&mut self, params: StabilizationParameters) -> Result<()> {
        StabilizerEngine::update_parameters(self, params)
    }

    fn reset(&mut self) {
        StabilizerEngine::reset(self)
    }

    fn is_ready(&self) -> bool {
        StabilizerEngine::is_ready(self)
    }

    fn parameters(&self) -> StabilizationParameters {
        StabilizerEngine::parameters(self).clone()
    }

    fn transform_history(&self) -> Vec<Transform> {
        StabilizerEngine::transform_history(self)
    }

    fn performance_metrics(&self) -> PerformanceMetrics {
        StabilizerEngine::performance_metrics(self)
    }

    fn last_error(&self) -> Option<String> {
        StabilizerEngine::last_error(self)
    }
}

/// Stabilizer that returns every frame untouched. Stands in where
/// stabilization is switched off at build or deployment time.
#[derive(Clone, Debug, Default)]
pub struct PassThrough {
    params: StabilizationParameters,
    ready: bool,
    metrics: PerformanceMetrics,
}

impl Stabilize for PassThrough {
    fn initialize(
        &mut self,
        _width: usize,
        _height: usize,
        params: StabilizationParameters,
    ) -> Result<()> {
        self.params = validate_parameters(&params)?;
        self.ready = true;
        self.metrics = PerformanceMetrics::default();
        Ok(())
    }

    fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer {
        if self.ready {
            self.metrics.record(0.0);
        }
        frame.clone()
    }

    fn update_parameters(&mut self, params: StabilizationParameters) -> Result<()> {
        self.params = validate_parameters(&params)?;
        Ok(())
    }

    fn reset(&mut self) {
        self.metrics = PerformanceMetrics::default();
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn parameters(&self) -> StabilizationParameters {
        self.params.clone()
    }

    fn transform_history(&self) -> Vec<Transform> {
        Vec::new()
    }

    fn performance_metrics(&self) -> PerformanceMetrics {
        self.metrics.clone()
    }

    fn last_error(&self) -> Option<String> {
        None
    }
}
