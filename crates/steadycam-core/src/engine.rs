//! Per-frame stabilization pipeline.
//!
//! The engine is single-threaded: every mutating method takes `&mut self`
//! and no locks are taken on the frame path. Share it across threads through
//! [`crate::wrapper::StabilizerWrapper`].

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::consts::{
    FEATURE_TARGET_DECAY, FEATURE_TARGET_GROWTH, HEALTHY_SURVIVAL_RATIO, MIN_POINT_PAIRS,
};
use crate::edge::apply_edge_mode;
use crate::error::{Result, StabilizerError};
use crate::features::detector::{detect, DetectorConfig};
use crate::features::flow::LucasKanadeTracker;
use crate::features::pyramid::Pyramid;
use crate::features::Point;
use crate::frame::{to_gray, validate_dimensions, validate_frame, ImageBuffer};
use crate::history::TransformHistory;
use crate::metrics::PerformanceMetrics;
use crate::motion::estimate::{estimate_transform, EstimationBounds};
use crate::motion::smoothing::{smooth, SmoothingMode};
use crate::params::{validate_parameters, StabilizationParameters};
use crate::transform::Transform;
use crate::warp::warp_affine;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    Uninitialized,
    Ready,
}

/// Feature-based video stabilizer for one stream.
#[derive(Debug)]
pub struct StabilizerEngine {
    params: StabilizationParameters,
    state: EngineState,
    width: usize,
    height: usize,
    /// Next processed frame only seeds features.
    first_frame: bool,
    prev_pyramid: Option<Pyramid>,
    prev_points: Vec<Point>,
    history: TransformHistory,
    last_correction: Transform,
    /// Corners requested from the detector; drifts within the adaptive bounds.
    feature_target: usize,
    metrics: PerformanceMetrics,
    last_error: Option<String>,
}

impl Default for StabilizerEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilizerEngine {
    pub fn new() -> Self {
        let params = StabilizationParameters::default();
        Self {
            state: EngineState::Uninitialized,
            width: 0,
            height: 0,
            first_frame: true,
            prev_pyramid: None,
            prev_points: Vec::new(),
            history: TransformHistory::new(params.smoothing_radius),
            last_correction: Transform::identity(),
            feature_target: params.feature_count,
            metrics: PerformanceMetrics::default(),
            last_error: None,
            params,
        }
    }

    /// Validate dimensions and parameters, clear all state and become ready.
    pub fn initialize(
        &mut self,
        width: usize,
        height: usize,
        params: StabilizationParameters,
    ) -> Result<()> {
        let validated =
            validate_dimensions(width, height).and_then(|_| validate_parameters(&params));
        let params = match validated {
            Ok(p) => p,
            Err(e) => {
                error!(width, height, "initialize failed: {e}");
                self.state = EngineState::Uninitialized;
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        self.width = width;
        self.height = height;
        self.history = TransformHistory::new(params.smoothing_radius);
        self.feature_target = params.feature_count;
        self.params = params;
        self.clear_tracking();
        self.last_correction = Transform::identity();
        self.metrics = PerformanceMetrics::default();
        self.last_error = None;
        self.state = EngineState::Ready;

        info!(
            width,
            height,
            smoothing_radius = self.params.smoothing_radius,
            feature_count = self.params.feature_count,
            edge_mode = %self.params.edge_mode,
            "stabilizer initialized"
        );
        Ok(())
    }

    /// Stabilize one frame.
    ///
    /// Never fails: on any problem the error is recorded and the input is
    /// returned unchanged (sharing its storage). The first frame after
    /// initialization, reset or a resolution change is also returned as-is.
    pub fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer {
        if self.state != EngineState::Ready {
            self.last_error = Some(StabilizerError::NotInitialized.to_string());
            return frame.clone();
        }

        let start = Instant::now();
        let output = match self.run_pipeline(frame) {
            Ok(Some(stabilized)) => stabilized,
            Ok(None) => frame.clone(),
            Err(e) => {
                match &e {
                    StabilizerError::InvalidFrame(_) => error!("frame rejected: {e}"),
                    _ => warn!("frame passed through: {e}"),
                }
                self.last_error = Some(e.to_string());
                frame.clone()
            }
        };
        self.metrics.record(start.elapsed().as_secs_f64() * 1000.0);
        output
    }

    /// Apply new parameters without touching image buffers. The history is
    /// trimmed if the smoothing radius shrank.
    pub fn update_parameters(&mut self, params: StabilizationParameters) -> Result<()> {
        match self.apply_parameters(params) {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!("parameter update rejected: {e}");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Validate and install `params` without touching the error state.
    pub(crate) fn apply_parameters(&mut self, params: StabilizationParameters) -> Result<()> {
        let params = validate_parameters(&params)?;

        self.history.set_capacity(params.smoothing_radius);
        if !params.enabled && self.params.enabled {
            self.clear_tracking();
        }
        let (lo, hi) = feature_bounds(&params);
        self.feature_target = if params.feature_count != self.params.feature_count {
            params.feature_count
        } else {
            self.feature_target.clamp(lo, hi)
        };
        debug!(
            smoothing_radius = params.smoothing_radius,
            feature_count = params.feature_count,
            "parameters updated"
        );
        self.params = params;
        Ok(())
    }

    /// Drop history, tracking state, metrics and errors. The engine stays
    /// ready with its dimensions and parameters; the next frame seeds.
    pub fn reset(&mut self) {
        self.history.clear();
        self.clear_tracking();
        self.last_correction = Transform::identity();
        self.feature_target = self.params.feature_count;
        self.metrics = PerformanceMetrics::default();
        self.last_error = None;
        debug!("stabilizer reset");
    }

    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// True when the next frame will only seed features.
    pub fn awaiting_seed(&self) -> bool {
        self.first_frame
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn parameters(&self) -> &StabilizationParameters {
        &self.params
    }

    /// Copy of the accepted transforms, oldest first.
    pub fn transform_history(&self) -> Vec<Transform> {
        self.history.to_vec()
    }

    /// Correction warp applied to the most recent stabilized frame.
    pub fn last_correction(&self) -> Transform {
        self.last_correction
    }

    pub fn feature_target(&self) -> usize {
        self.feature_target
    }

    pub fn tracked_points(&self) -> &[Point] {
        &self.prev_points
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.metrics.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.clone()
    }

    // ------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------

    /// `Ok(None)` means "return the input unchanged".
    fn run_pipeline(&mut self, frame: &ImageBuffer) -> Result<Option<ImageBuffer>> {
        validate_frame(frame)?;
        let gray = to_gray(frame);

        if (frame.width(), frame.height()) != (self.width, self.height) {
            info!(
                from_width = self.width,
                from_height = self.height,
                width = frame.width(),
                height = frame.height(),
                "resolution changed, reinitializing"
            );
            self.width = frame.width();
            self.height = frame.height();
            self.history.clear();
            self.clear_tracking();
        }

        if !self.params.enabled {
            self.clear_tracking();
            return Ok(None);
        }

        let pyramid = Pyramid::build(
            &gray,
            self.params.optical_flow_pyramid_levels,
            self.params.optical_flow_window_size,
        );

        let Some(prev_pyramid) = self.prev_pyramid.as_ref().filter(|_| !self.first_frame) else {
            let points = self.detect_features(&pyramid)?;
            debug!(points = points.len(), "seed features detected");
            self.store_tracking(pyramid, points);
            return Ok(None);
        };

        // Track and filter.
        let tracker = LucasKanadeTracker::from(&self.params);
        let tracked = tracker.track(prev_pyramid, &pyramid, &self.prev_points);
        let mut src = Vec::with_capacity(tracked.len());
        let mut dst = Vec::with_capacity(tracked.len());
        for (from, t) in self.prev_points.iter().zip(&tracked) {
            if t.is_tracked()
                && (t.error as f64) <= self.params.tracking_error_threshold
                && t.point.in_bounds(self.width, self.height)
                && (from.distance(&t.point) as f64) <= self.params.max_displacement
            {
                src.push(*from);
                dst.push(t.point);
            }
        }
        self.metrics.tracked_features = src.len();

        let required = MIN_POINT_PAIRS.max(self.feature_target / 10);
        if src.len() < required {
            self.grow_feature_target();
            self.refresh_features(pyramid, Vec::new());
            return Err(StabilizerError::Tracking {
                tracked: src.len(),
                required,
            });
        }

        let bounds = EstimationBounds::from(&self.params);
        let estimate = match estimate_transform(&src, &dst, &bounds) {
            Ok(e) => e,
            Err(e) => {
                self.refresh_features(pyramid, Vec::new());
                return Err(e);
            }
        };

        self.history.push(estimate.transform);
        let smoothed = smooth(self.history.as_slice(), SmoothingMode::from(&self.params));
        let correction = self.correction_for(&smoothed)?;

        let warped = warp_affine(frame, &correction)?;
        let output = apply_edge_mode(warped, &correction, self.params.edge_mode);

        // Next frame's reference.
        let survival = src.len() as f64 / self.prev_points.len().max(1) as f64;
        if survival < self.params.feature_refresh_threshold
            || src.len() < self.feature_target / 2
        {
            debug!(survival, survivors = src.len(), "refreshing features");
            self.grow_feature_target();
            self.refresh_features(pyramid, dst);
        } else {
            if survival >= HEALTHY_SURVIVAL_RATIO {
                self.decay_feature_target();
            }
            self.store_tracking(pyramid, dst);
        }

        self.last_correction = correction;
        self.metrics.stabilized_frames += 1;
        self.last_error = None;
        debug!(
            tx = estimate.transform.tx,
            ty = estimate.transform.ty,
            inliers = estimate.inliers,
            "frame stabilized"
        );
        Ok(Some(output))
    }

    /// Compensating warp for the smoothed motion, translation limited to
    /// `max_correction` percent of the frame size.
    fn correction_for(&self, smoothed: &Transform) -> Result<Transform> {
        let mut correction = smoothed.invert().ok_or_else(|| {
            StabilizerError::TransformApplication(format!("cannot invert {smoothed}"))
        })?;
        let limit = self.params.max_correction / 100.0;
        let max_x = limit * self.width as f64;
        let max_y = limit * self.height as f64;
        correction.tx = correction.tx.clamp(-max_x, max_x);
        correction.ty = correction.ty.clamp(-max_y, max_y);
        Ok(correction)
    }

    fn detect_features(&self, pyramid: &Pyramid) -> Result<Vec<Point>> {
        let config = DetectorConfig::from(&self.params).with_max_corners(self.feature_target);
        detect(pyramid.base(), &config)
    }

    /// Re-detect on the current frame. If detection fails, keep `fallback`
    /// points when there are enough of them, otherwise seed again next frame.
    fn refresh_features(&mut self, pyramid: Pyramid, fallback: Vec<Point>) {
        match self.detect_features(&pyramid) {
            Ok(points) => self.store_tracking(pyramid, points),
            Err(e) if fallback.len() >= MIN_POINT_PAIRS => {
                debug!("feature refresh failed ({e}), keeping tracked points");
                self.store_tracking(pyramid, fallback);
            }
            Err(e) => {
                warn!("feature refresh failed: {e}");
                self.clear_tracking();
            }
        }
    }

    fn store_tracking(&mut self, pyramid: Pyramid, points: Vec<Point>) {
        self.prev_pyramid = Some(pyramid);
        self.prev_points = points;
        self.first_frame = false;
    }

    fn clear_tracking(&mut self) {
        self.prev_pyramid = None;
        self.prev_points.clear();
        self.first_frame = true;
    }

    fn grow_feature_target(&mut self) {
        let (lo, hi) = feature_bounds(&self.params);
        let grown = (self.feature_target as f64 * FEATURE_TARGET_GROWTH).round() as usize;
        self.feature_target = grown.clamp(lo, hi);
    }

    fn decay_feature_target(&mut self) {
        let (lo, hi) = feature_bounds(&self.params);
        let decayed = (self.feature_target as f64 * FEATURE_TARGET_DECAY).round() as usize;
        self.feature_target = decayed.clamp(lo, hi);
    }
}

/// Range the feature target may drift in: the adaptive bounds widened to
/// include the configured feature count.
fn feature_bounds(params: &StabilizationParameters) -> (usize, usize) {
    (
        params.adaptive_feature_min.min(params.feature_count),
        params.adaptive_feature_max.max(params.feature_count),
    )
}
