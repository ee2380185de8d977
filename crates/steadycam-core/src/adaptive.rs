//! Motion-adaptive parameter control on top of [`StabilizerEngine`].
//!
//! After each frame the transform history is reclassified. When the motion
//! regime changes, the engine parameters migrate toward that regime's
//! profile: immediately when leaving `Static`, otherwise by
//! `transition_rate` of the remaining distance per stabilized frame.
//! Frames that fall back to pass-through leave the controller and the
//! engine's error state untouched.

use num_traits::NumCast;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::consts::{DEFAULT_CLASSIFIER_WINDOW, MIN_HISTORY_FOR_CLASSIFICATION};
use crate::engine::StabilizerEngine;
use crate::error::Result;
use crate::frame::ImageBuffer;
use crate::metrics::PerformanceMetrics;
use crate::motion::classifier::{MotionClassifier, MotionMetrics, MotionType};
use crate::params::StabilizationParameters;
use crate::stabilize::Stabilize;
use crate::transform::Transform;

/// Float fields closer than this to their target snap onto it.
const SNAP_EPSILON: f64 = 1e-6;

/// Parameter targets for one motion regime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    pub smoothing_radius: usize,
    pub max_correction: f64,
    pub feature_count: usize,
    pub quality_level: f64,
    pub refresh_threshold: f64,
    pub use_high_pass_filter: bool,
    pub high_pass_attenuation: f64,
    pub use_directional_smoothing: bool,
}

impl MotionProfile {
    fn basic(
        smoothing_radius: usize,
        max_correction: f64,
        feature_count: usize,
        quality_level: f64,
        refresh_threshold: f64,
    ) -> Self {
        Self {
            smoothing_radius,
            max_correction,
            feature_count,
            quality_level,
            refresh_threshold,
            use_high_pass_filter: false,
            high_pass_attenuation: 0.3,
            use_directional_smoothing: false,
        }
    }

    /// `params` with every profile field set to its target.
    pub fn apply_to(&self, params: &StabilizationParameters) -> StabilizationParameters {
        StabilizationParameters {
            smoothing_radius: self.smoothing_radius,
            max_correction: self.max_correction,
            feature_count: self.feature_count,
            quality_level: self.quality_level,
            feature_refresh_threshold: self.refresh_threshold,
            high_pass_attenuation: self.high_pass_attenuation,
            ..self.with_flags(params)
        }
    }

    /// One transition step: numeric fields move `rate` of the way to their
    /// targets, flags snap.
    pub fn step_from(&self, params: &StabilizationParameters, rate: f64) -> StabilizationParameters {
        let p = self.with_flags(params);
        StabilizationParameters {
            smoothing_radius: approach(p.smoothing_radius, self.smoothing_radius, rate, true),
            max_correction: approach(p.max_correction, self.max_correction, rate, false),
            feature_count: approach(p.feature_count, self.feature_count, rate, true),
            quality_level: approach(p.quality_level, self.quality_level, rate, false),
            feature_refresh_threshold: approach(
                p.feature_refresh_threshold,
                self.refresh_threshold,
                rate,
                false,
            ),
            high_pass_attenuation: approach(
                p.high_pass_attenuation,
                self.high_pass_attenuation,
                rate,
                false,
            ),
            ..p
        }
    }

    /// True when `params` already matches every profile field.
    pub fn is_reached_by(&self, params: &StabilizationParameters) -> bool {
        self.apply_to(params) == *params
    }

    fn with_flags(&self, params: &StabilizationParameters) -> StabilizationParameters {
        StabilizationParameters {
            use_high_pass_filter: self.use_high_pass_filter,
            use_directional_smoothing: self.use_directional_smoothing,
            ..params.clone()
        }
    }
}

/// Move `current` toward `target` by `rate` of the gap. Whole-number fields
/// round and always move at least one unit while they differ.
fn approach<T: NumCast + Copy>(current: T, target: T, rate: f64, whole: bool) -> T {
    let (Some(c), Some(t)) = (current.to_f64(), target.to_f64()) else {
        return target;
    };
    let mut next = c + (t - c) * rate.clamp(0.0, 1.0);
    if whole {
        next = next.round();
        if next == c && t != c {
            next = c + (t - c).signum();
        }
    }
    if (t - next).abs() < SNAP_EPSILON {
        next = t;
    }
    T::from(next).unwrap_or(target)
}

/// Per-regime profiles and the migration speed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    pub static_motion: MotionProfile,
    pub slow_motion: MotionProfile,
    pub fast_motion: MotionProfile,
    pub camera_shake: MotionProfile,
    pub pan_zoom: MotionProfile,
    /// Fraction of the remaining distance covered per frame (0-1).
    pub transition_rate: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            static_motion: MotionProfile::basic(8, 15.0, 120, 0.015, 0.9),
            slow_motion: MotionProfile::basic(25, 25.0, 175, 0.010, 0.7),
            fast_motion: MotionProfile::basic(50, 35.0, 250, 0.010, 0.5),
            camera_shake: MotionProfile {
                use_high_pass_filter: true,
                high_pass_attenuation: 0.3,
                ..MotionProfile::basic(65, 45.0, 350, 0.005, 0.4)
            },
            pan_zoom: MotionProfile {
                use_directional_smoothing: true,
                ..MotionProfile::basic(15, 20.0, 225, 0.010, 0.6)
            },
            transition_rate: 0.1,
        }
    }
}

impl AdaptiveConfig {
    pub fn profile(&self, motion: MotionType) -> &MotionProfile {
        match motion {
            MotionType::Static => &self.static_motion,
            MotionType::SlowMotion => &self.slow_motion,
            MotionType::FastMotion => &self.fast_motion,
            MotionType::CameraShake => &self.camera_shake,
            MotionType::PanZoom => &self.pan_zoom,
        }
    }
}

/// Engine plus motion classifier that retunes the engine per regime.
#[derive(Debug)]
pub struct AdaptiveStabilizer {
    engine: StabilizerEngine,
    config: AdaptiveConfig,
    classifier: MotionClassifier,
    adaptive_enabled: bool,
    previous_type: MotionType,
    /// Profile still being ramped toward, if any.
    pending: Option<MotionProfile>,
}

impl Default for AdaptiveStabilizer {
    fn default() -> Self {
        Self::new(AdaptiveConfig::default())
    }
}

impl AdaptiveStabilizer {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            engine: StabilizerEngine::new(),
            config,
            classifier: MotionClassifier::new(DEFAULT_CLASSIFIER_WINDOW, 1.0),
            adaptive_enabled: false,
            previous_type: MotionType::Static,
            pending: None,
        }
    }

    pub fn initialize(
        &mut self,
        width: usize,
        height: usize,
        params: StabilizationParameters,
    ) -> Result<()> {
        self.clear_adaptation();
        self.engine.initialize(width, height, params)
    }

    pub fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer {
        let stabilized_before = self.engine.performance_metrics().stabilized_frames;
        let output = self.engine.process_frame(frame);
        // Only frames that produced a new transform move the controller.
        let stabilized = self.engine.performance_metrics().stabilized_frames > stabilized_before;
        if self.adaptive_enabled && stabilized {
            self.adapt();
        }
        output
    }

    pub fn update_parameters(&mut self, params: StabilizationParameters) -> Result<()> {
        self.engine.update_parameters(params)
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.clear_adaptation();
    }

    pub fn set_adaptive_enabled(&mut self, enabled: bool) {
        self.adaptive_enabled = enabled;
    }

    pub fn is_adaptive_enabled(&self) -> bool {
        self.adaptive_enabled
    }

    pub fn set_motion_sensitivity(&mut self, sensitivity: f64) {
        self.classifier.set_sensitivity(sensitivity);
    }

    pub fn motion_sensitivity(&self) -> f64 {
        self.classifier.sensitivity()
    }

    pub fn current_motion_type(&self) -> MotionType {
        self.classifier.current_type()
    }

    pub fn current_metrics(&self) -> &MotionMetrics {
        self.classifier.current_metrics()
    }

    pub fn config(&self) -> &AdaptiveConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AdaptiveConfig) {
        self.config = config;
    }

    /// True while parameters are still ramping toward a profile.
    pub fn in_transition(&self) -> bool {
        self.pending.is_some()
    }

    pub fn engine(&self) -> &StabilizerEngine {
        &self.engine
    }

    fn adapt(&mut self) {
        let history = self.engine.transform_history();
        if history.len() < MIN_HISTORY_FOR_CLASSIFICATION {
            return;
        }

        let motion = self.classifier.classify(&history);
        if motion != self.previous_type {
            let profile = self.config.profile(motion).clone();
            info!(from = %self.previous_type, to = %motion, "motion regime changed");
            if self.previous_type == MotionType::Static {
                let target = profile.apply_to(self.engine.parameters());
                self.apply(target);
                self.pending = None;
            } else {
                self.pending = Some(profile);
            }
            self.previous_type = motion;
        }

        if let Some(profile) = self.pending.take() {
            let next = profile.step_from(self.engine.parameters(), self.config.transition_rate);
            let reached = profile.is_reached_by(&next);
            self.apply(next);
            if reached {
                debug!(regime = %motion, "profile transition complete");
            } else {
                self.pending = Some(profile);
            }
        }
    }

    fn apply(&mut self, params: StabilizationParameters) {
        if let Err(e) = self.engine.apply_parameters(params) {
            warn!("adaptive parameter update rejected: {e}");
        }
    }

    fn clear_adaptation(&mut self) {
        self.classifier.reset();
        self.previous_type = MotionType::Static;
        self.pending = None;
    }
}

impl Stabilize for AdaptiveStabilizer {
    fn initialize(
        &mut self,
        width: usize,
        height: usize,
        params: StabilizationParameters,
    ) -> Result<()> {
        AdaptiveStabilizer::initialize(self, width, height, params)
    }

    fn process_frame(&mut self, frame: &ImageBuffer) -> ImageBuffer {
        AdaptiveStabilizer::process_frame(self, frame)
    }

    fn update_parameters(&mut self, params: StabilizationParameters) -> Result<()> {
        AdaptiveStabilizer::update_parameters(self, params)
    }

    fn reset(&mut self) {
        AdaptiveStabilizer::reset(self)
    }

    fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    fn parameters(&self) -> StabilizationParameters {
        self.engine.parameters().clone()
    }

    fn transform_history(&self) -> Vec<Transform> {
        self.engine.transform_history()
    }

    fn performance_metrics(&self) -> PerformanceMetrics {
        self.engine.performance_metrics()
    }

    fn last_error(&self) -> Option<String> {
        self.engine.last_error()
    }
}
