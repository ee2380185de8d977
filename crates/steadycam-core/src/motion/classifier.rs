//! Motion regime classification from a window of recent transforms.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::consts::{
    DEFAULT_CLASSIFIER_WINDOW, MIN_SAMPLES_FOR_FREQUENCY, MIN_VECTOR_NORM,
    PAN_DIRECTIONAL_VARIANCE_MAX, ROTATION_MAGNITUDE_WEIGHT, SCALE_MAGNITUDE_WEIGHT,
};
use crate::transform::Transform;

const STATIC_THRESHOLD: f64 = 6.0;
const SLOW_THRESHOLD: f64 = 15.0;
const FAST_THRESHOLD: f64 = 40.0;
const VARIANCE_THRESHOLD: f64 = 3.0;
const HIGH_FREQ_THRESHOLD: f64 = 0.70;
const CONSISTENCY_THRESHOLD: f64 = 0.96;
const MAX_SENSITIVITY: f64 = 100.0;
const MAX_MAGNITUDE_THRESHOLD: f64 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MotionType {
    #[default]
    Static,
    SlowMotion,
    FastMotion,
    CameraShake,
    PanZoom,
}

impl MotionType {
    pub const ALL: [MotionType; 5] = [
        Self::Static,
        Self::SlowMotion,
        Self::FastMotion,
        Self::CameraShake,
        Self::PanZoom,
    ];
}

impl fmt::Display for MotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => write!(f, "Static"),
            Self::SlowMotion => write!(f, "Slow Motion"),
            Self::FastMotion => write!(f, "Fast Motion"),
            Self::CameraShake => write!(f, "Camera Shake"),
            Self::PanZoom => write!(f, "Pan/Zoom"),
        }
    }
}

/// Aggregate statistics over the classification window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionMetrics {
    pub mean_magnitude: f64,
    pub magnitude_variance: f64,
    pub directional_variance: f64,
    /// Mean cosine similarity between consecutive translations.
    pub consistency: f64,
    /// Share of magnitude energy in the second difference.
    pub high_frequency_ratio: f64,
    pub sample_count: usize,
}

/// Sensitivity-scaled decision thresholds.
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds {
    pub static_motion: f64,
    pub slow_motion: f64,
    pub fast_motion: f64,
    pub variance: f64,
    pub high_frequency: f64,
    pub consistency: f64,
}

impl Thresholds {
    /// Scale the base thresholds by `sensitivity`, clamping magnitudes to
    /// [0, 100] and ratios to [0, 1].
    pub fn scaled(sensitivity: f64) -> Self {
        let s = sensitivity;
        Self {
            static_motion: audit("static", STATIC_THRESHOLD * s, 0.0, MAX_MAGNITUDE_THRESHOLD),
            slow_motion: audit("slow", SLOW_THRESHOLD * s, 0.0, MAX_MAGNITUDE_THRESHOLD),
            fast_motion: audit("fast", FAST_THRESHOLD * s, 0.0, MAX_MAGNITUDE_THRESHOLD),
            variance: audit("variance", VARIANCE_THRESHOLD * s, 0.0, MAX_MAGNITUDE_THRESHOLD),
            high_frequency: audit("high_frequency", HIGH_FREQ_THRESHOLD * s, 0.0, 1.0),
            consistency: audit("consistency", CONSISTENCY_THRESHOLD / s, 0.0, 1.0),
        }
    }
}

fn audit(name: &str, value: f64, min: f64, max: f64) -> f64 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        warn!(threshold = name, value, clamped, "classifier threshold clamped");
    }
    clamped
}

/// Classifies the motion regime of a transform history.
#[derive(Clone, Debug)]
pub struct MotionClassifier {
    window_size: usize,
    sensitivity: f64,
    current_type: MotionType,
    current_metrics: MotionMetrics,
}

impl Default for MotionClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_CLASSIFIER_WINDOW, 1.0)
    }
}

impl MotionClassifier {
    pub fn new(window_size: usize, sensitivity: f64) -> Self {
        Self {
            window_size: window_size.max(1),
            sensitivity: sanitize_sensitivity(sensitivity),
            current_type: MotionType::Static,
            current_metrics: MotionMetrics::default(),
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.sensitivity = sanitize_sensitivity(sensitivity);
    }

    pub fn current_type(&self) -> MotionType {
        self.current_type
    }

    pub fn current_metrics(&self) -> &MotionMetrics {
        &self.current_metrics
    }

    /// Classify `history` and remember the result.
    pub fn classify(&mut self, history: &[Transform]) -> MotionType {
        let metrics = self.metrics(history);
        let motion = self.classify_metrics(&metrics);
        self.current_metrics = metrics;
        self.current_type = motion;
        motion
    }

    /// Statistics over the newest `window_size` entries of `history`.
    pub fn metrics(&self, history: &[Transform]) -> MotionMetrics {
        let start = history.len().saturating_sub(self.window_size);
        let window = &history[start..];
        if window.is_empty() {
            return MotionMetrics::default();
        }

        let magnitudes: Vec<f64> = window.iter().map(motion_magnitude).collect();
        let (mean, variance) = mean_variance(&magnitudes);

        let xs: Vec<f64> = window.iter().map(|t| t.tx).collect();
        let ys: Vec<f64> = window.iter().map(|t| t.ty).collect();
        let directional_variance = (mean_variance(&xs).1 + mean_variance(&ys).1).sqrt();

        MotionMetrics {
            mean_magnitude: mean,
            magnitude_variance: variance,
            directional_variance,
            consistency: consistency(window),
            high_frequency_ratio: high_frequency_ratio(&magnitudes),
            sample_count: window.len(),
        }
    }

    /// Apply the ordered threshold rules; first match wins.
    pub fn classify_metrics(&self, m: &MotionMetrics) -> MotionType {
        if m.sample_count == 0 {
            return MotionType::Static;
        }
        let t = Thresholds::scaled(self.sensitivity);

        if m.mean_magnitude < t.static_motion && m.magnitude_variance < t.variance {
            return MotionType::Static;
        }
        if m.high_frequency_ratio > t.high_frequency {
            return MotionType::CameraShake;
        }
        if m.mean_magnitude >= t.slow_motion && m.mean_magnitude < t.fast_motion {
            return MotionType::FastMotion;
        }
        if m.mean_magnitude >= t.static_motion && m.mean_magnitude < t.slow_motion {
            if m.consistency > t.consistency
                && m.directional_variance < PAN_DIRECTIONAL_VARIANCE_MAX
            {
                return MotionType::PanZoom;
            }
            return MotionType::SlowMotion;
        }
        MotionType::SlowMotion
    }

    pub fn reset(&mut self) {
        self.current_type = MotionType::Static;
        self.current_metrics = MotionMetrics::default();
    }
}

fn sanitize_sensitivity(sensitivity: f64) -> f64 {
    if sensitivity.is_nan() || sensitivity <= 0.0 {
        error!(sensitivity, "motion sensitivity must be positive, using 1.0");
        1.0
    } else if sensitivity > MAX_SENSITIVITY {
        warn!(sensitivity, "motion sensitivity clamped to {MAX_SENSITIVITY}");
        MAX_SENSITIVITY
    } else {
        sensitivity
    }
}

/// Weighted composite of translation, scale change and rotation.
pub fn motion_magnitude(t: &Transform) -> f64 {
    t.translation_magnitude()
        + SCALE_MAGNITUDE_WEIGHT * (t.scale() - 1.0).abs()
        + ROTATION_MAGNITUDE_WEIGHT * t.rotation().abs()
}

/// Mean and population variance; variance is 0 below two samples.
fn mean_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (mean, 0.0);
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}

fn consistency(window: &[Transform]) -> f64 {
    match window.len() {
        0 => return 0.0,
        1 => return 1.0,
        _ => {}
    }
    let mut sum = 0.0;
    let mut pairs = 0usize;
    for pair in window.windows(2) {
        let (x0, y0) = pair[0].translation();
        let (x1, y1) = pair[1].translation();
        let n0 = x0.hypot(y0);
        let n1 = x1.hypot(y1);
        if n0 > MIN_VECTOR_NORM && n1 > MIN_VECTOR_NORM {
            sum += (x0 * x1 + y0 * y1) / (n0 * n1);
            pairs += 1;
        }
    }
    if pairs == 0 {
        0.0
    } else {
        sum / pairs as f64
    }
}

fn high_frequency_ratio(magnitudes: &[f64]) -> f64 {
    if magnitudes.len() < MIN_SAMPLES_FOR_FREQUENCY {
        return 0.0;
    }
    let (mut high, mut low) = (0.0, 0.0);
    for w in magnitudes.windows(3) {
        high += (w[2] - 2.0 * w[1] + w[0]).abs();
        low += (w[2] - w[0]).abs() * 0.5;
    }
    let total = high + low;
    if total > 0.001 {
        high / total
    } else {
        0.0
    }
}
