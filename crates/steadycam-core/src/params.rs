use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StabilizerError};

pub const SMOOTHING_RADIUS_RANGE: RangeInclusive<usize> = 1..=200;
pub const MAX_CORRECTION_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const FEATURE_COUNT_RANGE: RangeInclusive<usize> = 50..=2000;
pub const QUALITY_LEVEL_RANGE: RangeInclusive<f64> = 0.001..=0.1;
pub const MIN_DISTANCE_RANGE: RangeInclusive<f64> = 1.0..=200.0;
pub const BLOCK_SIZE_RANGE: RangeInclusive<usize> = 3..=31;
pub const HARRIS_K_RANGE: RangeInclusive<f64> = 0.01..=0.1;
pub const PYRAMID_LEVELS_RANGE: RangeInclusive<usize> = 2..=5;
pub const FLOW_WINDOW_RANGE: RangeInclusive<usize> = 5..=31;
pub const REFRESH_THRESHOLD_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const ADAPTIVE_FEATURE_RANGE: RangeInclusive<usize> = 100..=500;
pub const HIGH_PASS_ATTENUATION_RANGE: RangeInclusive<f64> = 0.0..=1.0;
pub const TRACKING_ERROR_RANGE: RangeInclusive<f64> = 0.0..=1000.0;
pub const RANSAC_THRESHOLD_RANGE: RangeInclusive<f64> = 0.1..=100.0;
pub const MIN_POINT_SPREAD_RANGE: RangeInclusive<f64> = 0.0..=1000.0;
pub const MAX_COORDINATE_RANGE: RangeInclusive<f64> = 1.0..=1_000_000.0;
pub const MAX_DISPLACEMENT_RANGE: RangeInclusive<f64> = 1.0..=10_000.0;

/// What to do with the empty border a warp exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Leave the constant-colour border in place.
    #[default]
    Padding,
    /// Cut out the border-free rectangle and stretch it to full size.
    Crop,
    /// Zoom uniformly about the centre until the border disappears.
    Scale,
}

impl fmt::Display for EdgeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Padding => write!(f, "padding"),
            Self::Crop => write!(f, "crop"),
            Self::Scale => write!(f, "scale"),
        }
    }
}

impl FromStr for EdgeMode {
    type Err = StabilizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "padding" => Ok(Self::Padding),
            "crop" => Ok(Self::Crop),
            "scale" => Ok(Self::Scale),
            other => Err(StabilizerError::InvalidParameters(format!(
                "unknown edge mode '{other}'"
            ))),
        }
    }
}

/// Every externally settable knob of the stabilizer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizationParameters {
    pub enabled: bool,
    /// Transforms averaged into the applied correction (frames).
    pub smoothing_radius: usize,
    /// Largest correction translation, as a percentage of frame size.
    pub max_correction: f64,
    /// Corners requested from each detection pass.
    pub feature_count: usize,
    /// Corner response cut-off relative to the strongest corner.
    pub quality_level: f64,
    /// Minimum spacing between accepted corners (pixels).
    pub min_distance: f64,
    /// Structure-tensor window (odd).
    pub block_size: usize,
    pub use_harris: bool,
    pub harris_k: f64,
    pub optical_flow_pyramid_levels: usize,
    /// Lucas-Kanade window (odd).
    pub optical_flow_window_size: usize,
    /// Survival ratio below which features are re-detected.
    pub feature_refresh_threshold: f64,
    pub adaptive_feature_min: usize,
    pub adaptive_feature_max: usize,
    pub use_high_pass_filter: bool,
    /// Fraction of the newest sample's deviation from the window mean that
    /// passes the high-pass smoother.
    pub high_pass_attenuation: f64,
    pub use_directional_smoothing: bool,
    /// Largest accepted per-point LK residual, 0-255 scale.
    pub tracking_error_threshold: f64,
    pub ransac_threshold_min: f64,
    pub ransac_threshold_max: f64,
    pub min_point_spread: f64,
    pub max_coordinate: f64,
    pub max_displacement: f64,
    pub edge_mode: EdgeMode,
}

impl Default for StabilizationParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing_radius: 30,
            max_correction: 30.0,
            feature_count: 500,
            quality_level: 0.01,
            min_distance: 30.0,
            block_size: 3,
            use_harris: false,
            harris_k: 0.04,
            optical_flow_pyramid_levels: 3,
            optical_flow_window_size: 21,
            feature_refresh_threshold: 0.5,
            adaptive_feature_min: 150,
            adaptive_feature_max: 500,
            use_high_pass_filter: false,
            high_pass_attenuation: 0.3,
            use_directional_smoothing: false,
            tracking_error_threshold: 50.0,
            ransac_threshold_min: 1.0,
            ransac_threshold_max: 10.0,
            min_point_spread: 10.0,
            max_coordinate: 100_000.0,
            max_displacement: 1000.0,
            edge_mode: EdgeMode::Padding,
        }
    }
}

impl StabilizationParameters {
    /// Low latency, aggressive correction for fast game footage.
    pub fn gaming() -> Self {
        Self {
            smoothing_radius: 25,
            max_correction: 40.0,
            feature_count: 150,
            quality_level: 0.015,
            min_distance: 25.0,
            feature_refresh_threshold: 0.6,
            adaptive_feature_min: 100,
            adaptive_feature_max: 400,
            ..Self::default()
        }
    }

    /// Balanced settings for live streaming.
    pub fn streaming() -> Self {
        Self {
            smoothing_radius: 30,
            max_correction: 30.0,
            feature_count: 200,
            quality_level: 0.01,
            min_distance: 30.0,
            feature_refresh_threshold: 0.5,
            adaptive_feature_min: 150,
            adaptive_feature_max: 500,
            ..Self::default()
        }
    }

    /// Heavy smoothing and dense tracking for offline recording.
    pub fn recording() -> Self {
        Self {
            smoothing_radius: 50,
            max_correction: 20.0,
            feature_count: 400,
            quality_level: 0.005,
            min_distance: 20.0,
            optical_flow_pyramid_levels: 4,
            optical_flow_window_size: 31,
            feature_refresh_threshold: 0.4,
            adaptive_feature_min: 200,
            adaptive_feature_max: 500,
            ..Self::default()
        }
    }
}

/// Named parameter presets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Gaming,
    #[default]
    Streaming,
    Recording,
}

impl Preset {
    pub fn parameters(self) -> StabilizationParameters {
        match self {
            Self::Gaming => StabilizationParameters::gaming(),
            Self::Streaming => StabilizationParameters::streaming(),
            Self::Recording => StabilizationParameters::recording(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaming => write!(f, "gaming"),
            Self::Streaming => write!(f, "streaming"),
            Self::Recording => write!(f, "recording"),
        }
    }
}

impl FromStr for Preset {
    type Err = StabilizerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gaming" => Ok(Self::Gaming),
            "streaming" => Ok(Self::Streaming),
            "recording" => Ok(Self::Recording),
            other => Err(StabilizerError::InvalidParameters(format!(
                "unknown preset '{other}'"
            ))),
        }
    }
}

/// Clamp every bounded field into range and force odd-only fields odd.
///
/// Out-of-range values are corrected, not rejected. The only failure is a
/// non-finite floating-point field, which has no meaningful clamp.
pub fn validate_parameters(params: &StabilizationParameters) -> Result<StabilizationParameters> {
    let floats = [
        ("max_correction", params.max_correction),
        ("quality_level", params.quality_level),
        ("min_distance", params.min_distance),
        ("harris_k", params.harris_k),
        ("feature_refresh_threshold", params.feature_refresh_threshold),
        ("high_pass_attenuation", params.high_pass_attenuation),
        ("tracking_error_threshold", params.tracking_error_threshold),
        ("ransac_threshold_min", params.ransac_threshold_min),
        ("ransac_threshold_max", params.ransac_threshold_max),
        ("min_point_spread", params.min_point_spread),
        ("max_coordinate", params.max_coordinate),
        ("max_displacement", params.max_displacement),
    ];
    if let Some((name, value)) = floats.iter().find(|(_, v)| !v.is_finite()) {
        return Err(StabilizerError::InvalidParameters(format!(
            "{name} is not finite ({value})"
        )));
    }

    let mut p = params.clone();

    p.smoothing_radius = clamp_range(p.smoothing_radius, &SMOOTHING_RADIUS_RANGE);
    p.max_correction = clamp_range(p.max_correction, &MAX_CORRECTION_RANGE);
    p.feature_count = clamp_range(p.feature_count, &FEATURE_COUNT_RANGE);
    p.quality_level = clamp_range(p.quality_level, &QUALITY_LEVEL_RANGE);
    p.min_distance = clamp_range(p.min_distance, &MIN_DISTANCE_RANGE);
    p.block_size = force_odd(clamp_range(p.block_size, &BLOCK_SIZE_RANGE), &BLOCK_SIZE_RANGE);
    p.harris_k = clamp_range(p.harris_k, &HARRIS_K_RANGE);
    p.optical_flow_pyramid_levels =
        clamp_range(p.optical_flow_pyramid_levels, &PYRAMID_LEVELS_RANGE);
    p.optical_flow_window_size = force_odd(
        clamp_range(p.optical_flow_window_size, &FLOW_WINDOW_RANGE),
        &FLOW_WINDOW_RANGE,
    );
    p.feature_refresh_threshold =
        clamp_range(p.feature_refresh_threshold, &REFRESH_THRESHOLD_RANGE);

    p.adaptive_feature_min = clamp_range(p.adaptive_feature_min, &ADAPTIVE_FEATURE_RANGE);
    p.adaptive_feature_max = clamp_range(p.adaptive_feature_max, &ADAPTIVE_FEATURE_RANGE);
    if p.adaptive_feature_min > p.adaptive_feature_max {
        std::mem::swap(&mut p.adaptive_feature_min, &mut p.adaptive_feature_max);
    }

    p.high_pass_attenuation = clamp_range(p.high_pass_attenuation, &HIGH_PASS_ATTENUATION_RANGE);
    p.tracking_error_threshold = clamp_range(p.tracking_error_threshold, &TRACKING_ERROR_RANGE);

    p.ransac_threshold_min = clamp_range(p.ransac_threshold_min, &RANSAC_THRESHOLD_RANGE);
    p.ransac_threshold_max = clamp_range(p.ransac_threshold_max, &RANSAC_THRESHOLD_RANGE);
    if p.ransac_threshold_min > p.ransac_threshold_max {
        std::mem::swap(&mut p.ransac_threshold_min, &mut p.ransac_threshold_max);
    }

    p.min_point_spread = clamp_range(p.min_point_spread, &MIN_POINT_SPREAD_RANGE);
    p.max_coordinate = clamp_range(p.max_coordinate, &MAX_COORDINATE_RANGE);
    p.max_displacement = clamp_range(p.max_displacement, &MAX_DISPLACEMENT_RANGE);

    Ok(p)
}

fn clamp_range<T: PartialOrd + Copy>(value: T, range: &RangeInclusive<T>) -> T {
    if value < *range.start() {
        *range.start()
    } else if value > *range.end() {
        *range.end()
    } else {
        value
    }
}

/// Bump an even value to the next odd one, stepping down if that would
/// leave the range.
fn force_odd(value: usize, range: &RangeInclusive<usize>) -> usize {
    if value % 2 == 1 {
        value
    } else if value < *range.end() {
        value + 1
    } else {
        value - 1
    }
}
