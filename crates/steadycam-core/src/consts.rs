/// Smallest width or height the engine will process.
pub const MIN_IMAGE_SIZE: usize = 32;

/// Largest supported frame width (8K UHD).
pub const MAX_FRAME_WIDTH: usize = 7680;

/// Largest supported frame height (8K UHD).
pub const MAX_FRAME_HEIGHT: usize = 4320;

/// ITU-R BT.601 luminance coefficient for the red channel.
pub const LUMINANCE_R: f32 = 0.299;

/// ITU-R BT.601 luminance coefficient for the green channel.
pub const LUMINANCE_G: f32 = 0.587;

/// ITU-R BT.601 luminance coefficient for the blue channel.
pub const LUMINANCE_B: f32 = 0.114;

/// Upper bound on corners returned by a single detection pass.
pub const MAX_CORNERS: usize = 1000;

/// Fewest point pairs a similarity fit will accept.
pub const MIN_POINT_PAIRS: usize = 4;

/// Gaussian sigma applied before each pyramid decimation.
pub const PYRAMID_BLUR_SIGMA: f32 = 1.0;

/// Lucas-Kanade iteration cap per pyramid level.
pub const FLOW_MAX_ITERATIONS: usize = 30;

/// Lucas-Kanade convergence threshold (pixels).
pub const FLOW_EPSILON: f32 = 0.01;

/// Minimum eigenvalue of the LK Hessian, divided by the window area, before
/// a point is considered untrackable. Intensities are in [0, 1].
pub const FLOW_MIN_EIGEN_THRESHOLD: f32 = 1e-6;

/// Fraction of the point-cloud standard deviation used as the RANSAC threshold
/// before clamping to the configured bounds.
pub const RANSAC_THRESHOLD_FACTOR: f64 = 0.01;

/// RANSAC confidence used for the adaptive iteration count.
pub const RANSAC_CONFIDENCE: f64 = 0.99;

/// Hard cap on RANSAC iterations.
pub const RANSAC_MAX_ITERATIONS: usize = 500;

/// Largest admissible |a|, |b|, |c| or |d| in an estimated transform.
pub const MAX_LINEAR_COMPONENT: f64 = 100.0;

/// Largest admissible translation magnitude in an estimated transform.
pub const MAX_TRANSLATION_MAGNITUDE: f64 = 2000.0;

/// Scale range for a transform to count as reasonable.
pub const REASONABLE_SCALE_MIN: f64 = 0.5;
pub const REASONABLE_SCALE_MAX: f64 = 2.0;

/// Largest |tx| or |ty| for a transform to count as reasonable.
pub const REASONABLE_TRANSLATION_MAX: f64 = 100.0;

/// Determinant magnitude below which a transform is treated as singular.
pub const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Largest zoom factor the Scale edge mode will apply.
pub const MAX_EDGE_SCALE: f64 = 2.0;

/// Feature target growth factor after a refresh or tracking failure.
pub const FEATURE_TARGET_GROWTH: f64 = 1.25;

/// Feature target decay factor while tracking is healthy.
pub const FEATURE_TARGET_DECAY: f64 = 0.95;

/// Survival ratio at which the feature target starts to decay.
pub const HEALTHY_SURVIVAL_RATIO: f64 = 0.95;

/// Default number of transforms the motion classifier looks at.
pub const DEFAULT_CLASSIFIER_WINDOW: usize = 30;

/// History length required before the adaptive controller reclassifies.
pub const MIN_HISTORY_FOR_CLASSIFICATION: usize = 5;

/// Samples required before the high-frequency ratio is computed.
pub const MIN_SAMPLES_FOR_FREQUENCY: usize = 6;

/// Norm below which a motion vector is ignored for consistency.
pub const MIN_VECTOR_NORM: f64 = 0.001;

/// Directional variance limit for the pan/zoom regime.
pub const PAN_DIRECTIONAL_VARIANCE_MAX: f64 = 2.0;

/// Weight of |scale - 1| in the motion magnitude.
pub const SCALE_MAGNITUDE_WEIGHT: f64 = 100.0;

/// Weight of |rotation| (radians) in the motion magnitude.
pub const ROTATION_MAGNITUDE_WEIGHT: f64 = 200.0;
