//! Turns the transform history into the correction applied this frame.

use crate::params::StabilizationParameters;
use crate::transform::Transform;

/// Which smoothing variant to run, taken from the adaptive flags.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothingMode {
    /// Project translations onto the dominant direction before averaging.
    pub directional: bool,
    /// Let this fraction of the newest sample's deviation from the window
    /// mean through.
    pub high_pass: Option<f64>,
}

impl From<&StabilizationParameters> for SmoothingMode {
    fn from(p: &StabilizationParameters) -> Self {
        Self {
            directional: p.use_directional_smoothing,
            high_pass: p.use_high_pass_filter.then_some(p.high_pass_attenuation),
        }
    }
}

/// Smoothed transform for `history` (oldest first). Identity when empty.
pub fn smooth(history: &[Transform], mode: SmoothingMode) -> Transform {
    let Some(latest) = history.last() else {
        return Transform::identity();
    };

    let base = if mode.directional {
        directional_average(history)
    } else {
        Transform::average(history)
    };

    match mode.high_pass {
        Some(attenuation) => Transform::interpolate(&base, latest, attenuation),
        None => base,
    }
}

/// Window average whose translation keeps only the component along the mean
/// motion direction. Falls back to the plain average when there is no
/// dominant direction.
pub fn directional_average(history: &[Transform]) -> Transform {
    let mut avg = Transform::average(history);
    let norm = avg.tx.hypot(avg.ty);
    if norm < 1e-9 {
        return avg;
    }
    let (ux, uy) = (avg.tx / norm, avg.ty / norm);

    let along: f64 = history
        .iter()
        .map(|t| t.tx * ux + t.ty * uy)
        .sum::<f64>()
        / history.len() as f64;
    avg.tx = along * ux;
    avg.ty = along * uy;
    avg
}
