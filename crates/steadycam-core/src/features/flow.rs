//! Pyramidal Lucas-Kanade sparse optical flow.
//!
//! Each point is tracked coarse-to-fine. At every level the template patch
//! and its gradients come from the previous image and stay fixed, so the
//! 2x2 Hessian is computed once per level and each iteration only resamples
//! the current image.

use ndarray::Array2;

use crate::consts::{FLOW_EPSILON, FLOW_MAX_ITERATIONS, FLOW_MIN_EIGEN_THRESHOLD};
use crate::params::StabilizationParameters;

use super::pyramid::Pyramid;
use super::Point;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackStatus {
    Tracked,
    /// Untrackable texture or a diverged solution.
    Lost,
    /// The solution left the image.
    OutOfBounds,
}

#[derive(Clone, Copy, Debug)]
pub struct TrackedPoint {
    pub point: Point,
    pub status: TrackStatus,
    /// Mean absolute patch residual at full resolution, on a 0-255 scale.
    pub error: f32,
}

impl TrackedPoint {
    pub fn is_tracked(&self) -> bool {
        self.status == TrackStatus::Tracked
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LucasKanadeTracker {
    /// Patch side length (odd).
    pub window_size: usize,
    /// Coarsest pyramid level used.
    pub max_level: usize,
    pub max_iterations: usize,
    /// Stop iterating once an update is shorter than this (pixels).
    pub epsilon: f32,
}

impl Default for LucasKanadeTracker {
    fn default() -> Self {
        Self::from(&StabilizationParameters::default())
    }
}

impl From<&StabilizationParameters> for LucasKanadeTracker {
    fn from(p: &StabilizationParameters) -> Self {
        Self {
            window_size: p.optical_flow_window_size,
            max_level: p.optical_flow_pyramid_levels,
            max_iterations: FLOW_MAX_ITERATIONS,
            epsilon: FLOW_EPSILON,
        }
    }
}

impl LucasKanadeTracker {
    /// Track `points` from `prev` into `curr`. Returns one entry per input
    /// point, in order.
    pub fn track(&self, prev: &Pyramid, curr: &Pyramid, points: &[Point]) -> Vec<TrackedPoint> {
        let levels = self.max_level.min(prev.max_level()).min(curr.max_level());
        points
            .iter()
            .map(|p| self.track_point(prev, curr, *p, levels))
            .collect()
    }

    fn track_point(
        &self,
        prev: &Pyramid,
        curr: &Pyramid,
        point: Point,
        levels: usize,
    ) -> TrackedPoint {
        let lost = |status| TrackedPoint {
            point,
            status,
            error: f32::MAX,
        };
        let half = (self.window_size / 2) as isize;

        let mut guess = (0.0f32, 0.0f32);
        for level in (0..=levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let (px, py) = (point.x * scale, point.y * scale);
            let prev_img = prev.level(level);
            let curr_img = curr.level(level);

            let Some(patch) = Patch::sample(prev_img, px, py, half) else {
                // Coarse levels may blur texture away; only level 0 decides.
                if level == 0 {
                    return lost(TrackStatus::Lost);
                }
                guess = (guess.0 * 2.0, guess.1 * 2.0);
                continue;
            };

            let mut d = guess;
            let (h, w) = curr_img.dim();
            for _ in 0..self.max_iterations {
                let (mut bx, mut by) = (0.0f32, 0.0f32);
                for (i, (dx, dy)) in window_offsets(half).enumerate() {
                    let j = sample_clamped(curr_img, px + d.0 + dx, py + d.1 + dy);
                    let diff = patch.values[i] - j;
                    bx += diff * patch.grad_x[i];
                    by += diff * patch.grad_y[i];
                }
                let (ux, uy) = patch.solve(bx, by);
                d.0 += ux;
                d.1 += uy;

                if !d.0.is_finite() || !d.1.is_finite() {
                    return lost(TrackStatus::Lost);
                }
                let (nx, ny) = (px + d.0, py + d.1);
                let margin = half as f32;
                if nx < -margin
                    || ny < -margin
                    || nx > w as f32 + margin
                    || ny > h as f32 + margin
                {
                    return lost(TrackStatus::OutOfBounds);
                }
                if ux * ux + uy * uy < self.epsilon * self.epsilon {
                    break;
                }
            }

            guess = if level > 0 { (d.0 * 2.0, d.1 * 2.0) } else { d };
        }

        let tracked = Point::new(point.x + guess.0, point.y + guess.1);
        let (h, w) = curr.dim();
        if !tracked.in_bounds(w, h) {
            return TrackedPoint {
                point: tracked,
                status: TrackStatus::OutOfBounds,
                error: f32::MAX,
            };
        }

        TrackedPoint {
            point: tracked,
            status: TrackStatus::Tracked,
            error: patch_error(prev.base(), curr.base(), point, tracked, half),
        }
    }
}

/// Template intensities and gradients around one point, with the inverse
/// Hessian they imply.
struct Patch {
    values: Vec<f32>,
    grad_x: Vec<f32>,
    grad_y: Vec<f32>,
    inv: [f32; 3],
}

impl Patch {
    /// `None` when the patch has too little texture to solve for motion.
    fn sample(img: &Array2<f32>, x: f32, y: f32, half: isize) -> Option<Self> {
        let n = ((2 * half + 1) * (2 * half + 1)) as usize;
        let mut values = Vec::with_capacity(n);
        let mut grad_x = Vec::with_capacity(n);
        let mut grad_y = Vec::with_capacity(n);
        let (mut gxx, mut gxy, mut gyy) = (0.0f32, 0.0f32, 0.0f32);

        for (dx, dy) in window_offsets(half) {
            let (sx, sy) = (x + dx, y + dy);
            let ix = (sample_clamped(img, sx + 1.0, sy) - sample_clamped(img, sx - 1.0, sy)) * 0.5;
            let iy = (sample_clamped(img, sx, sy + 1.0) - sample_clamped(img, sx, sy - 1.0)) * 0.5;
            values.push(sample_clamped(img, sx, sy));
            grad_x.push(ix);
            grad_y.push(iy);
            gxx += ix * ix;
            gxy += ix * iy;
            gyy += iy * iy;
        }

        let half_trace = (gxx + gyy) * 0.5;
        let diff = (gxx - gyy) * 0.5;
        let min_eig = half_trace - (diff * diff + gxy * gxy).sqrt();
        if min_eig.is_nan() || min_eig / (n as f32) < FLOW_MIN_EIGEN_THRESHOLD {
            return None;
        }

        let det = gxx * gyy - gxy * gxy;
        if det <= 0.0 {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self {
            values,
            grad_x,
            grad_y,
            inv: [gyy * inv_det, -gxy * inv_det, gxx * inv_det],
        })
    }

    fn solve(&self, bx: f32, by: f32) -> (f32, f32) {
        let [a, b, c] = self.inv;
        (a * bx + b * by, b * bx + c * by)
    }
}

fn window_offsets(half: isize) -> impl Iterator<Item = (f32, f32)> {
    (-half..=half).flat_map(move |dy| (-half..=half).map(move |dx| (dx as f32, dy as f32)))
}

/// Mean absolute difference between the patch around `from` in `prev` and
/// the patch around `to` in `curr`, scaled to 0-255.
fn patch_error(
    prev: &Array2<f32>,
    curr: &Array2<f32>,
    from: Point,
    to: Point,
    half: isize,
) -> f32 {
    let mut sum = 0.0f32;
    let mut n = 0usize;
    for (dx, dy) in window_offsets(half) {
        let a = sample_clamped(prev, from.x + dx, from.y + dy);
        let b = sample_clamped(curr, to.x + dx, to.y + dy);
        sum += (a - b).abs();
        n += 1;
    }
    sum / n as f32 * 255.0
}

/// Bilinear sample with coordinates clamped to the image.
pub fn sample_clamped(img: &Array2<f32>, x: f32, y: f32) -> f32 {
    let (h, w) = img.dim();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);
    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    img[[y0, x0]] * (1.0 - fx) * (1.0 - fy)
        + img[[y0, x1]] * fx * (1.0 - fy)
        + img[[y1, x0]] * (1.0 - fx) * fy
        + img[[y1, x1]] * fx * fy
}
