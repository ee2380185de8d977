//! Border handling after the stabilizing warp.

use tracing::warn;

use crate::consts::{MAX_EDGE_SCALE, MIN_IMAGE_SIZE};
use crate::frame::ImageBuffer;
use crate::params::EdgeMode;
use crate::transform::Transform;
use crate::warp::{remap, Border};

/// Axis-aligned rectangle in pixel coordinates, inclusive of both edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn width(&self) -> f64 {
        self.right - self.left + 1.0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top + 1.0
    }

    fn covers_frame(&self, width: usize, height: usize) -> bool {
        self.left <= 0.5
            && self.top <= 0.5
            && self.right >= width as f64 - 1.5
            && self.bottom >= height as f64 - 1.5
    }
}

/// Largest axis-aligned rectangle, bounded by the mapped frame corners, that
/// the warp by `correction` fills with image content.
pub fn border_free_rect(correction: &Transform, width: usize, height: usize) -> Rect {
    let (w, h) = ((width - 1) as f64, (height - 1) as f64);
    let tl = correction.apply(0.0, 0.0);
    let tr = correction.apply(w, 0.0);
    let bl = correction.apply(0.0, h);
    let br = correction.apply(w, h);

    Rect {
        left: tl.0.max(bl.0).max(0.0),
        top: tl.1.max(tr.1).max(0.0),
        right: tr.0.min(br.0).min(w),
        bottom: bl.1.min(br.1).min(h),
    }
}

/// Zoom about the frame centre that keeps `rect` filling the output.
/// `None` when the centre itself is not covered.
pub fn scale_to_fill(rect: &Rect, width: usize, height: usize) -> Option<f64> {
    let cx = (width - 1) as f64 * 0.5;
    let cy = (height - 1) as f64 * 0.5;
    let spans = [cx - rect.left, rect.right - cx, cy - rect.top, rect.bottom - cy];
    if spans.iter().any(|&s| s <= 0.0) {
        return None;
    }
    let scale = [cx / spans[0], cx / spans[1], cy / spans[2], cy / spans[3]]
        .into_iter()
        .fold(1.0f64, f64::max);
    Some(scale.min(MAX_EDGE_SCALE))
}

/// Remove or hide the border exposed by warping with `correction`.
pub fn apply_edge_mode(warped: ImageBuffer, correction: &Transform, mode: EdgeMode) -> ImageBuffer {
    if mode == EdgeMode::Padding {
        return warped;
    }

    let (w, h) = (warped.width(), warped.height());
    let rect = border_free_rect(correction, w, h);
    if rect.covers_frame(w, h) {
        return warped;
    }
    if rect.width() < MIN_IMAGE_SIZE as f64 || rect.height() < MIN_IMAGE_SIZE as f64 {
        warn!(?rect, %mode, "border-free area too small, keeping padding");
        return warped;
    }

    match mode {
        EdgeMode::Padding => warped,
        EdgeMode::Crop => {
            let sx = (rect.right - rect.left) / (w - 1) as f64;
            let sy = (rect.bottom - rect.top) / (h - 1) as f64;
            remap(&warped, w, h, Border::Replicate, |x, y| {
                (rect.left + x * sx, rect.top + y * sy)
            })
        }
        EdgeMode::Scale => {
            let Some(scale) = scale_to_fill(&rect, w, h) else {
                warn!(?rect, "frame centre not covered, keeping padding");
                return warped;
            };
            let cx = (w - 1) as f64 * 0.5;
            let cy = (h - 1) as f64 * 0.5;
            remap(&warped, w, h, Border::Replicate, |x, y| {
                (cx + (x - cx) / scale, cy + (y - cy) / scale)
            })
        }
    }
}
