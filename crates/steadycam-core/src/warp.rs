use crate::error::{Result, StabilizerError};
use crate::frame::ImageBuffer;
use crate::transform::Transform;

/// How samples outside the source image are filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Border {
    /// Zero in every channel.
    Constant,
    /// Nearest edge pixel.
    Replicate,
}

/// Warp `frame` so that source pixel `p` lands at `transform.apply(p)`.
///
/// Output has the same size and channel count as the input, tightly packed.
/// Uncovered pixels are zero.
pub fn warp_affine(frame: &ImageBuffer, transform: &Transform) -> Result<ImageBuffer> {
    let inverse = transform.invert().ok_or_else(|| {
        StabilizerError::TransformApplication(format!("singular warp {transform}"))
    })?;
    Ok(remap(
        frame,
        frame.width(),
        frame.height(),
        Border::Constant,
        |x, y| inverse.apply(x, y),
    ))
}

/// Build an `out_w` x `out_h` image whose pixel (x, y) is the bilinear
/// sample of `frame` at `map(x, y)`.
pub fn remap(
    frame: &ImageBuffer,
    out_w: usize,
    out_h: usize,
    border: Border,
    map: impl Fn(f64, f64) -> (f64, f64),
) -> ImageBuffer {
    let channels = frame.channels();
    let mut out = vec![0u8; out_w * out_h * channels];
    let mut px = [0f32; 4];

    for row in 0..out_h {
        for col in 0..out_w {
            let (sx, sy) = map(col as f64, row as f64);
            if !bilinear_pixel(frame, sx, sy, border, &mut px[..channels]) {
                continue;
            }
            let base = (row * out_w + col) * channels;
            for (ch, &v) in px[..channels].iter().enumerate() {
                out[base + ch] = v.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    ImageBuffer::from_raw_parts(out_w, out_h, channels, out_w * channels, out)
}

/// Sample every channel at (x, y). Returns false when the position is
/// entirely outside a constant-bordered image.
fn bilinear_pixel(frame: &ImageBuffer, x: f64, y: f64, border: Border, out: &mut [f32]) -> bool {
    let (w, h) = (frame.width() as i64, frame.height() as i64);
    if !x.is_finite() || !y.is_finite() {
        return false;
    }
    if border == Border::Constant && (x <= -1.0 || y <= -1.0 || x >= w as f64 || y >= h as f64) {
        return false;
    }

    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let fetch = |r: i64, c: i64, ch: usize| -> f32 {
        match border {
            Border::Constant => {
                if r >= 0 && r < h && c >= 0 && c < w {
                    frame.pixel(r as usize, c as usize, ch) as f32
                } else {
                    0.0
                }
            }
            Border::Replicate => {
                frame.pixel(r.clamp(0, h - 1) as usize, c.clamp(0, w - 1) as usize, ch) as f32
            }
        }
    };

    for (ch, v) in out.iter_mut().enumerate() {
        let v00 = fetch(y0, x0, ch);
        let v10 = fetch(y0, x0 + 1, ch);
        let v01 = fetch(y0 + 1, x0, ch);
        let v11 = fetch(y0 + 1, x0 + 1, ch);
        *v = v00 * (1.0 - fx) * (1.0 - fy)
            + v10 * fx * (1.0 - fy)
            + v01 * (1.0 - fx) * fy
            + v11 * fx * fy;
    }
    true
}
