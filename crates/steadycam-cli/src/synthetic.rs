//! Procedural test footage: a smooth value-noise landscape viewed through a
//! moving camera.

use clap::ValueEnum;
use steadycam_core::error::Result;
use steadycam_core::frame::ImageBuffer;

const CELL: f64 = 16.0;

/// Camera motion applied to the synthetic scene.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MotionPattern {
    /// Locked-off camera
    Static,
    /// Steady horizontal pan, 8 px per frame
    Pan,
    /// Handheld jitter alternating large and small jumps
    Shake,
}

impl MotionPattern {
    /// Scene offset of frame `index`.
    pub fn offset(self, index: usize) -> (f64, f64) {
        match self {
            Self::Static => (0.0, 0.0),
            Self::Pan => (8.0 * index as f64, 0.0),
            Self::Shake => {
                const JITTER: [(f64, f64); 4] = [(0.0, 0.0), (12.0, 3.0), (10.0, 1.0), (-2.0, -2.0)];
                JITTER[index % JITTER.len()]
            }
        }
    }
}

fn hash(x: i64, y: i64, seed: u64) -> f64 {
    let mut h = (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        ^ seed;
    h ^= h >> 29;
    h = h.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h ^= h >> 32;
    (h % 1024) as f64 / 1023.0
}

fn value_noise(x: f64, y: f64, seed: u64) -> f64 {
    let (gx, gy) = (x / CELL, y / CELL);
    let (x0, y0) = (gx.floor(), gy.floor());
    let ease = |t: f64| t * t * (3.0 - 2.0 * t);
    let (fx, fy) = (ease(gx - x0), ease(gy - y0));
    let (ix, iy) = (x0 as i64, y0 as i64);

    let top = hash(ix, iy, seed) * (1.0 - fx) + hash(ix + 1, iy, seed) * fx;
    let bottom = hash(ix, iy + 1, seed) * (1.0 - fx) + hash(ix + 1, iy + 1, seed) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// BGR frame of the scene shifted by `(dx, dy)`.
pub fn bgr_frame(width: usize, height: usize, dx: f64, dy: f64) -> Result<ImageBuffer> {
    let mut data = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let (x, y) = (col as f64 - dx, row as f64 - dy);
            let base = value_noise(x, y, 1) * 0.8 + value_noise(x * 2.0, y * 2.0, 2) * 0.2;
            let luma = 24.0 + base * 208.0;
            data.push((luma * 0.85).round() as u8);
            data.push(luma.round() as u8);
            data.push((luma * 0.95 + 10.0).min(255.0).round() as u8);
        }
    }
    ImageBuffer::new(width, height, 3, data)
}
