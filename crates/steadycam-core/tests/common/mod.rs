#![allow(dead_code)]

use ndarray::Array2;

use steadycam_core::frame::ImageBuffer;
use steadycam_core::params::StabilizationParameters;
use steadycam_core::transform::Transform;

pub const WIDTH: usize = 160;
pub const HEIGHT: usize = 120;

/// Lattice spacing of the value-noise test scene (pixels).
const SPACING: f64 = 12.0;

/// Deterministic lattice value in [20, 235].
fn lattice(ix: i64, iy: i64) -> f64 {
    let mut h = ix
        .wrapping_mul(374_761_393)
        .wrapping_add(iy.wrapping_mul(668_265_263)) as u64;
    h = (h ^ (h >> 13)).wrapping_mul(1_274_126_177);
    h ^= h >> 16;
    20.0 + (h % 216) as f64
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

/// Smooth, richly textured intensity at any real position, 0-255 scale.
pub fn scene(x: f64, y: f64) -> f64 {
    let gx = x / SPACING;
    let gy = y / SPACING;
    let (ix, iy) = (gx.floor(), gy.floor());
    let fx = smoothstep(gx - ix);
    let fy = smoothstep(gy - iy);
    let (ix, iy) = (ix as i64, iy as i64);

    let v00 = lattice(ix, iy);
    let v10 = lattice(ix + 1, iy);
    let v01 = lattice(ix, iy + 1);
    let v11 = lattice(ix + 1, iy + 1);
    let top = v00 + (v10 - v00) * fx;
    let bottom = v01 + (v11 - v01) * fx;
    top + (bottom - top) * fy
}

/// Scene contents moved by (dx, dy), as a (height, width) array.
pub fn scene_array(width: usize, height: usize, dx: f64, dy: f64) -> Array2<u8> {
    Array2::from_shape_fn((height, width), |(r, c)| {
        scene(c as f64 - dx, r as f64 - dy).round().clamp(0.0, 255.0) as u8
    })
}

/// Scene in [0, 1] floats, for detector and flow tests.
pub fn scene_gray(width: usize, height: usize, dx: f64, dy: f64) -> Array2<f32> {
    scene_array(width, height, dx, dy).mapv(|v| v as f32 / 255.0)
}

/// Single-channel frame of the scene moved by (dx, dy).
pub fn gray_frame(dx: f64, dy: f64) -> ImageBuffer {
    ImageBuffer::from_gray(&scene_array(WIDTH, HEIGHT, dx, dy))
}

/// Opaque BGRA frame of the scene moved by (dx, dy).
pub fn bgra_frame(dx: f64, dy: f64) -> ImageBuffer {
    let gray = scene_array(WIDTH, HEIGHT, dx, dy);
    let mut data = Vec::with_capacity(WIDTH * HEIGHT * 4);
    for &v in gray.iter() {
        data.extend_from_slice(&[v, v, v, 255]);
    }
    ImageBuffer::new(WIDTH, HEIGHT, 4, data).unwrap()
}

/// Small, fast settings with a fixed feature target.
pub fn test_params() -> StabilizationParameters {
    StabilizationParameters {
        smoothing_radius: 10,
        feature_count: 100,
        adaptive_feature_min: 100,
        adaptive_feature_max: 100,
        min_distance: 8.0,
        optical_flow_window_size: 15,
        ..StabilizationParameters::default()
    }
}

/// Pure translations, one per entry of `dx`.
pub fn translations(dx: &[f64]) -> Vec<Transform> {
    dx.iter().map(|&x| Transform::from_translation(x, 0.0)).collect()
}
