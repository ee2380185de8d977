//! Gaussian image pyramid for coarse-to-fine optical flow.

use ndarray::Array2;

use crate::consts::PYRAMID_BLUR_SIGMA;

/// Level 0 is the full-resolution image, each further level is blurred and
/// decimated by two.
#[derive(Clone, Debug)]
pub struct Pyramid {
    levels: Vec<Array2<f32>>,
}

impl Pyramid {
    /// Build up to `max_level` reduced levels. Reduction stops early once a
    /// level would be smaller than `min_size` in either dimension.
    pub fn build(image: &Array2<f32>, max_level: usize, min_size: usize) -> Self {
        let mut levels = Vec::with_capacity(max_level + 1);
        levels.push(image.clone());

        for _ in 0..max_level {
            let Some(last) = levels.last() else { break };
            let (h, w) = last.dim();
            if (h + 1) / 2 < min_size || (w + 1) / 2 < min_size {
                break;
            }
            let blurred = gaussian_blur(last, PYRAMID_BLUR_SIGMA);
            levels.push(downsample_2x(&blurred));
        }

        Self { levels }
    }

    /// Number of reduced levels (0 means only the base image).
    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, index: usize) -> &Array2<f32> {
        &self.levels[index]
    }

    pub fn base(&self) -> &Array2<f32> {
        &self.levels[0]
    }

    pub fn dim(&self) -> (usize, usize) {
        self.levels[0].dim()
    }
}

/// Separable Gaussian blur with replicated borders.
pub fn gaussian_blur(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    let kernel = make_gaussian_kernel(sigma);
    let row_pass = convolve_rows(data, &kernel);
    convolve_cols(&row_pass, &kernel)
}

fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let s2 = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-x * x / s2).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

fn convolve_rows(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;
    let mut result = Array2::<f32>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let src = (col as isize + ki as isize - radius).clamp(0, w as isize - 1) as usize;
                sum += data[[row, src]] * kv;
            }
            result[[row, col]] = sum;
        }
    }
    result
}

fn convolve_cols(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, w) = data.dim();
    let radius = kernel.len() as isize / 2;
    let mut result = Array2::<f32>::zeros((h, w));
    for row in 0..h {
        for (ki, &kv) in kernel.iter().enumerate() {
            let src = (row as isize + ki as isize - radius).clamp(0, h as isize - 1) as usize;
            for col in 0..w {
                result[[row, col]] += data[[src, col]] * kv;
            }
        }
    }
    result
}

/// Keep every other pixel in each direction.
fn downsample_2x(data: &Array2<f32>) -> Array2<f32> {
    let (h, w) = data.dim();
    let new_h = (h + 1) / 2;
    let new_w = (w + 1) / 2;
    Array2::from_shape_fn((new_h, new_w), |(r, c)| data[[r * 2, c * 2]])
}
