//! Corner detection: Shi-Tomasi minimum eigenvalue or Harris response,
//! quality cut-off, non-maximum suppression, minimum-distance thinning and
//! sub-pixel refinement.

use ndarray::Array2;

use crate::consts::{MAX_CORNERS, MIN_IMAGE_SIZE, MIN_POINT_PAIRS};
use crate::error::{Result, StabilizerError};
use crate::params::StabilizationParameters;

use super::Point;

/// Detection settings, normally derived from [`StabilizationParameters`].
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorConfig {
    pub max_corners: usize,
    pub quality_level: f64,
    pub min_distance: f64,
    pub block_size: usize,
    pub use_harris: bool,
    pub harris_k: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::from(&StabilizationParameters::default())
    }
}

impl From<&StabilizationParameters> for DetectorConfig {
    fn from(p: &StabilizationParameters) -> Self {
        Self {
            max_corners: p.feature_count,
            quality_level: p.quality_level,
            min_distance: p.min_distance,
            block_size: p.block_size,
            use_harris: p.use_harris,
            harris_k: p.harris_k,
        }
    }
}

impl DetectorConfig {
    pub fn with_max_corners(mut self, max_corners: usize) -> Self {
        self.max_corners = max_corners;
        self
    }
}

/// Find up to `config.max_corners` (capped at [`MAX_CORNERS`]) corners in a
/// grayscale image, strongest first.
///
/// Fails when the image is smaller than the minimum practical size or fewer
/// than four corners survive.
pub fn detect(gray: &Array2<f32>, config: &DetectorConfig) -> Result<Vec<Point>> {
    let (h, w) = gray.dim();
    if h < MIN_IMAGE_SIZE || w < MIN_IMAGE_SIZE {
        return Err(StabilizerError::InvalidDimensions {
            width: w,
            height: h,
        });
    }

    let max_corners = config.max_corners.clamp(1, MAX_CORNERS);
    let block = config.block_size.max(3) | 1;
    let response = corner_response(gray, block, config.use_harris, config.harris_k);

    let max_response = response.iter().fold(0.0f32, |m, &v| m.max(v));
    if max_response <= 0.0 {
        return Err(StabilizerError::FeatureDetection {
            found: 0,
            required: MIN_POINT_PAIRS,
        });
    }
    let threshold = (config.quality_level as f32 * max_response).max(f32::MIN_POSITIVE);

    let margin = block / 2 + 1;
    let mut candidates = Vec::new();
    for r in margin..h.saturating_sub(margin) {
        for c in margin..w.saturating_sub(margin) {
            let v = response[[r, c]];
            if v >= threshold && is_local_max(&response, r, c) {
                candidates.push((v, r, c));
            }
        }
    }
    // Strongest first; ties keep raster order so results are deterministic.
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0).then((a.1, a.2).cmp(&(b.1, b.2))));

    let selected = select_spaced(&candidates, config.min_distance.max(0.0) as f32, max_corners, w, h);

    if selected.len() < MIN_POINT_PAIRS {
        return Err(StabilizerError::FeatureDetection {
            found: selected.len(),
            required: MIN_POINT_PAIRS,
        });
    }

    Ok(selected
        .into_iter()
        .map(|(r, c)| {
            let (dr, dc) = refine_peak_paraboloid(&response, r, c);
            Point::new(c as f32 + dc, r as f32 + dr)
        })
        .collect())
}

/// Per-pixel corner strength over a `block` x `block` structure tensor.
pub fn corner_response(gray: &Array2<f32>, block: usize, use_harris: bool, k: f64) -> Array2<f32> {
    let (h, w) = gray.dim();
    let (gx, gy) = sobel(gray);

    let ixx = integral(h, w, |r, c| (gx[[r, c]] * gx[[r, c]]) as f64);
    let iyy = integral(h, w, |r, c| (gy[[r, c]] * gy[[r, c]]) as f64);
    let ixy = integral(h, w, |r, c| (gx[[r, c]] * gy[[r, c]]) as f64);

    let half = (block / 2) as isize;
    let mut response = Array2::<f32>::zeros((h, w));
    for r in 0..h {
        let r0 = (r as isize - half).max(0) as usize;
        let r1 = ((r as isize + half + 1) as usize).min(h);
        for c in 0..w {
            let c0 = (c as isize - half).max(0) as usize;
            let c1 = ((c as isize + half + 1) as usize).min(w);

            let sxx = box_sum(&ixx, r0, c0, r1, c1);
            let syy = box_sum(&iyy, r0, c0, r1, c1);
            let sxy = box_sum(&ixy, r0, c0, r1, c1);

            let value = if use_harris {
                let det = sxx * syy - sxy * sxy;
                let trace = sxx + syy;
                det - k * trace * trace
            } else {
                let half_trace = (sxx + syy) * 0.5;
                let diff = (sxx - syy) * 0.5;
                half_trace - (diff * diff + sxy * sxy).sqrt()
            };
            response[[r, c]] = value.max(0.0) as f32;
        }
    }
    response
}

/// 3x3 Sobel gradients (scaled by 1/8) with replicated borders.
fn sobel(gray: &Array2<f32>) -> (Array2<f32>, Array2<f32>) {
    let (h, w) = gray.dim();
    let at = |r: isize, c: isize| {
        gray[[
            r.clamp(0, h as isize - 1) as usize,
            c.clamp(0, w as isize - 1) as usize,
        ]]
    };
    let mut gx = Array2::<f32>::zeros((h, w));
    let mut gy = Array2::<f32>::zeros((h, w));
    for r in 0..h as isize {
        for c in 0..w as isize {
            let dx = (at(r - 1, c + 1) + 2.0 * at(r, c + 1) + at(r + 1, c + 1))
                - (at(r - 1, c - 1) + 2.0 * at(r, c - 1) + at(r + 1, c - 1));
            let dy = (at(r + 1, c - 1) + 2.0 * at(r + 1, c) + at(r + 1, c + 1))
                - (at(r - 1, c - 1) + 2.0 * at(r - 1, c) + at(r - 1, c + 1));
            gx[[r as usize, c as usize]] = dx * 0.125;
            gy[[r as usize, c as usize]] = dy * 0.125;
        }
    }
    (gx, gy)
}

/// Summed-area table with a zero top row and left column.
fn integral(h: usize, w: usize, value: impl Fn(usize, usize) -> f64) -> Array2<f64> {
    let mut table = Array2::<f64>::zeros((h + 1, w + 1));
    for r in 0..h {
        let mut row_sum = 0.0;
        for c in 0..w {
            row_sum += value(r, c);
            table[[r + 1, c + 1]] = table[[r, c + 1]] + row_sum;
        }
    }
    table
}

/// Sum over rows `r0..r1` and columns `c0..c1`.
fn box_sum(table: &Array2<f64>, r0: usize, c0: usize, r1: usize, c1: usize) -> f64 {
    table[[r1, c1]] - table[[r0, c1]] - table[[r1, c0]] + table[[r0, c0]]
}

fn is_local_max(response: &Array2<f32>, r: usize, c: usize) -> bool {
    let v = response[[r, c]];
    for nr in r - 1..=r + 1 {
        for nc in c - 1..=c + 1 {
            if (nr, nc) != (r, c) && response[[nr, nc]] > v {
                return false;
            }
        }
    }
    true
}

/// Greedy selection in candidate order, rejecting anything closer than
/// `min_distance` to an already accepted corner. A grid with cells of
/// `min_distance` keeps the neighbour check local.
fn select_spaced(
    candidates: &[(f32, usize, usize)],
    min_distance: f32,
    max_corners: usize,
    width: usize,
    height: usize,
) -> Vec<(usize, usize)> {
    let mut selected = Vec::with_capacity(max_corners.min(candidates.len()));

    if min_distance < 1.0 {
        selected.extend(candidates.iter().take(max_corners).map(|&(_, r, c)| (r, c)));
        return selected;
    }

    let cell = min_distance;
    let grid_w = (width as f32 / cell).ceil() as usize + 1;
    let grid_h = (height as f32 / cell).ceil() as usize + 1;
    let mut grid: Vec<Vec<(f32, f32)>> = vec![Vec::new(); grid_w * grid_h];
    let min_d2 = min_distance * min_distance;

    for &(_, r, c) in candidates {
        if selected.len() >= max_corners {
            break;
        }
        let (x, y) = (c as f32, r as f32);
        let gx = (x / cell) as usize;
        let gy = (y / cell) as usize;

        let mut clear = true;
        'search: for ny in gy.saturating_sub(1)..=(gy + 1).min(grid_h - 1) {
            for nx in gx.saturating_sub(1)..=(gx + 1).min(grid_w - 1) {
                for &(px, py) in &grid[ny * grid_w + nx] {
                    let (dx, dy) = (px - x, py - y);
                    if dx * dx + dy * dy < min_d2 {
                        clear = false;
                        break 'search;
                    }
                }
            }
        }

        if clear {
            grid[gy * grid_w + gx].push((x, y));
            selected.push((r, c));
        }
    }

    selected
}

/// Fractional (row, col) offset of a response peak from a parabola fit
/// through its 3x3 neighbourhood, clamped to half a pixel.
fn refine_peak_paraboloid(response: &Array2<f32>, r: usize, c: usize) -> (f32, f32) {
    let (h, w) = response.dim();
    if r == 0 || r >= h - 1 || c == 0 || c >= w - 1 {
        return (0.0, 0.0);
    }

    let fit = |prev: f32, curr: f32, next: f32| {
        let denom = prev - 2.0 * curr + next;
        if denom.abs() > 1e-12 {
            ((prev - next) / (2.0 * denom)).clamp(-0.5, 0.5)
        } else {
            0.0
        }
    };

    let centre = response[[r, c]];
    (
        fit(response[[r - 1, c]], centre, response[[r + 1, c]]),
        fit(response[[r, c - 1]], centre, response[[r, c + 1]]),
    )
}
