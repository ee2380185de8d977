//! Robust similarity estimation (rotation, uniform scale, translation) from
//! matched point pairs.

use tracing::debug;

use crate::consts::{
    MAX_LINEAR_COMPONENT, MAX_TRANSLATION_MAGNITUDE, MIN_POINT_PAIRS, RANSAC_CONFIDENCE,
    RANSAC_MAX_ITERATIONS, RANSAC_THRESHOLD_FACTOR,
};
use crate::error::{Result, StabilizerError};
use crate::features::Point;
use crate::params::StabilizationParameters;
use crate::transform::Transform;

/// Sanity limits applied to the input pairs and the fitted transform.
#[derive(Clone, Debug, PartialEq)]
pub struct EstimationBounds {
    pub max_coordinate: f64,
    pub max_displacement: f64,
    pub min_point_spread: f64,
    pub ransac_threshold_min: f64,
    pub ransac_threshold_max: f64,
}

impl Default for EstimationBounds {
    fn default() -> Self {
        Self::from(&StabilizationParameters::default())
    }
}

impl From<&StabilizationParameters> for EstimationBounds {
    fn from(p: &StabilizationParameters) -> Self {
        Self {
            max_coordinate: p.max_coordinate,
            max_displacement: p.max_displacement,
            min_point_spread: p.min_point_spread,
            ransac_threshold_min: p.ransac_threshold_min,
            ransac_threshold_max: p.ransac_threshold_max,
        }
    }
}

/// Outcome of a successful fit.
#[derive(Clone, Debug)]
pub struct Estimate {
    /// Maps previous-frame positions onto current-frame positions.
    pub transform: Transform,
    pub inliers: usize,
    /// Reprojection threshold used to count inliers (pixels).
    pub threshold: f64,
}

/// Fit the similarity mapping `prev[i]` onto `curr[i]` with RANSAC and a
/// least-squares refit on the inliers.
pub fn estimate_transform(
    prev: &[Point],
    curr: &[Point],
    bounds: &EstimationBounds,
) -> Result<Estimate> {
    if prev.len() != curr.len() {
        return Err(StabilizerError::TransformEstimation(format!(
            "point count mismatch: {} vs {}",
            prev.len(),
            curr.len()
        )));
    }
    if prev.len() < MIN_POINT_PAIRS {
        return Err(StabilizerError::TransformEstimation(format!(
            "{} point pairs, need at least {MIN_POINT_PAIRS}",
            prev.len()
        )));
    }

    let src: Vec<(f64, f64)> = prev.iter().map(|p| (p.x as f64, p.y as f64)).collect();
    let dst: Vec<(f64, f64)> = curr.iter().map(|p| (p.x as f64, p.y as f64)).collect();

    for (&(sx, sy), &(dx, dy)) in src.iter().zip(&dst) {
        let coords = [sx, sy, dx, dy];
        if coords.iter().any(|v| !v.is_finite()) {
            return Err(StabilizerError::TransformEstimation(
                "non-finite point coordinate".into(),
            ));
        }
        if coords.iter().any(|v| v.abs() > bounds.max_coordinate) {
            return Err(StabilizerError::TransformEstimation(format!(
                "coordinate exceeds {}",
                bounds.max_coordinate
            )));
        }
        if (dx - sx).hypot(dy - sy) > bounds.max_displacement {
            return Err(StabilizerError::TransformEstimation(format!(
                "displacement exceeds {}",
                bounds.max_displacement
            )));
        }
    }

    let (std_x, std_y) = spread(&src);
    if std_x < bounds.min_point_spread && std_y < bounds.min_point_spread {
        return Err(StabilizerError::TransformEstimation(format!(
            "points too clustered (spread {std_x:.2} x {std_y:.2}, need {})",
            bounds.min_point_spread
        )));
    }

    let threshold = ((std_x + std_y) * 0.5 * RANSAC_THRESHOLD_FACTOR)
        .clamp(bounds.ransac_threshold_min, bounds.ransac_threshold_max);

    let (model, inlier_mask) = ransac(&src, &dst, threshold).ok_or_else(|| {
        StabilizerError::TransformEstimation("no consistent similarity found".into())
    })?;

    let in_src: Vec<(f64, f64)> = src
        .iter()
        .zip(&inlier_mask)
        .filter_map(|(p, &m)| m.then_some(*p))
        .collect();
    let in_dst: Vec<(f64, f64)> = dst
        .iter()
        .zip(&inlier_mask)
        .filter_map(|(p, &m)| m.then_some(*p))
        .collect();

    if in_src.len() < MIN_POINT_PAIRS {
        return Err(StabilizerError::TransformEstimation(format!(
            "{} inliers, need at least {MIN_POINT_PAIRS}",
            in_src.len()
        )));
    }

    let transform = fit_similarity(&in_src, &in_dst).unwrap_or(model);
    check_transform(&transform)?;

    debug!(
        inliers = in_src.len(),
        total = src.len(),
        threshold,
        "similarity estimated"
    );

    Ok(Estimate {
        transform,
        inliers: in_src.len(),
        threshold,
    })
}

/// Reject fits with non-finite entries or implausible magnitudes.
fn check_transform(t: &Transform) -> Result<()> {
    if !t.is_valid() {
        return Err(StabilizerError::TransformEstimation(
            "non-finite transform".into(),
        ));
    }
    if [t.a, t.b, t.c, t.d]
        .iter()
        .any(|v| v.abs() > MAX_LINEAR_COMPONENT)
    {
        return Err(StabilizerError::TransformEstimation(format!(
            "linear part exceeds {MAX_LINEAR_COMPONENT}"
        )));
    }
    if t.translation_magnitude() > MAX_TRANSLATION_MAGNITUDE {
        return Err(StabilizerError::TransformEstimation(format!(
            "translation exceeds {MAX_TRANSLATION_MAGNITUDE}"
        )));
    }
    Ok(())
}

/// Population standard deviation along each axis.
fn spread(points: &[(f64, f64)]) -> (f64, f64) {
    let n = points.len() as f64;
    let (mx, my) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    let (mx, my) = (mx / n, my / n);
    let (vx, vy) = points.iter().fold((0.0, 0.0), |(ax, ay), &(x, y)| {
        (ax + (x - mx).powi(2), ay + (y - my).powi(2))
    });
    ((vx / n).sqrt(), (vy / n).sqrt())
}

fn ransac(
    src: &[(f64, f64)],
    dst: &[(f64, f64)],
    threshold: f64,
) -> Option<(Transform, Vec<bool>)> {
    let n = src.len();
    let thresh2 = threshold * threshold;
    let mut rng = Lcg::new(n as u64);

    let mut best: Option<(Transform, Vec<bool>, usize)> = None;
    let mut iterations = RANSAC_MAX_ITERATIONS;
    let mut i = 0;

    while i < iterations {
        i += 1;
        let (j, k) = rng.pair(n);
        let Some(model) = similarity_from_pair(src[j], src[k], dst[j], dst[k]) else {
            continue;
        };

        let mask: Vec<bool> = src
            .iter()
            .zip(dst)
            .map(|(&(sx, sy), &(dx, dy))| {
                let (px, py) = model.apply(sx, sy);
                (px - dx).powi(2) + (py - dy).powi(2) <= thresh2
            })
            .collect();
        let count = mask.iter().filter(|&&m| m).count();

        if best.as_ref().map_or(true, |b| count > b.2) {
            best = Some((model, mask, count));
            iterations = iterations.min(required_iterations(count as f64 / n as f64));
        }
    }

    best.map(|(model, mask, _)| (model, mask))
}

/// Iterations needed to draw one all-inlier pair with the configured
/// confidence, given the current inlier ratio.
fn required_iterations(inlier_ratio: f64) -> usize {
    let p_good = inlier_ratio * inlier_ratio;
    if p_good >= 1.0 {
        return 1;
    }
    if p_good <= 0.0 {
        return RANSAC_MAX_ITERATIONS;
    }
    let k = (1.0 - RANSAC_CONFIDENCE).ln() / (1.0 - p_good).ln();
    if k.is_finite() {
        (k.ceil() as usize).clamp(1, RANSAC_MAX_ITERATIONS)
    } else {
        RANSAC_MAX_ITERATIONS
    }
}

/// Exact similarity through two correspondences.
fn similarity_from_pair(
    p1: (f64, f64),
    p2: (f64, f64),
    q1: (f64, f64),
    q2: (f64, f64),
) -> Option<Transform> {
    let (ux, uy) = (p2.0 - p1.0, p2.1 - p1.1);
    let (vx, vy) = (q2.0 - q1.0, q2.1 - q1.1);
    let norm = ux * ux + uy * uy;
    if norm < 1e-6 {
        return None;
    }
    // v = (a + ib) * u in complex form.
    let a = (ux * vx + uy * vy) / norm;
    let b = (ux * vy - uy * vx) / norm;
    let tx = q1.0 - (a * p1.0 - b * p1.1);
    let ty = q1.1 - (b * p1.0 + a * p1.1);
    Some(Transform::new(a, b, -b, a, tx, ty))
}

/// Least-squares similarity over all pairs.
fn fit_similarity(src: &[(f64, f64)], dst: &[(f64, f64)]) -> Option<Transform> {
    let n = src.len() as f64;
    let (mut sx, mut sy, mut dx, mut dy) = (0.0, 0.0, 0.0, 0.0);
    for (&(px, py), &(qx, qy)) in src.iter().zip(dst) {
        sx += px;
        sy += py;
        dx += qx;
        dy += qy;
    }
    let (sx, sy, dx, dy) = (sx / n, sy / n, dx / n, dy / n);

    let (mut num_a, mut num_b, mut denom) = (0.0, 0.0, 0.0);
    for (&(px, py), &(qx, qy)) in src.iter().zip(dst) {
        let (px, py) = (px - sx, py - sy);
        let (qx, qy) = (qx - dx, qy - dy);
        num_a += px * qx + py * qy;
        num_b += px * qy - py * qx;
        denom += px * px + py * py;
    }
    if denom < 1e-9 {
        return None;
    }

    let a = num_a / denom;
    let b = num_b / denom;
    let tx = dx - (a * sx - b * sy);
    let ty = dy - (b * sx + a * sy);
    Some(Transform::new(a, b, -b, a, tx, ty))
}

/// Small deterministic generator so identical inputs give identical fits.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_index(&mut self, n: usize) -> usize {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.state >> 33) as usize) % n
    }

    /// Two distinct indices below `n` (n >= 2).
    fn pair(&mut self, n: usize) -> (usize, usize) {
        let j = self.next_index(n);
        let mut k = self.next_index(n);
        while k == j {
            k = self.next_index(n);
        }
        (j, k)
    }
}
