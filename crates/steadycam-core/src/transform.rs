//! 2D affine transform value type.
//!
//! Six scalars `(a, b, c, d, tx, ty)` stand for the homogeneous matrix
//!
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0  1  |
//! ```
//!
//! so a point maps as `x' = a*x + c*y + tx`, `y' = b*x + d*y + ty`.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{
    REASONABLE_SCALE_MAX, REASONABLE_SCALE_MIN, REASONABLE_TRANSLATION_MAX, SINGULAR_DETERMINANT,
};
use crate::error::{Result, StabilizerError};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn from_translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Uniform scale and rotation (radians, counter-clockwise in a y-up frame)
    /// followed by a translation.
    pub fn from_similarity(scale: f64, angle: f64, tx: f64, ty: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(scale * cos, scale * sin, -scale * sin, scale * cos, tx, ty)
    }

    /// Components in `[a, b, c, d, tx, ty]` order.
    pub fn components(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.tx, self.ty]
    }

    pub fn from_components(v: [f64; 6]) -> Self {
        Self::new(v[0], v[1], v[2], v[3], v[4], v[5])
    }

    pub fn translation(&self) -> (f64, f64) {
        (self.tx, self.ty)
    }

    pub fn translation_magnitude(&self) -> f64 {
        self.tx.hypot(self.ty)
    }

    pub fn scale(&self) -> f64 {
        self.a.hypot(self.b)
    }

    /// Rotation angle in radians.
    pub fn rotation(&self) -> f64 {
        self.b.atan2(self.a)
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.c * self.b
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// Matrix product `self * other`: the result applies `other` first.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform::new(
            self.a * other.a + self.c * other.b,
            self.b * other.a + self.d * other.b,
            self.a * other.c + self.c * other.d,
            self.b * other.c + self.d * other.d,
            self.a * other.tx + self.c * other.ty + self.tx,
            self.b * other.tx + self.d * other.ty + self.ty,
        )
    }

    /// Inverse map, or `None` when the linear part is singular.
    pub fn invert(&self) -> Option<Transform> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < SINGULAR_DETERMINANT {
            return None;
        }
        let inv_det = 1.0 / det;
        let a = self.d * inv_det;
        let b = -self.b * inv_det;
        let c = -self.c * inv_det;
        let d = self.a * inv_det;
        let tx = -(a * self.tx + c * self.ty);
        let ty = -(b * self.tx + d * self.ty);
        let inv = Transform::new(a, b, c, d, tx, ty);
        inv.is_valid().then_some(inv)
    }

    /// Per-component blend, `t` clamped to [0, 1].
    pub fn interpolate(from: &Transform, to: &Transform, t: f64) -> Transform {
        if t <= 0.0 {
            return *from;
        }
        if t >= 1.0 {
            return *to;
        }
        let f = from.components();
        let g = to.components();
        Transform::from_components(std::array::from_fn(|i| f[i] + (g[i] - f[i]) * t))
    }

    /// Component-wise mean. Identity for an empty slice.
    pub fn average(transforms: &[Transform]) -> Transform {
        if transforms.is_empty() {
            return Transform::identity();
        }
        let mut sum = [0.0; 6];
        for t in transforms {
            for (s, v) in sum.iter_mut().zip(t.components()) {
                *s += v;
            }
        }
        let n = transforms.len() as f64;
        Transform::from_components(sum.map(|s| s / n))
    }

    /// All six components finite.
    pub fn is_valid(&self) -> bool {
        self.components().iter().all(|v| v.is_finite())
    }

    /// Valid, scale in [0.5, 2] and each translation component within 100 px.
    pub fn is_reasonable(&self) -> bool {
        if !self.is_valid() {
            return false;
        }
        let scale = self.scale();
        (REASONABLE_SCALE_MIN..=REASONABLE_SCALE_MAX).contains(&scale)
            && self.tx.abs() <= REASONABLE_TRANSLATION_MAX
            && self.ty.abs() <= REASONABLE_TRANSLATION_MAX
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        self.components()
            .iter()
            .zip(Transform::identity().components())
            .all(|(v, id)| (v - id).abs() <= eps)
    }

    /// 3x3 homogeneous matrix.
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut m = Array2::<f64>::eye(3);
        m[[0, 0]] = self.a;
        m[[0, 1]] = self.c;
        m[[0, 2]] = self.tx;
        m[[1, 0]] = self.b;
        m[[1, 1]] = self.d;
        m[[1, 2]] = self.ty;
        m
    }

    /// Accepts a 2x3 affine matrix or a 3x3 homogeneous one. The bottom row of
    /// a 3x3 input is not checked.
    pub fn from_matrix(m: &Array2<f64>) -> Result<Transform> {
        match m.dim() {
            (2, 3) | (3, 3) => Ok(Transform::new(
                m[[0, 0]],
                m[[1, 0]],
                m[[0, 1]],
                m[[1, 1]],
                m[[0, 2]],
                m[[1, 2]],
            )),
            (rows, cols) => Err(StabilizerError::TransformEstimation(format!(
                "expected a 2x3 or 3x3 matrix, got {rows}x{cols}"
            ))),
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TransformMatrix([{}, {}, {}; {}, {}, {}])",
            self.a, self.c, self.tx, self.b, self.d, self.ty
        )
    }
}
