//! Coordinate Transforms
//!
//! 2D affine transforms distinguishing raw sensor space from window space.
//! Stateless math consumed by the event model: points get the full
//! rotate/scale/translate treatment, vectors (relative motion) skip the
//! translation, and orientation angles are carried through the rotation with
//! either axis (π) or directional (2π) symmetry.

use crate::error::{EvhubError, Result};
use crate::event::parcel;
use bytes::BufMut;

/// Display orientation for viewport-sized transform constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// No rotation
    Rotate0,
    /// 90° clockwise rotation
    Rotate90,
    /// 180° rotation
    Rotate180,
    /// 270° clockwise rotation
    Rotate270,
    /// Horizontal mirror
    FlipH,
}

/// Row-major 3x3 affine transform.
///
/// Only the top two rows carry information; the bottom row is fixed at
/// `[0, 0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    m: [f32; 9],
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Transform = Transform {
        m: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
    };

    /// Build from a row-major 3x3 matrix
    pub fn from_matrix(m: [f32; 9]) -> Self {
        Self { m }
    }

    /// Build a scale-plus-translation transform
    pub fn from_scale_offset(sx: f32, sy: f32, tx: f32, ty: f32) -> Self {
        Self {
            m: [sx, 0.0, tx, 0.0, sy, ty, 0.0, 0.0, 1.0],
        }
    }

    /// Build a pure rotation by `radians` (clockwise in the y-down
    /// coordinate convention)
    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            m: [cos, -sin, 0.0, sin, cos, 0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Build the transform mapping a `width` x `height` viewport through a
    /// display orientation, translated so the viewport stays in the positive
    /// quadrant
    pub fn oriented(orientation: Orientation, width: f32, height: f32) -> Self {
        let m = match orientation {
            Orientation::Rotate0 => Self::IDENTITY.m,
            // (x, y) -> (width - y, x)
            Orientation::Rotate90 => [0.0, -1.0, width, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            // (x, y) -> (width - x, height - y)
            Orientation::Rotate180 => [-1.0, 0.0, width, 0.0, -1.0, height, 0.0, 0.0, 1.0],
            // (x, y) -> (y, height - x)
            Orientation::Rotate270 => [0.0, 1.0, 0.0, -1.0, 0.0, height, 0.0, 0.0, 1.0],
            // (x, y) -> (width - x, y)
            Orientation::FlipH => [-1.0, 0.0, width, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        Self { m }
    }

    /// The row-major matrix
    pub fn matrix(&self) -> [f32; 9] {
        self.m
    }

    /// X translation component
    pub fn tx(&self) -> f32 {
        self.m[2]
    }

    /// Y translation component
    pub fn ty(&self) -> f32 {
        self.m[5]
    }

    /// Replace the translation components
    pub fn set_translation(&mut self, tx: f32, ty: f32) {
        self.m[2] = tx;
        self.m[5] = ty;
    }

    /// Apply to a point (rotate, scale, and translate)
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.m[0] * x + self.m[1] * y + self.m[2],
            self.m[3] * x + self.m[4] * y + self.m[5],
        )
    }

    /// Apply to a vector (rotate and scale only, no translation)
    pub fn transform_vector(&self, x: f32, y: f32) -> (f32, f32) {
        (self.m[0] * x + self.m[1] * y, self.m[3] * x + self.m[4] * y)
    }

    /// Compose with another transform so that `other` applies first:
    /// `result(p) = self(other(p))`
    pub fn concat(&self, other: &Transform) -> Transform {
        let a = &self.m;
        let b = &other.m;
        let mut m = [0.0f32; 9];
        for row in 0..3 {
            for col in 0..3 {
                m[row * 3 + col] = a[row * 3] * b[col]
                    + a[row * 3 + 1] * b[3 + col]
                    + a[row * 3 + 2] * b[6 + col];
            }
        }
        Transform { m }
    }

    /// The inverse transform; fails for singular matrices
    pub fn inverse(&self) -> Result<Transform> {
        let det = self.m[0] * self.m[4] - self.m[1] * self.m[3];
        if det == 0.0 || !det.is_finite() {
            return Err(EvhubError::NonInvertibleTransform);
        }
        let inv_det = 1.0 / det;
        let a = self.m[4] * inv_det;
        let b = -self.m[1] * inv_det;
        let c = -self.m[3] * inv_det;
        let d = self.m[0] * inv_det;
        Ok(Transform {
            m: [
                a,
                b,
                -(a * self.m[2] + b * self.m[5]),
                c,
                d,
                -(c * self.m[2] + d * self.m[5]),
                0.0,
                0.0,
                1.0,
            ],
        })
    }

    /// Carry an orientation angle through the transform.
    ///
    /// The angle is the clockwise deviation from vertical of a unit vector;
    /// it is pushed through the rotation/scale part of the transform and
    /// re-derived. Without directional support the result is wrapped into
    /// `(-π/2, π/2]` (axis of symmetry); with it the full `(-π, π]` range is
    /// preserved.
    pub fn transform_angle(&self, radians: f32, directional: bool) -> f32 {
        let (x, y) = (radians.sin(), -radians.cos());
        let (tx, ty) = self.transform_vector(x, y);
        let mut result = tx.atan2(-ty);
        if !directional {
            if result > std::f32::consts::FRAC_PI_2 {
                result -= std::f32::consts::PI;
            } else if result < -std::f32::consts::FRAC_PI_2 {
                result += std::f32::consts::PI;
            }
        }
        result
    }

    pub(crate) fn write_to_parcel(&self, out: &mut impl BufMut) {
        for value in self.m {
            out.put_f32(value);
        }
    }

    pub(crate) fn read_from_parcel(buf: &mut impl bytes::Buf) -> Result<Self> {
        let mut m = [0.0f32; 9];
        for value in m.iter_mut() {
            *value = parcel::read_f32(buf, "transform matrix")?;
        }
        Ok(Self { m })
    }
}

/// Round a transformed coordinate to [`ROUNDING_PRECISION`].
///
/// The precision is a power of two, so the scale/round/unscale sequence is
/// exact in binary floating point and an integral value that was pushed
/// through a transform and its inverse comes back out bit-exact.
pub(crate) fn round_transformed(value: f32) -> f32 {
    (value / ROUNDING_PRECISION).round() * ROUNDING_PRECISION
}

/// Precision of displayed (transformed) coordinate getters
pub const ROUNDING_PRECISION: f32 = 1.0 / 1024.0;
