//! Quaternion implementation for 3D rotations
//!
//! Pointing in the scan simulation is carried as a chain of rotations:
//! boresight orientation, instrument rotation about the boresight, detector
//! offset on the focal plane and finally the detector polarization angle.
//! Each link is a unit quaternion and the chain is evaluated by quaternion
//! products before a single vector rotation.

use nalgebra::{Matrix3, Vector3};
use std::ops::Mul;

/// A quaternion representing a rotation in 3D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    /// Real/scalar component (w)
    pub w: f64,
    /// First complex component (i)
    pub x: f64,
    /// Second complex component (j)
    pub y: f64,
    /// Third complex component (k)
    pub z: f64,
}

impl Quaternion {
    /// Create a new quaternion
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Create an identity quaternion (no rotation)
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Create a quaternion from axis-angle representation
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let half_angle = angle / 2.0;
        let sin_half_angle = half_angle.sin();

        Self {
            w: half_angle.cos(),
            x: axis[0] * sin_half_angle,
            y: axis[1] * sin_half_angle,
            z: axis[2] * sin_half_angle,
        }
    }

    /// Rotation by `angle` radians about the x axis
    pub fn rot_x(angle: f64) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Self::new(c, s, 0.0, 0.0)
    }

    /// Rotation by `angle` radians about the y axis
    pub fn rot_y(angle: f64) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Self::new(c, 0.0, s, 0.0)
    }

    /// Rotation by `angle` radians about the z axis
    pub fn rot_z(angle: f64) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Self::new(c, 0.0, 0.0, s)
    }

    /// Build the rotation whose matrix has the given columns.
    ///
    /// The columns must form a right-handed orthonormal triad; the result is
    /// the rotation taking x̂, ŷ, ẑ onto `x_axis`, `y_axis`, `z_axis`.
    pub fn from_frame(x_axis: &Vector3<f64>, y_axis: &Vector3<f64>, z_axis: &Vector3<f64>) -> Self {
        let m = Matrix3::from_columns(&[*x_axis, *y_axis, *z_axis]);
        Self::from_rotation_matrix(&m)
    }

    /// Convert a proper rotation matrix to a unit quaternion (Shepperd's method)
    pub fn from_rotation_matrix(m: &Matrix3<f64>) -> Self {
        let trace = m[(0, 0)] + m[(1, 1)] + m[(2, 2)];

        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m[(2, 1)] - m[(1, 2)]) / s,
                (m[(0, 2)] - m[(2, 0)]) / s,
                (m[(1, 0)] - m[(0, 1)]) / s,
            )
        } else if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
            let s = (1.0 + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).sqrt() * 2.0;
            Self::new(
                (m[(2, 1)] - m[(1, 2)]) / s,
                0.25 * s,
                (m[(0, 1)] + m[(1, 0)]) / s,
                (m[(0, 2)] + m[(2, 0)]) / s,
            )
        } else if m[(1, 1)] > m[(2, 2)] {
            let s = (1.0 + m[(1, 1)] - m[(0, 0)] - m[(2, 2)]).sqrt() * 2.0;
            Self::new(
                (m[(0, 2)] - m[(2, 0)]) / s,
                (m[(0, 1)] + m[(1, 0)]) / s,
                0.25 * s,
                (m[(1, 2)] + m[(2, 1)]) / s,
            )
        } else {
            let s = (1.0 + m[(2, 2)] - m[(0, 0)] - m[(1, 1)]).sqrt() * 2.0;
            Self::new(
                (m[(1, 0)] - m[(0, 1)]) / s,
                (m[(0, 2)] + m[(2, 0)]) / s,
                (m[(1, 2)] + m[(2, 1)]) / s,
                0.25 * s,
            )
        };

        q.normalize()
    }

    /// Calculate the norm (magnitude) of the quaternion
    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Normalize the quaternion to unit length
    pub fn normalize(&self) -> Self {
        let norm = self.norm();
        if norm.abs() < 1e-10 {
            Self::identity()
        } else {
            Self {
                w: self.w / norm,
                x: self.x / norm,
                y: self.y / norm,
                z: self.z / norm,
            }
        }
    }

    /// Calculate the conjugate of the quaternion
    pub fn conjugate(&self) -> Self {
        Self {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotate a 3D vector using this quaternion
    pub fn rotate_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        // Convert vector to pure quaternion (w=0)
        let v_quat = Quaternion::new(0.0, v[0], v[1], v[2]);

        // Perform rotation: q * v * q^(-1)
        let rotated = *self * v_quat * self.conjugate();

        Vector3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Images of the x̂ and ẑ axes under this rotation.
    ///
    /// Cheaper than two calls to [`Quaternion::rotate_vector`]; these are the
    /// polarization and line-of-sight directions of a detector quaternion.
    pub fn x_and_z_axes(&self) -> (Vector3<f64>, Vector3<f64>) {
        let (w, x, y, z) = (self.w, self.x, self.y, self.z);
        let x_axis = Vector3::new(
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y + z * w),
            2.0 * (x * z - y * w),
        );
        let z_axis = Vector3::new(
            2.0 * (x * z + y * w),
            2.0 * (y * z - x * w),
            1.0 - 2.0 * (x * x + y * y),
        );
        (x_axis, z_axis)
    }

    /// Convert quaternion to 3x3 rotation matrix
    pub fn to_rotation_matrix(&self) -> Matrix3<f64> {
        let q = self.normalize();

        let w = q.w;
        let x = q.x;
        let y = q.y;
        let z = q.z;

        let xx = x * x;
        let xy = x * y;
        let xz = x * z;
        let xw = x * w;

        let yy = y * y;
        let yz = y * z;
        let yw = y * w;

        let zz = z * z;
        let zw = z * w;

        Matrix3::new(
            1.0 - 2.0 * (yy + zz),
            2.0 * (xy - zw),
            2.0 * (xz + yw),
            2.0 * (xy + zw),
            1.0 - 2.0 * (xx + zz),
            2.0 * (yz - xw),
            2.0 * (xz - yw),
            2.0 * (yz + xw),
            1.0 - 2.0 * (xx + yy),
        )
    }
}

// Quaternion multiplication
impl Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}
