//! Floating-point 3×3 matrices, used for inertia tensors.

use core::ops;

use euclid::Vector3D;

use crate::math::{FreeCoordinate, Rotation};

/// A 3×3 linear transformation matrix in [`FreeCoordinate`]s.
///
/// The unit type of the vectors it transforms is not tracked, because inertia tensors are
/// converted between the local and world frames by similarity transforms rather than by
/// changing what they act on.
//---
// Design note: `euclid::Transform3D` is 4×4 and has no inverse-transpose conveniences,
// and the extra row and column would only be noise here.
#[expect(clippy::exhaustive_structs)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix3 {
    /// First column
    pub x: Vector3D<FreeCoordinate, ()>,
    /// Second column
    pub y: Vector3D<FreeCoordinate, ()>,
    /// Third column
    pub z: Vector3D<FreeCoordinate, ()>,
}

impl Matrix3 {
    /// The zero matrix.
    pub const ZERO: Self = Self::from_diagonal(0.0, 0.0, 0.0);

    /// The identity matrix.
    pub const IDENTITY: Self = Self::from_diagonal(1.0, 1.0, 1.0);

    /// Construct a diagonal matrix, such as the inertia tensor of a shape whose principal axes
    /// are aligned with its local frame.
    #[inline]
    pub const fn from_diagonal(a: FreeCoordinate, b: FreeCoordinate, c: FreeCoordinate) -> Self {
        Self {
            x: Vector3D::new(a, 0.0, 0.0),
            y: Vector3D::new(0.0, b, 0.0),
            z: Vector3D::new(0.0, 0.0, c),
        }
    }

    /// Construct the matrix whose columns are the images of the local basis vectors
    /// under the given rotation.
    #[inline]
    pub fn from_rotation(rotation: &Rotation) -> Self {
        let column = |v: Vector3D<FreeCoordinate, crate::math::Local>| {
            rotation.transform_vector3d(v).cast_unit()
        };
        Self {
            x: column(Vector3D::new(1.0, 0.0, 0.0)),
            y: column(Vector3D::new(0.0, 1.0, 0.0)),
            z: column(Vector3D::new(0.0, 0.0, 1.0)),
        }
    }

    /// Returns the diagonal elements.
    #[inline]
    pub fn diagonal(&self) -> [FreeCoordinate; 3] {
        [self.x.x, self.y.y, self.z.z]
    }

    /// Returns the transpose of this matrix.
    #[inline]
    #[must_use]
    pub fn transpose(&self) -> Self {
        Self {
            x: Vector3D::new(self.x.x, self.y.x, self.z.x),
            y: Vector3D::new(self.x.y, self.y.y, self.z.y),
            z: Vector3D::new(self.x.z, self.y.z, self.z.z),
        }
    }

    /// Returns the determinant of this matrix.
    #[inline]
    pub fn determinant(&self) -> FreeCoordinate {
        self.x.dot(self.y.cross(self.z))
    }

    /// Returns the inverse of this matrix, or [`None`] if it is singular or nearly so.
    #[inline]
    pub fn inverse(&self) -> Option<Self> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        // Rows of the inverse are the cross products of pairs of columns.
        let rows = [
            self.y.cross(self.z) / det,
            self.z.cross(self.x) / det,
            self.x.cross(self.y) / det,
        ];
        Some(
            Self {
                x: rows[0],
                y: rows[1],
                z: rows[2],
            }
            .transpose(),
        )
    }

    /// Returns the average of this matrix and its transpose, removing the
    /// antisymmetric part introduced by rounding error.
    #[inline]
    #[must_use]
    pub fn symmetrize(&self) -> Self {
        let t = self.transpose();
        Self {
            x: (self.x + t.x) * 0.5,
            y: (self.y + t.y) * 0.5,
            z: (self.z + t.z) * 0.5,
        }
    }

    /// Transform the vector by this matrix. The unit is preserved.
    #[inline]
    pub fn transform_vector<U>(
        &self,
        v: Vector3D<FreeCoordinate, U>,
    ) -> Vector3D<FreeCoordinate, U> {
        (self.x * v.x + self.y * v.y + self.z * v.z).cast_unit()
    }

    /// Express a tensor given in a body's local frame in the world frame, for the given
    /// orientation: `R · self · Rᵀ`.
    #[inline]
    #[must_use]
    pub fn rotated(&self, rotation: &Rotation) -> Self {
        let r = Self::from_rotation(rotation);
        r * *self * r.transpose()
    }
}

impl Default for Matrix3 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ops::Mul for Matrix3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            x: self.transform_vector(rhs.x),
            y: self.transform_vector(rhs.y),
            z: self.transform_vector(rhs.z),
        }
    }
}

impl ops::Mul<FreeCoordinate> for Matrix3 {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: FreeCoordinate) -> Self::Output {
        Self {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl ops::Add for Matrix3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}
