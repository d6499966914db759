//! Numeric types used for coordinates and related quantities.

use euclid::{Point3D, Rotation3D, Vector3D};

/// Unit-of-measure type for vectors and points in the shared world frame.
///
/// The world frame is right-handed with +Z up. Lengths are in meters.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum World {}

/// Unit-of-measure type for vectors and points in the frame of a single body,
/// with its origin at the body's reference point, +X to the right, +Y forward and +Z up.
#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Local {}

/// Scalar type for all positions, velocities and forces.
pub type FreeCoordinate = f64;

/// Positions in the world frame.
pub type FreePoint = Point3D<FreeCoordinate, World>;

/// Vectors in the world frame.
pub type FreeVector = Vector3D<FreeCoordinate, World>;

/// Positions in a body's local frame.
pub type LocalPoint = Point3D<FreeCoordinate, Local>;

/// Vectors in a body's local frame.
pub type LocalVector = Vector3D<FreeCoordinate, Local>;

/// Orientation of a body: the rotation taking its local frame to the world frame.
pub type Rotation = Rotation3D<FreeCoordinate, Local, World>;

/// The world up direction.
pub const UP: FreeVector = Vector3D::new(0.0, 0.0, 1.0);

/// Returns whether every component of the vector is finite.
#[inline]
pub fn is_finite_vector<U>(v: Vector3D<FreeCoordinate, U>) -> bool {
    v.x.is_finite() && v.y.is_finite() && v.z.is_finite()
}
