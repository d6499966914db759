//! Helpers for [`Rotation`] quaternions that `euclid` does not provide.

use euclid::{Angle, Rotation3D};

use crate::math::{FreeCoordinate, FreeVector, Rotation, World};

/// Below this angular speed (radians per second), rotation integration is skipped.
const ANGULAR_SPEED_EPSILON: FreeCoordinate = 1e-12;

/// Advances `rotation` by spinning it at the world-frame `angular_velocity` for `dt`
/// seconds, and renormalizes the result.
///
/// The spin is applied exactly (as an axis-angle rotation) rather than by a first-order
/// quaternion derivative, so a constant angular velocity does not gain or lose energy.
#[inline]
#[must_use]
pub fn integrate_rotation(
    rotation: Rotation,
    angular_velocity: FreeVector,
    dt: FreeCoordinate,
) -> Rotation {
    let speed = angular_velocity.length();
    if !(speed * dt > ANGULAR_SPEED_EPSILON) {
        return rotation.normalize();
    }
    let spin = Rotation3D::<FreeCoordinate, World, World>::around_axis(
        angular_velocity / speed,
        Angle::radians(speed * dt),
    );
    rotation.then(&spin).normalize()
}

/// Returns the angle, in radians within `[0, π]`, of the rotation taking `a` to `b`.
#[inline]
pub fn angle_between(a: &Rotation, b: &Rotation) -> FreeCoordinate {
    let dot = (a.i * b.i + a.j * b.j + a.k * b.k + a.r * b.r).abs().min(1.0);
    2.0 * dot.acos()
}

/// Returns the orientation which faces the given yaw angle (radians, counterclockwise about
/// +Z from +Y) with no pitch or roll.
#[inline]
pub fn yaw_rotation(yaw: FreeCoordinate) -> Rotation {
    Rotation::around_z(Angle::radians(yaw))
}
