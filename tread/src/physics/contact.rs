use core::fmt;

use manyfmt::Refmt as _;

use crate::config::PhysicsConfig;
use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::physics::{CollisionShape, RigidBody, Surface, SurfaceKind};
use crate::util::ConciseDebug;

/// A point of a body which is touching, or nearly touching, a [`Surface`].
///
/// Contacts are found anew each sub-step and not retained.
#[derive(Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct Contact {
    /// World position of the body's vertex.
    pub point: FreePoint,
    /// Unit normal of the surface, pointing toward the body.
    pub normal: FreeVector,
    /// Signed separation of `point` from the surface; negative when penetrating.
    pub distance: FreeCoordinate,
    /// Velocity of the surface.
    pub surface_velocity: FreeVector,
    /// Inverse mass of whatever the surface belongs to.
    pub surface_inverse_mass: FreeCoordinate,
    /// Friction multiplier of the surface.
    pub surface_friction: FreeCoordinate,
    /// What the surface belongs to.
    pub kind: SurfaceKind,
}

impl Contact {
    /// Creates a contact of a point against a surface.
    pub fn new(point: FreePoint, surface: &Surface) -> Self {
        Self {
            point,
            normal: surface.normal,
            distance: surface.signed_distance(point),
            surface_velocity: surface.velocity,
            surface_inverse_mass: surface.inverse_mass,
            surface_friction: surface.friction,
            kind: surface.kind,
        }
    }

    /// Velocity of the body's contact point relative to the surface.
    pub fn relative_velocity(&self, body: &RigidBody) -> FreeVector {
        body.velocity_at_point(self.point) - self.surface_velocity
    }

    /// Speed at which the body's contact point approaches the surface; negative when
    /// separating.
    pub fn closing_velocity(&self, body: &RigidBody) -> FreeCoordinate {
        -self.relative_velocity(body).dot(self.normal)
    }

    /// Depth of penetration, or zero if not penetrating.
    pub fn penetration(&self) -> FreeCoordinate {
        (-self.distance).max(0.0)
    }
}

impl fmt::Debug for Contact {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        manyfmt::Fmt::fmt(self, fmt, &ConciseDebug)
    }
}

impl manyfmt::Fmt<ConciseDebug> for Contact {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, fopt: &ConciseDebug) -> fmt::Result {
        write!(
            fmt,
            "{:?} at {:?} n {:?} d {:+.4}",
            self.kind,
            self.point.refmt(fopt),
            self.normal.refmt(fopt),
            self.distance
        )
    }
}

/// Finds the vertices of `shape`, placed as `body` is, that are within
/// `config.collision_tolerance` of any of `surfaces`, and appends them to `out` in order of
/// vertex then surface.
///
/// Surfaces the vertex is deeper behind than `config.max_penetration` are ignored, as the
/// vertex has presumably passed through a thin surface or is approaching it from the back.
pub fn find_contacts(
    body: &RigidBody,
    shape: &CollisionShape,
    surfaces: &[Surface],
    config: &PhysicsConfig,
    out: &mut Vec<Contact>,
) {
    for &vertex in shape.vertices() {
        let point = body.to_world(vertex);
        for surface in surfaces {
            let distance = surface.signed_distance(point);
            if distance < config.collision_tolerance
                && distance > -config.max_penetration
                && surface.contains_projection(point, 0.0)
            {
                out.push(Contact::new(point, surface));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rotation;
    use crate::physics::StaticScene;
    use crate::physics::{CollisionQuery as _, SurfaceMask};
    use euclid::{point3, vec3};

    #[test]
    fn resting_cube_has_four_contacts() {
        let mut scene = StaticScene::new();
        scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 10.0);
        let mut surfaces = Vec::new();
        scene.find_surfaces(
            &crate::math::Aab::new(-5.0, 5.0, -5.0, 5.0, -5.0, 5.0),
            SurfaceMask::SOLID,
            &mut surfaces,
        );

        let shape = CollisionShape::cuboid(vec3(0.5, 0.5, 0.5));
        let mut body = RigidBody::new(
            1.0,
            CollisionShape::cuboid_inertia(vec3(0.5, 0.5, 0.5), 1.0),
            point3(0.0, 0.0, 0.55),
            Rotation::identity(),
        );
        body.set_velocity(vec3(0.0, 0.0, -2.0));

        let mut contacts = Vec::new();
        find_contacts(&body, &shape, &surfaces, &PhysicsConfig::default(), &mut contacts);
        assert_eq!(contacts.len(), 4);
        for contact in &contacts {
            assert!((contact.distance - 0.05).abs() < 1e-12);
            assert_eq!(contact.closing_velocity(&body), 2.0);
            assert_eq!(contact.penetration(), 0.0);
        }
    }
}
