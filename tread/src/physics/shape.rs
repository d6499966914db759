use arrayvec::ArrayVec;

use crate::math::{Aab, FreeCoordinate, FreePoint, LocalPoint, LocalVector, Matrix3, Rotation};
use crate::physics::{MAX_POLYGON_VERTICES, Surface, SurfaceKind};

/// Convex collision volume of a rigid body, in the body's local frame.
///
/// Contacts are generated from the vertices; the faces are used when the shape is itself
/// offered as a surface for other objects to collide with.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionShape {
    vertices: Vec<LocalPoint>,
    /// Each face is a list of indices into `vertices`, counterclockwise around the outward
    /// normal.
    faces: Vec<ArrayVec<u8, MAX_POLYGON_VERTICES>>,
    inner_radius: FreeCoordinate,
    bounding_radius: FreeCoordinate,
}

impl CollisionShape {
    /// A box centered on the local origin, with the given half-extents.
    ///
    /// Panics if any half-extent is not positive.
    #[track_caller]
    pub fn cuboid(half_extents: LocalVector) -> Self {
        let LocalVector { x, y, z, .. } = half_extents;
        assert!(
            x > 0.0 && y > 0.0 && z > 0.0,
            "cuboid half-extents must be positive: {half_extents:?}"
        );
        // Vertex i has bit 0 = +x, bit 1 = +y, bit 2 = +z.
        let vertices = (0..8u8)
            .map(|i| {
                let pick = |bit: u8, h: FreeCoordinate| if i & bit != 0 { h } else { -h };
                LocalPoint::new(pick(1, x), pick(2, y), pick(4, z))
            })
            .collect();
        let faces = [
            [0, 4, 6, 2], // -x
            [1, 3, 7, 5], // +x
            [0, 1, 5, 4], // -y
            [2, 6, 7, 3], // +y
            [0, 2, 3, 1], // -z
            [4, 5, 7, 6], // +z
        ]
        .into_iter()
        .map(ArrayVec::from_iter)
        .collect();
        Self {
            vertices,
            faces,
            inner_radius: x.min(y).min(z),
            bounding_radius: half_extents.length(),
        }
    }

    /// Returns the inertia tensor of a solid box with the given half-extents and mass,
    /// about its center.
    pub fn cuboid_inertia(half_extents: LocalVector, mass: FreeCoordinate) -> Matrix3 {
        let LocalVector { x, y, z, .. } = half_extents;
        let k = mass / 3.0;
        Matrix3::from_diagonal(k * (y * y + z * z), k * (x * x + z * z), k * (x * x + y * y))
    }

    /// Vertices in the body's local frame.
    pub fn vertices(&self) -> &[LocalPoint] {
        &self.vertices
    }

    /// Radius of a sphere around the local origin that fits inside the shape.
    pub fn inner_radius(&self) -> FreeCoordinate {
        self.inner_radius
    }

    /// Radius of a sphere around the local origin that contains the shape.
    pub fn bounding_radius(&self) -> FreeCoordinate {
        self.bounding_radius
    }

    /// Returns the world-space bounding box of the shape placed with the given transform.
    pub fn world_bounds(&self, position: FreePoint, orientation: &Rotation) -> Aab {
        Aab::from_points(
            self.vertices
                .iter()
                .map(|&v| position + orientation.transform_point3d(v).to_vector()),
        )
        .unwrap_or(Aab::ZERO)
    }

    /// Appends the faces of the shape, placed with the given transform, to `out` as
    /// surfaces of the given kind.
    pub fn push_world_faces(
        &self,
        position: FreePoint,
        orientation: &Rotation,
        kind: SurfaceKind,
        out: &mut Vec<Surface>,
    ) {
        for face in &self.faces {
            let polygon = face.iter().map(|&i| {
                position
                    + orientation
                        .transform_point3d(self.vertices[usize::from(i)])
                        .to_vector()
            });
            if let Some(surface) = Surface::new(polygon, kind) {
                out.push(surface);
            }
        }
    }
}
