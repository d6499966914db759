use arrayvec::ArrayVec;

use crate::config::PhysicsConfig;
use crate::math::{Aab, FreeCoordinate, FreePoint, FreeVector, Rotation};
use crate::physics::CollisionShape;
use crate::world::ObjectId;

/// Maximum number of vertices of a [`Surface`] polygon.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// What is on the other side of a [`Surface`], which determines how colliding with it
/// is handled.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum SurfaceKind {
    /// Immovable scenery.
    Static,
    /// A face of another simulated object, which receives the reaction to any contact.
    Object(ObjectId),
    /// A volume which reports overlaps but does not obstruct movement.
    Trigger(u32),
    /// A pickup which reports overlaps but does not obstruct movement.
    Item(u32),
    /// The remains of a character, which do not obstruct movement.
    Corpse,
}

impl SurfaceKind {
    /// Returns the mask bit which selects this kind of surface.
    pub fn mask(self) -> SurfaceMask {
        match self {
            SurfaceKind::Static => SurfaceMask::STATIC,
            SurfaceKind::Object(_) => SurfaceMask::OBJECT,
            SurfaceKind::Trigger(_) => SurfaceMask::TRIGGER,
            SurfaceKind::Item(_) => SurfaceMask::ITEM,
            SurfaceKind::Corpse => SurfaceMask::CORPSE,
        }
    }

    /// Whether this surface obstructs movement and produces contact forces.
    pub fn is_solid(self) -> bool {
        SurfaceMask::SOLID.contains(self.mask())
    }

    /// Returns the object which should receive reaction impulses, if any.
    pub fn object(self) -> Option<ObjectId> {
        match self {
            SurfaceKind::Object(id) => Some(id),
            _ => None,
        }
    }
}

bitflags::bitflags! {
    /// Selects which kinds of [`Surface`] a [`CollisionQuery`] returns.
    #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
    pub struct SurfaceMask: u8 {
        /// [`SurfaceKind::Static`]
        const STATIC = 1 << 0;
        /// [`SurfaceKind::Object`]
        const OBJECT = 1 << 1;
        /// [`SurfaceKind::Trigger`]
        const TRIGGER = 1 << 2;
        /// [`SurfaceKind::Item`]
        const ITEM = 1 << 3;
        /// [`SurfaceKind::Corpse`]
        const CORPSE = 1 << 4;
        /// Surfaces which obstruct movement.
        const SOLID = Self::STATIC.bits() | Self::OBJECT.bits();
    }
}

/// A one-sided convex polygon that bodies and characters collide with.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Surface {
    /// Vertices, counterclockwise around `normal`.
    pub polygon: ArrayVec<FreePoint, MAX_POLYGON_VERTICES>,
    /// Unit normal of the side that obstructs.
    pub normal: FreeVector,
    /// Multiplier for the friction coefficient of whatever touches this surface.
    pub friction: FreeCoordinate,
    /// What this surface belongs to.
    pub kind: SurfaceKind,
    /// Velocity of the surface, for surfaces of moving objects.
    pub velocity: FreeVector,
    /// Inverse mass of the object this surface belongs to; zero for immovable surfaces.
    pub inverse_mass: FreeCoordinate,
}

impl Surface {
    /// Constructs a stationary surface with unit friction from a polygon given
    /// counterclockwise around its front side.
    ///
    /// Returns [`None`] if there are fewer than 3 or more than [`MAX_POLYGON_VERTICES`]
    /// points, or if they do not span an area.
    pub fn new(points: impl IntoIterator<Item = FreePoint>, kind: SurfaceKind) -> Option<Self> {
        let mut polygon = ArrayVec::new();
        for point in points {
            polygon.try_push(point).ok()?;
        }
        if polygon.len() < 3 {
            return None;
        }
        // Newell's method, which tolerates slightly non-planar input.
        let mut normal = FreeVector::zero();
        for (i, a) in polygon.iter().enumerate() {
            let b = polygon[(i + 1) % polygon.len()];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        let normal = normal.try_normalize()?;
        Some(Self {
            polygon,
            normal,
            friction: 1.0,
            kind,
            velocity: FreeVector::zero(),
            inverse_mass: 0.0,
        })
    }

    /// Sets the friction multiplier.
    #[must_use]
    pub fn with_friction(mut self, friction: FreeCoordinate) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the motion of the object this surface belongs to.
    #[must_use]
    pub fn with_motion(mut self, velocity: FreeVector, inverse_mass: FreeCoordinate) -> Self {
        self.velocity = velocity;
        self.inverse_mass = inverse_mass;
        self
    }

    /// Signed distance of `point` from the plane of the surface, positive on the front side.
    pub fn signed_distance(&self, point: FreePoint) -> FreeCoordinate {
        (point - self.polygon[0]).dot(self.normal)
    }

    /// Whether the projection of `point` onto the plane of the surface lies within the
    /// polygon, allowing `tolerance` outside each edge.
    pub fn contains_projection(&self, point: FreePoint, tolerance: FreeCoordinate) -> bool {
        self.edges().all(|(a, b)| {
            let inward = self.normal.cross(b - a);
            let length = inward.length();
            length == 0.0 || (point - a).dot(inward) / length >= -tolerance
        })
    }

    /// Iterates over the edges of the polygon as pairs of endpoints.
    pub fn edges(&self) -> impl Iterator<Item = (FreePoint, FreePoint)> + '_ {
        let n = self.polygon.len();
        (0..n).map(move |i| (self.polygon[i], self.polygon[(i + 1) % n]))
    }

    /// Height of the highest vertex.
    pub fn highest_point(&self) -> FreeCoordinate {
        self.polygon
            .iter()
            .map(|p| p.z)
            .fold(FreeCoordinate::NEG_INFINITY, FreeCoordinate::max)
    }

    /// Average of the vertices.
    pub fn centroid(&self) -> FreePoint {
        let sum: FreeVector = self.polygon.iter().map(|p| p.to_vector()).sum();
        (sum / self.polygon.len() as FreeCoordinate).to_point()
    }

    /// Bounding box of the polygon.
    pub fn bounds(&self) -> Aab {
        Aab::from_points(self.polygon.iter().copied()).unwrap_or(Aab::ZERO)
    }
}

/// The capability of finding the surfaces near some region of space.
///
/// Implementations must return surfaces in an order that does not change between calls
/// with the same arguments, so that contact resolution is repeatable.
pub trait CollisionQuery {
    /// Appends to `out` every surface selected by `mask` which may intersect `region`.
    fn find_surfaces(&self, region: &Aab, mask: SurfaceMask, out: &mut Vec<Surface>);
}

impl<T: CollisionQuery + ?Sized> CollisionQuery for &T {
    fn find_surfaces(&self, region: &Aab, mask: SurfaceMask, out: &mut Vec<Surface>) {
        (**self).find_surfaces(region, mask, out);
    }
}

/// A [`CollisionQuery`] over a fixed list of surfaces.
#[derive(Clone, Debug, Default)]
pub struct StaticScene {
    entries: Vec<(Aab, Surface)>,
}

impl StaticScene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a surface to the scene.
    pub fn add_surface(&mut self, surface: Surface) -> &mut Self {
        self.entries.push((surface.bounds(), surface));
        self
    }

    /// Adds a static polygon, given counterclockwise around its front side.
    ///
    /// Panics if the polygon is degenerate or has too many vertices.
    #[track_caller]
    pub fn add_polygon(&mut self, points: impl IntoIterator<Item = FreePoint>) -> &mut Self {
        match Surface::new(points, SurfaceKind::Static) {
            Some(surface) => self.add_surface(surface),
            None => panic!("invalid polygon for static scene"),
        }
    }

    /// Adds a square through `point`, facing `normal`, extending `half_size` in each
    /// direction along the plane.
    ///
    /// Panics if `normal` is zero.
    #[track_caller]
    pub fn add_plane(
        &mut self,
        point: FreePoint,
        normal: FreeVector,
        half_size: FreeCoordinate,
    ) -> &mut Self {
        let n = normal.normalize();
        let helper = if n.z.abs() < 0.9 {
            FreeVector::new(0.0, 0.0, 1.0)
        } else {
            FreeVector::new(1.0, 0.0, 0.0)
        };
        let u = n.cross(helper).normalize() * half_size;
        let w = n.cross(u);
        self.add_polygon([point - u - w, point + u - w, point + u + w, point - u + w])
    }

    /// Adds the six outward faces of a solid box.
    ///
    /// Panics if the box is flat in any axis.
    #[track_caller]
    pub fn add_box(&mut self, aab: Aab) -> &mut Self {
        let mut faces = Vec::with_capacity(6);
        CollisionShape::cuboid((aab.size() / 2.0).cast_unit()).push_world_faces(
            aab.center(),
            &Rotation::identity(),
            SurfaceKind::Static,
            &mut faces,
        );
        for face in faces {
            self.add_surface(face);
        }
        self
    }

    /// Number of surfaces in the scene.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the scene has no surfaces.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CollisionQuery for StaticScene {
    fn find_surfaces(&self, region: &Aab, mask: SurfaceMask, out: &mut Vec<Surface>) {
        out.extend(
            self.entries
                .iter()
                .filter(|(bounds, surface)| {
                    mask.contains(surface.kind.mask()) && bounds.intersects(*region)
                })
                .map(|(_, surface)| surface.clone()),
        );
    }
}

/// An object's cached result of a [`CollisionQuery`], refreshed only when the object
/// leaves the cached region or the result becomes too old.
#[derive(Clone, Debug, Default)]
pub struct WorkingSet {
    region: Option<Aab>,
    surfaces: Vec<Surface>,
    age: u32,
}

impl WorkingSet {
    /// Creates an empty working set which will be filled on first use.
    pub fn new() -> Self {
        Self::default()
    }

    /// The region the cached surfaces were found in.
    pub fn region(&self) -> Option<Aab> {
        self.region
    }

    /// The cached surfaces.
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    /// Number of ticks since the last refresh.
    pub fn age(&self) -> u32 {
        self.age
    }

    /// Makes sure the cached surfaces cover `needed`, querying again if they do not or if
    /// they are stale. Call once per tick. Returns whether the query was repeated.
    pub fn update<Q: CollisionQuery + ?Sized>(
        &mut self,
        query: &Q,
        needed: Aab,
        mask: SurfaceMask,
        config: &PhysicsConfig,
    ) -> bool {
        match self.region {
            Some(region) if region.contains_aab(needed) && self.age < config.working_set_max_age => {
                self.age += 1;
                false
            }
            _ => {
                let region = needed.expand(config.working_set_margin);
                self.surfaces.clear();
                query.find_surfaces(&region, mask, &mut self.surfaces);
                log::trace!(
                    "working set refreshed after {} ticks: {} surfaces",
                    self.age,
                    self.surfaces.len()
                );
                self.region = Some(region);
                self.age = 0;
                true
            }
        }
    }

    /// Forces the next [`Self::update()`] to query again.
    pub fn invalidate(&mut self) {
        self.region = None;
    }
}
