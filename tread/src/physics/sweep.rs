//! Swept-sphere collision against [`Surface`]s, and the sweep-and-resolve loop shared by
//! rigid bodies and characters.

use arrayvec::ArrayVec;
use manyfmt::Refmt as _;

use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::physics::{POSITION_EPSILON, Surface};
use crate::util::ConciseDebug;

/// Sweeps shorter than this are not performed.
const SWEEP_EPSILON_SQUARED: FreeCoordinate = 1e-12 * 1e-12;

/// Maximum number of hits recorded in a [`SweepOutcome`].
const RECORDED_HITS: usize = 8;

/// The first point at which a swept sphere touches a surface.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct SweepHit {
    /// Fraction of the sweep completed before touching, in `[0, 1]`.
    pub fraction: FreeCoordinate,
    /// Unit vector from the touched point toward the sphere's center.
    /// This is the surface normal for face hits, but not for edge or vertex hits.
    pub normal: FreeVector,
    /// The touched point on the surface.
    pub point: FreePoint,
    /// Index of the touched surface in the list swept against.
    pub surface: usize,
    /// Speed toward the surface at the time of the hit; filled in by
    /// [`sweep_and_resolve()`].
    pub closing_speed: FreeCoordinate,
}

/// Moves a sphere of `radius` centered at `center` along `delta`, and returns where it
/// first touches a solid surface, if anywhere.
///
/// Surfaces are one-sided: a sphere whose center is behind a surface passes through it.
/// A sphere already touching a surface hits it at fraction 0 only if moving toward it.
pub fn sweep_sphere(
    center: FreePoint,
    radius: FreeCoordinate,
    delta: FreeVector,
    surfaces: &[Surface],
) -> Option<SweepHit> {
    let mut best: Option<SweepHit> = None;
    for (index, surface) in surfaces.iter().enumerate() {
        if !surface.kind.is_solid() {
            continue;
        }
        if let Some((fraction, normal, point)) = sweep_polygon(center, radius, delta, surface) {
            if best.is_none_or(|b| fraction < b.fraction) {
                best = Some(SweepHit {
                    fraction,
                    normal,
                    point,
                    surface: index,
                    closing_speed: 0.0,
                });
            }
        }
    }
    best
}

type Touch = (FreeCoordinate, FreeVector, FreePoint);

fn sweep_polygon(
    center: FreePoint,
    radius: FreeCoordinate,
    delta: FreeVector,
    surface: &Surface,
) -> Option<Touch> {
    let normal = surface.normal;
    let start_distance = surface.signed_distance(center);
    if start_distance < 0.0 {
        return None;
    }
    let approach = delta.dot(normal);
    if approach >= 0.0 && start_distance >= radius {
        // Moving away from or along a surface it isn't touching; edges are in the plane and
        // cannot be reached either.
        return None;
    }

    if approach < 0.0 {
        let fraction = if start_distance <= radius {
            0.0
        } else {
            (start_distance - radius) / -approach
        };
        if fraction <= 1.0 {
            let at = center + delta * fraction;
            let touch = at - normal * surface.signed_distance(at);
            if surface.contains_projection(touch, 0.0) {
                // The plane is reached no later than any edge within it.
                return Some((fraction, normal, touch));
            }
        }
    }

    let mut best: Option<Touch> = None;
    let mut consider = |candidate: Option<Touch>| {
        if let Some(candidate) = candidate {
            if best.is_none_or(|b| candidate.0 < b.0) {
                best = Some(candidate);
            }
        }
    };
    for (a, b) in surface.edges() {
        consider(sweep_segment(center, radius, delta, a, b));
        consider(sweep_point(center, radius, delta, a));
    }
    best
}

/// Sphere against the interior of a line segment.
fn sweep_segment(
    center: FreePoint,
    radius: FreeCoordinate,
    delta: FreeVector,
    a: FreePoint,
    b: FreePoint,
) -> Option<Touch> {
    let edge = b - a;
    let edge_sq = edge.square_length();
    if edge_sq == 0.0 {
        return None;
    }
    let m = center - a;
    let m_along = m.dot(edge) / edge_sq;
    let d_along = delta.dot(edge) / edge_sq;
    let m_perp = m - edge * m_along;
    let d_perp = delta - edge * d_along;

    let fraction = earliest_root(
        d_perp.square_length(),
        2.0 * m_perp.dot(d_perp),
        m_perp.square_length() - radius * radius,
    )?;
    let s = m_along + d_along * fraction;
    if !(0.0..=1.0).contains(&s) {
        return None;
    }
    let point = a + edge * s;
    touch_at(center + delta * fraction, point, delta, fraction)
}

/// Sphere against a single point.
fn sweep_point(
    center: FreePoint,
    radius: FreeCoordinate,
    delta: FreeVector,
    point: FreePoint,
) -> Option<Touch> {
    let m = center - point;
    let fraction = earliest_root(
        delta.square_length(),
        2.0 * m.dot(delta),
        m.square_length() - radius * radius,
    )?;
    touch_at(center + delta * fraction, point, delta, fraction)
}

/// Smallest root in `[0, 1]` of `a t² + b t + c`, where `c <= 0` means the sphere is
/// already touching at `t = 0`.
fn earliest_root(a: FreeCoordinate, b: FreeCoordinate, c: FreeCoordinate) -> Option<FreeCoordinate> {
    if c <= 0.0 {
        return (b < 0.0).then_some(0.0);
    }
    if a <= 0.0 {
        return None;
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }
    let t = (-b - discriminant.sqrt()) / (2.0 * a);
    (0.0..=1.0).contains(&t).then_some(t)
}

fn touch_at(
    center_then: FreePoint,
    point: FreePoint,
    delta: FreeVector,
    fraction: FreeCoordinate,
) -> Option<Touch> {
    let normal = (center_then - point).try_normalize()?;
    (normal.dot(delta) < 0.0).then_some((fraction, normal, point))
}

// -------------------------------------------------------------------------------------------------

/// Result of [`raycast()`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct RayHit {
    /// Distance along the ray.
    pub distance: FreeCoordinate,
    /// The point hit.
    pub point: FreePoint,
    /// Normal of the surface hit.
    pub normal: FreeVector,
    /// Index of the surface hit in the list cast against.
    pub surface: usize,
}

/// Finds the first front face of a solid surface along a ray.
///
/// `direction` must be a unit vector.
pub fn raycast(
    origin: FreePoint,
    direction: FreeVector,
    max_distance: FreeCoordinate,
    surfaces: &[Surface],
) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;
    for (index, surface) in surfaces.iter().enumerate() {
        if !surface.kind.is_solid() {
            continue;
        }
        let facing = direction.dot(surface.normal);
        let height = surface.signed_distance(origin);
        if facing >= 0.0 || height < 0.0 {
            continue;
        }
        let distance = height / -facing;
        if distance > max_distance || best.is_some_and(|b| b.distance <= distance) {
            continue;
        }
        let point = origin + direction * distance;
        if surface.contains_projection(point, 0.0) {
            best = Some(RayHit {
                distance,
                point,
                normal: surface.normal,
                surface: index,
            });
        }
    }
    best
}

// -------------------------------------------------------------------------------------------------

/// What a [`ResponsePolicy`] may consult while responding to a hit.
#[derive(Clone, Copy, Debug)]
#[non_exhaustive]
pub struct SweepContext<'a> {
    /// The surfaces being swept against.
    pub surfaces: &'a [Surface],
    /// Radius of the swept sphere.
    pub radius: FreeCoordinate,
}

/// Whether [`sweep_and_resolve()`] should continue after a hit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum Response {
    /// Continue moving with the (possibly changed) velocity for the remaining time.
    Continue,
    /// Stop moving for the rest of the time step.
    Stop,
}

/// How a swept object reacts to touching a surface.
pub trait ResponsePolicy {
    /// Called when the sphere touches a surface. The sphere has already been moved to the
    /// point of contact; the policy may change its velocity and position.
    fn respond(
        &mut self,
        context: &SweepContext<'_>,
        hit: &SweepHit,
        center: &mut FreePoint,
        velocity: &mut FreeVector,
    ) -> Response;
}

/// Response of a rigid body's center: reflect the into-surface velocity, scaled by the
/// restitution.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct RigidImpulse {
    /// Fraction of the into-surface velocity reversed.
    pub restitution: FreeCoordinate,
}

impl RigidImpulse {
    /// Constructs a [`RigidImpulse`] policy.
    pub fn new(restitution: FreeCoordinate) -> Self {
        Self { restitution }
    }
}

impl ResponsePolicy for RigidImpulse {
    fn respond(
        &mut self,
        _: &SweepContext<'_>,
        hit: &SweepHit,
        _: &mut FreePoint,
        velocity: &mut FreeVector,
    ) -> Response {
        let into = velocity.dot(hit.normal);
        if into < 0.0 {
            *velocity -= hit.normal * (into * (1.0 + self.restitution));
        }
        Response::Continue
    }
}

/// Result of [`sweep_and_resolve()`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct SweepOutcome {
    /// Final center of the sphere.
    pub position: FreePoint,
    /// Final velocity.
    pub velocity: FreeVector,
    /// Number of sweeps performed.
    pub sweeps: u32,
    /// Whether the sweep budget ran out with movement remaining, in which case the
    /// velocity was zeroed and the position held where the last sweep ended.
    pub exhausted: bool,
    /// The first hits, in order.
    pub hits: ArrayVec<SweepHit, RECORDED_HITS>,
}

/// Moves a sphere with `velocity` for `dt` seconds through `surfaces`, letting `policy`
/// decide the response to each surface hit, for at most `max_sweeps` straight-line sweeps.
///
/// Each hit consumes the fraction of the remaining time that was spent reaching it.
pub fn sweep_and_resolve<P: ResponsePolicy + ?Sized>(
    center: FreePoint,
    radius: FreeCoordinate,
    velocity: FreeVector,
    dt: FreeCoordinate,
    surfaces: &[Surface],
    max_sweeps: u32,
    policy: &mut P,
) -> SweepOutcome {
    let context = SweepContext { surfaces, radius };
    let mut outcome = SweepOutcome {
        position: center,
        velocity,
        sweeps: 0,
        exhausted: false,
        hits: ArrayVec::new(),
    };
    let mut remaining = dt;
    loop {
        let delta = outcome.velocity * remaining;
        if remaining <= 0.0 || !(delta.square_length() > SWEEP_EPSILON_SQUARED) {
            break;
        }
        if outcome.sweeps >= max_sweeps {
            log::trace!(
                "sweep budget exhausted at {:?} with velocity {:?}",
                outcome.position.refmt(&ConciseDebug),
                outcome.velocity.refmt(&ConciseDebug)
            );
            outcome.exhausted = true;
            outcome.velocity = FreeVector::zero();
            break;
        }
        outcome.sweeps += 1;

        let Some(mut hit) = sweep_sphere(outcome.position, radius, delta, surfaces) else {
            outcome.position += delta;
            break;
        };
        hit.closing_speed = -outcome.velocity.dot(hit.normal);
        outcome.position += delta * hit.fraction + hit.normal * POSITION_EPSILON;
        remaining *= 1.0 - hit.fraction;
        let _ = outcome.hits.try_push(hit);

        match policy.respond(&context, &hit, &mut outcome.position, &mut outcome.velocity) {
            Response::Continue => {}
            Response::Stop => {
                outcome.velocity = FreeVector::zero();
                break;
            }
        }
    }
    outcome
}
