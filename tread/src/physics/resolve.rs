use core::fmt;

use arrayvec::ArrayVec;
use manyfmt::Refmt as _;

use crate::config::PhysicsConfig;
use crate::math::{FreeCoordinate, FreeVector, project_onto_plane};
use crate::physics::{Contact, ImpulseQueue, RigidBody, SurfaceKind};
use crate::util::ConciseDebug;

/// Tangential speeds below this are not opposed by friction.
const SLIP_EPSILON: FreeCoordinate = 1e-9;

/// Maximum number of distinct non-solid surfaces reported in a [`ResolveInfo`].
const RECORDED_OVERLAPS: usize = 4;

/// Summary of one call to [`resolve_contacts()`].
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct ResolveInfo {
    /// Number of collision impulses applied.
    pub collisions: u32,
    /// False if the iteration limit was reached with fast contacts remaining.
    /// Those contacts were dropped for this sub-step.
    pub converged: bool,
    /// Number of contacts that received penalty forces.
    pub resting: u32,
    /// Non-solid surfaces touched, without duplicates.
    pub overlaps: ArrayVec<SurfaceKind, RECORDED_OVERLAPS>,
}

impl manyfmt::Fmt<ConciseDebug> for ResolveInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        write!(
            fmt,
            "{} collisions{}, {} resting",
            self.collisions,
            if self.converged { "" } else { " (unconverged)" },
            self.resting
        )?;
        if !self.overlaps.is_empty() {
            write!(fmt, ", overlapping {:?}", self.overlaps)?;
        }
        Ok(())
    }
}

/// Resolves a body's contacts for one sub-step of length `dt`.
///
/// First, contacts closing faster than `config.contact_velocity_tolerance` are treated as
/// collisions: the first such contact, in the order given, receives an impulse, closing
/// velocities are recomputed, and this repeats until none is fast or
/// `config.max_collision_iterations` impulses have been applied.
///
/// Then every remaining contact receives a penalty spring force and a friction force,
/// accumulated into the body for the next integration.
///
/// Reactions against [`SurfaceKind::Object`] surfaces are pushed to `impulses`.
/// Non-solid surfaces are only reported.
pub fn resolve_contacts(
    body: &mut RigidBody,
    contacts: &[Contact],
    dt: FreeCoordinate,
    config: &PhysicsConfig,
    impulses: &mut ImpulseQueue,
) -> ResolveInfo {
    let mut info = ResolveInfo {
        converged: true,
        ..ResolveInfo::default()
    };
    for contact in contacts {
        if !contact.kind.is_solid() && !info.overlaps.contains(&contact.kind) {
            let _ = info.overlaps.try_push(contact.kind);
        }
    }
    let solid = || contacts.iter().filter(|c| c.kind.is_solid());

    loop {
        let Some(contact) = solid()
            .find(|c| c.closing_velocity(body) > config.contact_velocity_tolerance)
        else {
            break;
        };
        if info.collisions >= config.max_collision_iterations {
            log::trace!(
                "collision resolution did not converge after {} impulses; dropping {:?}",
                info.collisions,
                contact
            );
            info.converged = false;
            break;
        }
        apply_collision_impulse(body, contact, impulses);
        info.collisions += 1;
    }

    let resting: ArrayVec<&Contact, 64> = solid()
        .filter(|c| c.closing_velocity(body) <= config.contact_velocity_tolerance)
        .take(64)
        .collect();
    info.resting = resting.len() as u32;
    for contact in &resting {
        apply_penalty_force(body, contact, resting.len(), dt, config, impulses);
    }

    info
}

fn apply_collision_impulse(body: &mut RigidBody, contact: &Contact, impulses: &mut ImpulseQueue) {
    let normal = contact.normal;
    let offset = contact.point - body.center_of_mass();
    let relative = contact.relative_velocity(body);
    let closing = -relative.dot(normal);

    let normal_magnitude =
        (1.0 + body.restitution) * closing / effective_inverse_mass(body, contact, normal);
    let mut impulse = normal * normal_magnitude;

    let slip = project_onto_plane(relative, normal);
    let slip_speed = slip.length();
    if slip_speed > SLIP_EPSILON {
        let direction = slip / slip_speed;
        let stopping = slip_speed / effective_inverse_mass(body, contact, direction);
        let limit = body.friction * contact.surface_friction * normal_magnitude;
        impulse -= direction * stopping.min(limit);
    }

    body.apply_impulse(contact.point, impulse);
    if let Some(other) = contact.kind.object() {
        impulses.push(other, contact.point, -impulse);
    }
    log::trace!(
        "collision impulse {:?} at offset {:?}",
        impulse.refmt(&ConciseDebug),
        offset.refmt(&ConciseDebug)
    );
}

/// Denominator of the single-contact impulse along `direction`:
/// `1/m + d·((I⁻¹(r×d))×r) + 1/m_other`.
fn effective_inverse_mass(body: &RigidBody, contact: &Contact, direction: FreeVector) -> FreeCoordinate {
    let offset = contact.point - body.center_of_mass();
    let angular = body
        .inverse_inertia()
        .transform_vector(offset.cross(direction))
        .cross(offset);
    body.inverse_mass() + direction.dot(angular) + contact.surface_inverse_mass
}

fn apply_penalty_force(
    body: &mut RigidBody,
    contact: &Contact,
    resting_count: usize,
    dt: FreeCoordinate,
    config: &PhysicsConfig,
    impulses: &mut ImpulseQueue,
) {
    let relative = contact.relative_velocity(body);
    let closing = -relative.dot(contact.normal);
    let spring = config.zero_impulse_stiffness * (config.collision_tolerance - contact.distance);
    let damping = config.contact_damping * closing;
    let normal_force = (body.mass() * (spring + damping)).max(0.0);
    let mut force = contact.normal * normal_force;

    // Friction just sufficient to stop slipping over this sub-step, shared between the
    // resting contacts, up to the Coulomb limit.
    let slip = project_onto_plane(relative, contact.normal);
    let slip_speed = slip.length();
    if slip_speed > SLIP_EPSILON && dt > 0.0 {
        let stopping = slip_speed * body.mass() / (dt * resting_count as FreeCoordinate);
        let limit = body.friction * contact.surface_friction * normal_force;
        force -= slip * (stopping.min(limit) / slip_speed);
    }

    body.apply_force(contact.point, force);
    if let Some(other) = contact.kind.object() {
        impulses.push(other, contact.point, -force * dt);
    }
}
