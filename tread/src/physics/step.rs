use core::fmt;

use arrayvec::ArrayVec;
use manyfmt::Refmt as _;

use crate::config::PhysicsConfig;
use crate::math::{FreeCoordinate, FreePoint, FreeVector};
use crate::physics::{
    CollisionShape, RigidBody, RigidImpulse, Surface, SurfaceKind, find_contacts,
    resolve_contacts, sweep_and_resolve,
};
use crate::time::Tick;
use crate::util::ConciseDebug;
use crate::world::ObjectId;

// -------------------------------------------------------------------------------------------------

/// An impulse to be applied to another object once every object has stepped.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct QueuedImpulse {
    /// Object to receive the impulse.
    pub target: ObjectId,
    /// World position at which the impulse acts.
    pub point: FreePoint,
    /// The impulse, in newton-seconds.
    pub impulse: FreeVector,
}

/// Impulses that objects impart to each other during a tick.
///
/// Objects never modify each other while stepping; instead they push the reactions of
/// their contacts here, and the queue is applied after all objects have stepped, so the
/// order in which objects are stepped does not matter.
#[derive(Clone, Debug, Default)]
pub struct ImpulseQueue {
    entries: Vec<QueuedImpulse>,
}

impl ImpulseQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an impulse for `target`.
    pub fn push(&mut self, target: ObjectId, point: FreePoint, impulse: FreeVector) {
        self.entries.push(QueuedImpulse {
            target,
            point,
            impulse,
        });
    }

    /// Iterates over the queued impulses in the order they were pushed.
    pub fn iter(&self) -> impl Iterator<Item = &QueuedImpulse> + '_ {
        self.entries.iter()
    }

    /// Removes and returns all queued impulses.
    pub fn drain(&mut self) -> impl Iterator<Item = QueuedImpulse> + '_ {
        self.entries.drain(..)
    }

    /// Number of queued impulses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no impulses are queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// -------------------------------------------------------------------------------------------------

/// Something attached to a rigid body which applies forces to it each sub-step,
/// such as the wheels of a vehicle.
pub trait Actuator {
    /// Applies forces to `body` for a sub-step of `dt` seconds.
    ///
    /// Returns whether the body is being held up by this actuator's contact with the
    /// ground, which allows it to come to rest.
    fn actuate(
        &mut self,
        body: &mut RigidBody,
        surfaces: &[Surface],
        dt: FreeCoordinate,
        impulses: &mut ImpulseQueue,
    ) -> bool;
}

/// No forces.
impl Actuator for () {
    fn actuate(
        &mut self,
        _: &mut RigidBody,
        _: &[Surface],
        _: FreeCoordinate,
        _: &mut ImpulseQueue,
    ) -> bool {
        false
    }
}

// -------------------------------------------------------------------------------------------------

/// Diagnostic data produced by [`step_one_body()`].
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct BodyStepInfo {
    /// Whether the body was at rest, so nothing was computed.
    pub quiescent: bool,
    /// Number of collision impulses applied, over all sub-steps.
    pub collisions: u32,
    /// Number of sub-steps in which collision resolution hit its iteration limit.
    pub unconverged: u32,
    /// Number of resting contacts in the last sub-step.
    pub resting_contacts: u32,
    /// Number of sub-steps in which the body moved fast enough to be swept, and hit
    /// something.
    pub swept_hits: u32,
    /// Non-solid surfaces touched.
    pub overlaps: ArrayVec<SurfaceKind, 4>,
    /// Whether the body came to rest at the end of this step.
    pub came_to_rest: bool,
    /// Change in velocity during this step.
    pub delta_v: FreeVector,
}

impl manyfmt::Fmt<ConciseDebug> for BodyStepInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, fopt: &ConciseDebug) -> fmt::Result {
        if self.quiescent {
            return write!(fmt, "at rest");
        }
        write!(
            fmt,
            "Δv {:?}, {} collisions, {} resting",
            self.delta_v.refmt(fopt),
            self.collisions,
            self.resting_contacts
        )?;
        if self.unconverged > 0 {
            write!(fmt, ", {} unconverged", self.unconverged)?;
        }
        if self.swept_hits > 0 {
            write!(fmt, ", {} swept", self.swept_hits)?;
        }
        if !self.overlaps.is_empty() {
            write!(fmt, ", overlapping {:?}", self.overlaps)?;
        }
        if self.came_to_rest {
            write!(fmt, ", came to rest")?;
        }
        Ok(())
    }
}

/// Advances one body by one tick.
///
/// The tick is divided into `config.substeps` sub-steps. In each, the body receives gravity
/// and the forces of `actuator`, its contacts with `surfaces` are resolved, and it is
/// integrated; if it would move further than its inner radius in one sub-step, its
/// movement is swept to keep it from passing through thin surfaces.
/// Afterward, the body is put at rest if it has been still and supported for long enough.
pub fn step_one_body<A: Actuator + ?Sized>(
    body: &mut RigidBody,
    shape: &CollisionShape,
    surfaces: &[Surface],
    tick: Tick,
    config: &PhysicsConfig,
    actuator: &mut A,
    impulses: &mut ImpulseQueue,
) -> BodyStepInfo {
    let velocity_before = body.velocity();
    if body.is_at_rest() || tick.paused() {
        return BodyStepInfo {
            quiescent: true,
            ..BodyStepInfo::default()
        };
    }

    let substeps = config.substeps.max(1);
    let dt = tick.delta_t_f64() / FreeCoordinate::from(substeps);
    let guard_radius = shape.inner_radius();
    let mut info = BodyStepInfo::default();
    let mut contacts = Vec::new();
    let mut supported = false;

    for _ in 0..substeps {
        body.clear_forces();
        body.apply_central_force(config.gravity * body.mass());
        let actuated = actuator.actuate(body, surfaces, dt, impulses);

        contacts.clear();
        find_contacts(body, shape, surfaces, config, &mut contacts);
        let resolved = resolve_contacts(body, &contacts, dt, config, impulses);
        info.collisions += resolved.collisions;
        info.unconverged += u32::from(!resolved.converged);
        info.resting_contacts = resolved.resting;
        for kind in resolved.overlaps {
            if !info.overlaps.contains(&kind) {
                let _ = info.overlaps.try_push(kind);
            }
        }
        supported = actuated || resolved.resting > 0;

        let restitution = body.restitution;
        let mass = body.mass();
        let mut swept = false;
        body.integrate_with(dt, config, |center, velocity, sub_dt| {
            let delta = *velocity * sub_dt;
            if delta.length() <= guard_radius {
                return delta;
            }
            let outcome = sweep_and_resolve(
                center,
                guard_radius,
                *velocity,
                sub_dt,
                surfaces,
                config.max_collision_iterations,
                &mut RigidImpulse::new(restitution),
            );
            swept = !outcome.hits.is_empty();
            for hit in &outcome.hits {
                if let Some(other) = surfaces[hit.surface].kind.object() {
                    if hit.closing_speed > 0.0 {
                        let transferred = mass * hit.closing_speed * (1.0 + restitution);
                        impulses.push(other, hit.point, -hit.normal * transferred);
                    }
                }
            }
            *velocity = outcome.velocity;
            outcome.position - center
        });
        info.swept_hits += u32::from(swept);
    }

    info.came_to_rest = body.update_rest(config, supported);
    if info.came_to_rest {
        log::debug!("body came to rest at {:?}", body.position().refmt(&ConciseDebug));
    }
    info.delta_v = body.velocity() - velocity_before;
    info
}
