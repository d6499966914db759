//! [`World`], the container of everything that is simulated together.

use std::collections::BTreeMap;
use std::fmt;

use euclid::Vector3D;
use manyfmt::Refmt as _;

use crate::character::{Character, CharacterStepInfo};
use crate::config::SimConfig;
use crate::math::{Aab, FreeCoordinate, FreePoint, FreeVector};
use crate::net::{
    AuthoritativeState, Correction, InputRecord, MovementDelta, Networked, Pose, ReconcileMode,
    StateUpdate, TickAction, UpdateSchedule,
};
use crate::physics::{
    BodyStepInfo, CollisionQuery, CollisionShape, ImpulseQueue, RigidBody, Surface, SurfaceKind,
    SurfaceMask, WorkingSet, step_one_body,
};
use crate::time::{Clock, TickNumber};
use crate::util::ConciseDebug;
use crate::vehicle::{Vehicle, VehicleStepInfo};

#[cfg(test)]
mod tests;

/// Identifies an object in a [`World`].
///
/// Servers and clients use the same identifiers for the same objects.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct ObjectId(u32);

impl ObjectId {
    /// Wraps a raw identifier.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw identifier.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "#{}", self.0)
    }
}

/// Something simulated in a [`World`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Object {
    /// A free rigid body.
    Body {
        /// Its dynamics.
        body: RigidBody,
        /// Its collision shape.
        shape: CollisionShape,
    },
    /// A wheeled vehicle.
    Vehicle(Vehicle),
    /// A walking character.
    Character(Character),
}

impl Object {
    /// Current pose.
    pub fn pose(&self) -> Pose {
        Networked::pose(self)
    }

    /// Current velocity.
    pub fn velocity(&self) -> FreeVector {
        match self {
            Object::Body { body, .. } => body.velocity(),
            Object::Vehicle(vehicle) => vehicle.body().velocity(),
            Object::Character(character) => character.velocity(),
        }
    }

    /// Whether the object is at rest. Characters never are.
    pub fn is_at_rest(&self) -> bool {
        match self {
            Object::Body { body, .. } => body.is_at_rest(),
            Object::Vehicle(vehicle) => vehicle.body().is_at_rest(),
            Object::Character(_) => false,
        }
    }

    /// Applies an impulse received from another object.
    pub fn apply_impulse(&mut self, point: FreePoint, impulse: FreeVector) {
        match self {
            Object::Body { body, .. } => body.apply_impulse(point, impulse),
            Object::Vehicle(vehicle) => vehicle.body_mut().apply_impulse(point, impulse),
            Object::Character(character) => {
                if character.mass() > 0.0 {
                    let velocity = character.velocity() + impulse / character.mass();
                    character.set_velocity(velocity);
                }
            }
        }
    }

    /// Returns the region that this object may touch during a tick of length `dt`.
    fn reach(&self, dt: FreeCoordinate, config: &SimConfig) -> Aab {
        let motion = self.velocity() * dt;
        match self {
            Object::Body { body, shape } => shape
                .world_bounds(body.position(), &body.orientation())
                .swept(motion)
                .expand(config.physics.collision_tolerance),
            Object::Vehicle(vehicle) => vehicle
                .shape()
                .world_bounds(vehicle.body().position(), &vehicle.body().orientation())
                .swept(motion)
                .expand(vehicle.spring().length + vehicle.tire().radius),
            Object::Character(character) => {
                let center = character.center();
                let radius = Vector3D::splat(config.character.radius);
                Aab::from_lower_upper(center - radius, center + radius)
                    .swept(motion)
                    .expand(config.character.step_height + config.character.ground_probe_distance)
            }
        }
    }

    /// Appends the faces other objects collide with. Characters have none.
    fn push_proxy_faces(&self, id: ObjectId, out: &mut Vec<Surface>) {
        let (body, shape) = match self {
            Object::Body { body, shape } => (body, shape),
            Object::Vehicle(vehicle) => (vehicle.body(), vehicle.shape()),
            Object::Character(_) => return,
        };
        let start = out.len();
        shape.push_world_faces(
            body.position(),
            &body.orientation(),
            SurfaceKind::Object(id),
            out,
        );
        for surface in &mut out[start..] {
            surface.velocity = body.velocity();
            surface.inverse_mass = body.inverse_mass();
        }
    }
}

impl Networked for Object {
    fn authoritative_state(&self) -> AuthoritativeState {
        match self {
            Object::Body { body, .. } => body.authoritative_state(),
            Object::Vehicle(vehicle) => vehicle.authoritative_state(),
            Object::Character(character) => character.authoritative_state(),
        }
    }

    fn apply_authoritative_state(&mut self, state: &AuthoritativeState) {
        match self {
            Object::Body { body, .. } => body.apply_authoritative_state(state),
            Object::Vehicle(vehicle) => vehicle.apply_authoritative_state(state),
            Object::Character(character) => character.apply_authoritative_state(state),
        }
    }

    fn net_mass(&self) -> FreeCoordinate {
        match self {
            Object::Body { body, .. } => body.net_mass(),
            Object::Vehicle(vehicle) => vehicle.net_mass(),
            Object::Character(character) => character.net_mass(),
        }
    }

    fn pose(&self) -> Pose {
        match self {
            Object::Body { body, .. } => body.pose(),
            Object::Vehicle(vehicle) => Networked::pose(vehicle),
            Object::Character(character) => Networked::pose(character),
        }
    }

    fn set_pose(&mut self, pose: Pose) {
        match self {
            Object::Body { body, .. } => Networked::set_pose(body, pose),
            Object::Vehicle(vehicle) => Networked::set_pose(vehicle, pose),
            Object::Character(character) => Networked::set_pose(character, pose),
        }
    }
}

/// Which side of a network connection a [`World`] is on.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Role {
    /// Simulates authoritatively and broadcasts state.
    Server,
    /// Predicts, and reconciles with state received from a server.
    Client,
}

#[derive(Clone, Debug)]
struct Entry {
    object: Object,
    working_set: WorkingSet,
    delta: MovementDelta,
    schedule: UpdateSchedule,
}

/// A set of objects simulated together against the surfaces of a [`CollisionQuery`].
///
/// Each tick, every object is stepped against its own cached working set of surfaces plus
/// the faces of the other objects as they were at the start of the tick. Reactions
/// between objects are queued and applied after all objects have stepped, so the result
/// does not depend on the order of objects.
#[derive(Debug)]
pub struct World<Q> {
    query: Q,
    config: SimConfig,
    role: Role,
    clock: Clock,
    entries: BTreeMap<ObjectId, Entry>,
    next_id: u32,

    /// Reused between ticks.
    impulses: ImpulseQueue,
    /// Reused between ticks.
    proxies: Vec<Surface>,
    /// Reused between ticks.
    surfaces: Vec<Surface>,
}

impl<Q: CollisionQuery> World<Q> {
    /// Creates an empty world whose first tick will be number 0.
    pub fn new(query: Q, config: SimConfig, role: Role) -> Self {
        Self {
            clock: Clock::new(config.tick_schedule(), 0),
            query,
            config,
            role,
            entries: BTreeMap::new(),
            next_id: 0,
            impulses: ImpulseQueue::new(),
            proxies: Vec::new(),
            surfaces: Vec::new(),
        }
    }

    /// The configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Whether this is a server or a client world.
    pub fn role(&self) -> Role {
        self.role
    }

    /// The scenery.
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Number of the next tick to be stepped.
    pub fn next_tick_number(&self) -> TickNumber {
        self.clock.next_number()
    }

    /// Adds an object under a newly allocated identifier.
    pub fn insert(&mut self, object: Object) -> ObjectId {
        while self.entries.contains_key(&ObjectId(self.next_id)) {
            self.next_id = self.next_id.wrapping_add(1);
        }
        let id = ObjectId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.insert_as(id, object);
        id
    }

    /// Adds an object under the given identifier, as a client does for objects the server
    /// announced. Returns the object it replaced, if any.
    pub fn insert_as(&mut self, id: ObjectId, object: Object) -> Option<Object> {
        let pose = object.pose();
        let delta = match self.role {
            Role::Server => MovementDelta::server(pose),
            Role::Client => MovementDelta::client(pose, &self.config.net),
        };
        let entry = Entry {
            object,
            working_set: WorkingSet::new(),
            delta,
            schedule: UpdateSchedule::new(&self.config.net),
        };
        self.entries.insert(id, entry).map(|old| old.object)
    }

    /// Removes an object.
    pub fn remove(&mut self, id: ObjectId) -> Option<Object> {
        self.entries.remove(&id).map(|entry| entry.object)
    }

    /// Returns an object.
    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.entries.get(&id).map(|entry| &entry.object)
    }

    /// Returns an object for modification.
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.entries.get_mut(&id).map(|entry| &mut entry.object)
    }

    /// Iterates over all objects in identifier order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> + '_ {
        self.entries.iter().map(|(&id, entry)| (id, &entry.object))
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no objects.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How an object is being reconciled with the server.
    pub fn reconcile_mode(&self, id: ObjectId) -> Option<ReconcileMode> {
        self.entries.get(&id).map(|entry| entry.delta.mode())
    }

    /// Pose to draw an object at, `alpha` of the way through the tick after the last one
    /// stepped.
    pub fn render_pose(&self, id: ObjectId, alpha: FreeCoordinate) -> Option<Pose> {
        self.entries.get(&id).map(|entry| entry.delta.render_pose(alpha))
    }

    /// Gives a client's input to the vehicle or character it controls.
    /// Returns false if there is no such object, or it does not take input.
    pub fn apply_input(&mut self, id: ObjectId, input: &InputRecord) -> bool {
        match self.entries.get_mut(&id).map(|entry| &mut entry.object) {
            Some(Object::Vehicle(vehicle)) => {
                vehicle.apply_input(input);
                true
            }
            Some(Object::Character(character)) => {
                character.apply_input(input);
                true
            }
            _ => false,
        }
    }

    /// Reconciles an object with state received from the server, which is
    /// `latency_ticks` old. Returns [`None`] if there is no such object.
    pub fn receive(&mut self, update: &StateUpdate, latency_ticks: u32) -> Option<Correction> {
        let dt = self.config.tick_seconds();
        let entry = self.entries.get_mut(&update.object)?;
        Some(entry.delta.receive(
            &mut entry.object,
            update.tick,
            &update.state,
            latency_ticks,
            dt,
            &self.config.net,
        ))
    }

    /// Advances every object by one tick.
    ///
    /// On a server, the returned info includes the state updates due to be broadcast.
    pub fn step(&mut self, paused: bool) -> WorldStepInfo {
        let tick = self.clock.advance(paused);
        let mut info = WorldStepInfo {
            tick: tick.number(),
            paused,
            ..WorldStepInfo::default()
        };
        if paused {
            return info;
        }
        let dt = tick.delta_t_f64();

        self.proxies.clear();
        for (&id, entry) in &self.entries {
            entry.object.push_proxy_faces(id, &mut self.proxies);
        }

        for (&id, entry) in &mut self.entries {
            if entry.delta.begin_tick(&mut entry.object) == TickAction::Hold {
                info.held += 1;
                entry.delta.end_tick(&entry.object);
                info.objects.push((id, ObjectStepInfo::Held));
                continue;
            }

            let reach = entry.object.reach(dt, &self.config);
            if entry
                .working_set
                .update(&self.query, reach, SurfaceMask::all(), &self.config.physics)
            {
                info.queries += 1;
            }
            self.surfaces.clear();
            self.surfaces.extend_from_slice(entry.working_set.surfaces());
            self.surfaces.extend(
                self.proxies
                    .iter()
                    .filter(|s| s.kind != SurfaceKind::Object(id) && s.bounds().intersects(reach))
                    .cloned(),
            );

            let physics = &self.config.physics;
            let object_info = match &mut entry.object {
                Object::Body { body, shape } => ObjectStepInfo::Body(step_one_body(
                    body,
                    shape,
                    &self.surfaces,
                    tick,
                    physics,
                    &mut (),
                    &mut self.impulses,
                )),
                Object::Vehicle(vehicle) => ObjectStepInfo::Vehicle(vehicle.step(
                    &self.surfaces,
                    tick,
                    physics,
                    &mut self.impulses,
                )),
                Object::Character(character) => ObjectStepInfo::Character(character.step(
                    &self.surfaces,
                    tick,
                    physics,
                    &self.config.character,
                    &mut self.impulses,
                )),
            };
            entry.delta.end_tick(&entry.object);
            info.stepped += 1;
            info.objects.push((id, object_info));
        }

        for queued in self.impulses.drain() {
            if let Some(entry) = self.entries.get_mut(&queued.target) {
                entry.object.apply_impulse(queued.point, queued.impulse);
                info.impulses += 1;
            }
        }

        if self.role == Role::Server {
            for (&id, entry) in &mut self.entries {
                if entry.schedule.should_send(tick, entry.object.is_at_rest()) {
                    info.updates.push(StateUpdate::new(
                        id,
                        tick.number(),
                        entry.object.authoritative_state(),
                    ));
                }
            }
        }

        log::trace!("{:?}", info.refmt(&ConciseDebug));
        info
    }
}

/// What happened to one object during [`World::step()`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum ObjectStepInfo {
    /// A free body was stepped.
    Body(BodyStepInfo),
    /// A vehicle was stepped.
    Vehicle(VehicleStepInfo),
    /// A character was stepped.
    Character(CharacterStepInfo),
    /// The object was not stepped, because it is being warped or its prediction ran out.
    Held,
}

/// Diagnostic data produced by [`World::step()`].
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct WorldStepInfo {
    /// Number of the tick.
    pub tick: TickNumber,
    /// Whether the tick was paused, so nothing happened.
    pub paused: bool,
    /// Number of objects stepped.
    pub stepped: u32,
    /// Number of objects not stepped because of reconciliation.
    pub held: u32,
    /// Number of working sets refreshed from the collision query.
    pub queries: u32,
    /// Number of impulses objects imparted to each other.
    pub impulses: u32,
    /// Per-object results, in identifier order.
    pub objects: Vec<(ObjectId, ObjectStepInfo)>,
    /// State updates to broadcast (servers only).
    pub updates: Vec<StateUpdate>,
}

impl manyfmt::Fmt<ConciseDebug> for WorldStepInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        if self.paused {
            return write!(fmt, "tick {} paused", self.tick);
        }
        write!(
            fmt,
            "tick {}: {} stepped, {} held, {} queries, {} impulses",
            self.tick, self.stepped, self.held, self.queries, self.impulses
        )?;
        if !self.updates.is_empty() {
            write!(fmt, ", {} updates", self.updates.len())?;
        }
        Ok(())
    }
}
