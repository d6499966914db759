use core::fmt;

use manyfmt::Refmt as _;

use crate::config::PhysicsConfig;
use crate::math::{
    FreeCoordinate, FreePoint, FreeVector, LocalPoint, LocalVector, Matrix3, Rotation,
    integrate_rotation, is_finite_vector,
};
use crate::util::ConciseDebug;

/// A rigid body: mass, inertia, and motion.
///
/// Momentum is the primary state. Velocities are derived from it and are updated
/// whenever momentum is changed, so they are always consistent.
///
/// `position` is the origin of the body's local frame, which the center of mass is offset
/// from by [`Self::center_of_mass_offset()`].
#[derive(Clone, PartialEq)]
pub struct RigidBody {
    mass: FreeCoordinate,
    inverse_mass: FreeCoordinate,
    inverse_inertia_local: Matrix3,
    /// Derived from `inverse_inertia_local` and `orientation`.
    inverse_inertia_world: Matrix3,
    com_offset: LocalVector,

    position: FreePoint,
    orientation: Rotation,
    linear_momentum: FreeVector,
    angular_momentum: FreeVector,

    /// Derived from `linear_momentum`.
    velocity: FreeVector,
    /// Derived from `angular_momentum`.
    angular_velocity: FreeVector,

    /// Accumulated since the last [`Self::clear_forces()`].
    force: FreeVector,
    /// Accumulated since the last [`Self::clear_forces()`], about the center of mass.
    torque: FreeVector,

    /// Friction coefficient against surfaces.
    pub friction: FreeCoordinate,
    /// Fraction of closing velocity reversed by collision impulses.
    pub restitution: FreeCoordinate,
    /// Fraction of linear momentum lost per second.
    pub linear_drag: FreeCoordinate,
    /// Fraction of angular momentum lost per second.
    pub angular_drag: FreeCoordinate,

    at_rest: bool,
    still_ticks: u32,
    integrations: u32,
}

impl fmt::Debug for RigidBody {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("RigidBody")
            .field("mass", &self.mass)
            .field("position", &self.position.refmt(&ConciseDebug))
            .field("orientation", &self.orientation.refmt(&ConciseDebug))
            .field("velocity", &self.velocity.refmt(&ConciseDebug))
            .field("angular_velocity", &self.angular_velocity.refmt(&ConciseDebug))
            .field("friction", &self.friction)
            .field("restitution", &self.restitution)
            .field("at_rest", &self.at_rest)
            .finish_non_exhaustive()
    }
}

impl RigidBody {
    /// Constructs a stationary body.
    ///
    /// `inertia` is the inertia tensor about the center of mass, in the local frame.
    /// If it is singular, the body will not rotate.
    pub fn new(
        mass: FreeCoordinate,
        inertia: Matrix3,
        position: FreePoint,
        orientation: Rotation,
    ) -> Self {
        let inverse_inertia_local = inertia.inverse().unwrap_or(Matrix3::ZERO);
        let orientation = orientation.normalize();
        Self {
            mass,
            inverse_mass: if mass > 0.0 { mass.recip() } else { 0.0 },
            inverse_inertia_local,
            inverse_inertia_world: inverse_inertia_local.rotated(&orientation),
            com_offset: LocalVector::zero(),
            position,
            orientation,
            linear_momentum: FreeVector::zero(),
            angular_momentum: FreeVector::zero(),
            velocity: FreeVector::zero(),
            angular_velocity: FreeVector::zero(),
            force: FreeVector::zero(),
            torque: FreeVector::zero(),
            friction: 0.6,
            restitution: 0.1,
            linear_drag: 0.0,
            angular_drag: 0.0,
            at_rest: false,
            still_ticks: 0,
            integrations: 0,
        }
    }

    /// Sets the offset of the center of mass from the local origin.
    #[must_use]
    pub fn with_center_of_mass_offset(mut self, offset: LocalVector) -> Self {
        self.com_offset = offset;
        self
    }

    /// Mass in kilograms.
    pub fn mass(&self) -> FreeCoordinate {
        self.mass
    }

    /// Reciprocal of the mass.
    pub fn inverse_mass(&self) -> FreeCoordinate {
        self.inverse_mass
    }

    /// Inverse of the inertia tensor, in the world frame.
    pub fn inverse_inertia(&self) -> &Matrix3 {
        &self.inverse_inertia_world
    }

    /// Offset of the center of mass from the local origin.
    pub fn center_of_mass_offset(&self) -> LocalVector {
        self.com_offset
    }

    /// Position of the local origin.
    pub fn position(&self) -> FreePoint {
        self.position
    }

    /// Moves the body without changing its motion.
    pub fn set_position(&mut self, position: FreePoint) {
        self.position = position;
    }

    /// Orientation of the local frame.
    pub fn orientation(&self) -> Rotation {
        self.orientation
    }

    /// Rotates the body about its local origin without changing its motion.
    pub fn set_orientation(&mut self, orientation: Rotation) {
        self.orientation = orientation.normalize();
        self.rebuild_inertia();
    }

    /// World position of the center of mass.
    pub fn center_of_mass(&self) -> FreePoint {
        self.position + self.orientation.transform_vector3d(self.com_offset)
    }

    /// Converts a point in the local frame to the world frame.
    pub fn to_world(&self, point: LocalPoint) -> FreePoint {
        self.position + self.orientation.transform_point3d(point).to_vector()
    }

    /// Converts a direction in the local frame to the world frame.
    pub fn to_world_vector(&self, vector: LocalVector) -> FreeVector {
        self.orientation.transform_vector3d(vector)
    }

    /// Linear velocity of the center of mass.
    pub fn velocity(&self) -> FreeVector {
        self.velocity
    }

    /// Angular velocity, in radians per second about the world axes.
    pub fn angular_velocity(&self) -> FreeVector {
        self.angular_velocity
    }

    /// Linear momentum.
    pub fn linear_momentum(&self) -> FreeVector {
        self.linear_momentum
    }

    /// Angular momentum about the center of mass.
    pub fn angular_momentum(&self) -> FreeVector {
        self.angular_momentum
    }

    /// Replaces both momenta, updating the velocities to match.
    pub fn set_momentum(&mut self, linear: FreeVector, angular: FreeVector) {
        self.linear_momentum = linear;
        self.angular_momentum = angular;
        self.derive_velocities();
    }

    /// Sets the linear velocity, updating the momentum to match.
    pub fn set_velocity(&mut self, velocity: FreeVector) {
        self.linear_momentum = velocity * self.mass;
        self.derive_velocities();
    }

    /// Returns the velocity of a point of the body, given by its offset from the center of
    /// mass.
    pub fn velocity_at(&self, offset: FreeVector) -> FreeVector {
        self.velocity + self.angular_velocity.cross(offset)
    }

    /// Returns the velocity of the point of the body which is at `point`.
    pub fn velocity_at_point(&self, point: FreePoint) -> FreeVector {
        self.velocity_at(point - self.center_of_mass())
    }

    /// Kinetic energy in joules.
    pub fn kinetic_energy(&self) -> FreeCoordinate {
        0.5 * (self.linear_momentum.dot(self.velocity)
            + self.angular_momentum.dot(self.angular_velocity))
    }

    /// Force accumulated for the next integration.
    pub fn force(&self) -> FreeVector {
        self.force
    }

    /// Torque accumulated for the next integration.
    pub fn torque(&self) -> FreeVector {
        self.torque
    }

    /// Adds a force acting at `point` for the next integration.
    pub fn apply_force(&mut self, point: FreePoint, force: FreeVector) {
        self.force += force;
        self.torque += (point - self.center_of_mass()).cross(force);
    }

    /// Adds a force acting at the center of mass for the next integration.
    pub fn apply_central_force(&mut self, force: FreeVector) {
        self.force += force;
    }

    /// Instantly changes the momentum as if by `impulse` acting at `point`.
    /// Wakes the body if it is at rest.
    pub fn apply_impulse(&mut self, point: FreePoint, impulse: FreeVector) {
        let offset = point - self.center_of_mass();
        self.linear_momentum += impulse;
        self.angular_momentum += offset.cross(impulse);
        self.derive_velocities();
        self.wake();
    }

    /// Zeroes the accumulated force and torque.
    pub fn clear_forces(&mut self) {
        self.force = FreeVector::zero();
        self.torque = FreeVector::zero();
    }

    /// Whether integration is suspended until the body is disturbed.
    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Stops all motion and suspends integration until the body is disturbed.
    pub fn set_at_rest(&mut self) {
        self.set_momentum(FreeVector::zero(), FreeVector::zero());
        self.clear_forces();
        self.at_rest = true;
    }

    /// Resumes integration of a body at rest.
    pub fn wake(&mut self) {
        if self.at_rest {
            log::trace!("body at {:?} woken", self.position.refmt(&ConciseDebug));
        }
        self.at_rest = false;
        self.still_ticks = 0;
    }

    /// Puts the body at rest if it has been nearly still and supported for long enough,
    /// per `config.rest_tolerance` and `config.rest_count`. Call once per tick.
    ///
    /// Returns whether the body came to rest.
    pub fn update_rest(&mut self, config: &PhysicsConfig, supported: bool) -> bool {
        if self.at_rest {
            return false;
        }
        if self.kinetic_energy() * self.inverse_mass < config.rest_tolerance {
            self.still_ticks = self.still_ticks.saturating_add(1);
        } else {
            self.still_ticks = 0;
        }
        if supported && self.still_ticks >= config.rest_count {
            self.set_at_rest();
            true
        } else {
            false
        }
    }

    /// Advances the body by `dt` seconds under the accumulated force and torque.
    ///
    /// Does nothing while the body is at rest.
    pub fn integrate(&mut self, dt: FreeCoordinate, config: &PhysicsConfig) {
        self.integrate_with(dt, config, |_, velocity, dt| *velocity * dt);
    }

    /// Like [`Self::integrate()`], but the translation of the center of mass is computed by
    /// `translate`, which is given the center of mass and may change the velocity.
    pub(crate) fn integrate_with<F>(
        &mut self,
        dt: FreeCoordinate,
        config: &PhysicsConfig,
        translate: F,
    ) where
        F: FnOnce(FreePoint, &mut FreeVector, FreeCoordinate) -> FreeVector,
    {
        if self.at_rest {
            return;
        }

        self.linear_momentum += self.force * dt;
        self.angular_momentum += self.torque * dt;
        self.linear_momentum *= (1.0 - self.linear_drag * dt).max(0.0);
        self.angular_momentum *= (1.0 - self.angular_drag * dt).max(0.0);
        self.derive_velocities();

        let speed_squared = self.velocity.square_length();
        if speed_squared > config.max_velocity * config.max_velocity {
            self.linear_momentum *= config.max_velocity / speed_squared.sqrt();
            self.derive_velocities();
        }

        let com_before = self.center_of_mass();
        let mut velocity = self.velocity;
        let translation = translate(com_before, &mut velocity, dt);
        if velocity != self.velocity {
            self.linear_momentum = velocity * self.mass;
            self.derive_velocities();
        }

        let position_before = self.position;
        let orientation_before = self.orientation;
        self.orientation = integrate_rotation(self.orientation, self.angular_velocity, dt);
        // Rotate about the center of mass, not the local origin.
        self.position = com_before + translation
            - self.orientation.transform_vector3d(self.com_offset);

        self.integrations = self.integrations.wrapping_add(1);
        self.rebuild_inertia();
        if config.renormalize_interval > 0
            && self.integrations % config.renormalize_interval == 0
        {
            self.inverse_inertia_world = self.inverse_inertia_world.symmetrize();
            self.derive_velocities();
        }

        if !is_finite_vector(self.position.to_vector())
            || !is_finite_vector(self.linear_momentum)
            || !is_finite_vector(self.angular_momentum)
        {
            log::debug!("non-finite rigid body state; stopping body");
            self.position = position_before;
            self.orientation = orientation_before;
            self.rebuild_inertia();
            self.set_momentum(FreeVector::zero(), FreeVector::zero());
        }
    }

    fn rebuild_inertia(&mut self) {
        self.inverse_inertia_world = self.inverse_inertia_local.rotated(&self.orientation);
    }

    fn derive_velocities(&mut self) {
        self.velocity = self.linear_momentum * self.inverse_mass;
        self.angular_velocity = self
            .inverse_inertia_world
            .transform_vector(self.angular_momentum);
    }
}
