use core::num::NonZeroU16;

use crate::character::Character;
use crate::config::NetConfig;
use crate::math::{FreeCoordinate, FreePoint, FreeVector, Rotation, angle_between};
use crate::physics::RigidBody;
use crate::time::{Schedule, Tick};
use crate::vehicle::Vehicle;

/// Position and orientation of an object.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct Pose {
    /// Position of the object's origin.
    pub position: FreePoint,
    /// Orientation of the object's local frame.
    pub orientation: Rotation,
}

impl Pose {
    /// Constructs a pose.
    pub fn new(position: FreePoint, orientation: Rotation) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Interpolates from `self` to `other`; `t` is clamped to `[0, 1]`.
    #[must_use]
    pub fn blend(&self, other: &Self, t: FreeCoordinate) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            position: self.position.lerp(other.position, t),
            orientation: blend_rotation(&self.orientation, &other.orientation, t),
        }
    }
}

/// Spherical interpolation which also accepts the two quaternions of a rotation facing
/// opposite ways, and returns `a` exactly when `t` is zero.
pub(crate) fn blend_rotation(a: &Rotation, b: &Rotation, t: FreeCoordinate) -> Rotation {
    if t <= 0.0 || angle_between(a, b) < 1e-12 {
        return *a;
    }
    let dot = a.i * b.i + a.j * b.j + a.k * b.k + a.r * b.r;
    let b = if dot < 0.0 {
        Rotation::quaternion(-b.i, -b.j, -b.k, -b.r)
    } else {
        *b
    };
    a.normalize().slerp(&b.normalize(), t).normalize()
}

/// The state of an object as simulated by the server: everything a client needs in
/// order to continue simulating it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct AuthoritativeState {
    /// Position of the object's origin.
    pub position: FreePoint,
    /// Orientation.
    pub orientation: Rotation,
    /// Linear momentum.
    pub linear_momentum: FreeVector,
    /// Angular momentum about the center of mass.
    pub angular_momentum: FreeVector,
    /// Whether the object is at rest.
    pub at_rest: bool,
}

impl AuthoritativeState {
    /// Constructs a state record.
    pub fn new(
        position: FreePoint,
        orientation: Rotation,
        linear_momentum: FreeVector,
        angular_momentum: FreeVector,
        at_rest: bool,
    ) -> Self {
        Self {
            position,
            orientation,
            linear_momentum,
            angular_momentum,
            at_rest,
        }
    }

    /// Constructs the state of a motionless object at rest.
    pub fn at_rest_at(position: FreePoint, orientation: Rotation) -> Self {
        Self::new(
            position,
            orientation,
            FreeVector::zero(),
            FreeVector::zero(),
            true,
        )
    }

    /// The pose part of the state.
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }
}

/// An object whose state can be sent by a server and corrected by a client.
pub trait Networked {
    /// Captures the state to broadcast.
    fn authoritative_state(&self) -> AuthoritativeState;

    /// Replaces the simulated state with `state`.
    fn apply_authoritative_state(&mut self, state: &AuthoritativeState);

    /// Mass, used to turn momentum into velocity.
    fn net_mass(&self) -> FreeCoordinate;

    /// Current pose.
    fn pose(&self) -> Pose;

    /// Moves the object without changing its momentum.
    fn set_pose(&mut self, pose: Pose);
}

impl Networked for RigidBody {
    fn authoritative_state(&self) -> AuthoritativeState {
        AuthoritativeState::new(
            self.position(),
            self.orientation(),
            self.linear_momentum(),
            self.angular_momentum(),
            self.is_at_rest(),
        )
    }

    fn apply_authoritative_state(&mut self, state: &AuthoritativeState) {
        self.set_position(state.position);
        self.set_orientation(state.orientation);
        if state.at_rest {
            self.set_at_rest();
        } else {
            self.wake();
            self.set_momentum(state.linear_momentum, state.angular_momentum);
        }
    }

    fn net_mass(&self) -> FreeCoordinate {
        self.mass()
    }

    fn pose(&self) -> Pose {
        Pose::new(self.position(), self.orientation())
    }

    fn set_pose(&mut self, pose: Pose) {
        self.set_position(pose.position);
        self.set_orientation(pose.orientation);
    }
}

impl Networked for Vehicle {
    fn authoritative_state(&self) -> AuthoritativeState {
        self.body().authoritative_state()
    }

    fn apply_authoritative_state(&mut self, state: &AuthoritativeState) {
        self.body_mut().apply_authoritative_state(state);
    }

    fn net_mass(&self) -> FreeCoordinate {
        self.body().mass()
    }

    fn pose(&self) -> Pose {
        self.body().pose()
    }

    fn set_pose(&mut self, pose: Pose) {
        self.body_mut().set_pose(pose);
    }
}

/// Characters have no angular momentum and are never at rest; their orientation carries
/// only yaw and pitch.
impl Networked for Character {
    fn authoritative_state(&self) -> AuthoritativeState {
        AuthoritativeState::new(
            self.feet(),
            self.orientation(),
            self.velocity() * self.mass(),
            FreeVector::zero(),
            false,
        )
    }

    fn apply_authoritative_state(&mut self, state: &AuthoritativeState) {
        Character::set_pose(self, state.position, state.orientation);
        if self.mass() > 0.0 {
            self.set_velocity(state.linear_momentum / self.mass());
        }
    }

    fn net_mass(&self) -> FreeCoordinate {
        self.mass()
    }

    fn pose(&self) -> Pose {
        Pose::new(self.feet(), self.orientation())
    }

    fn set_pose(&mut self, pose: Pose) {
        Character::set_pose(self, pose.position, pose.orientation);
    }
}

/// Decides when a server sends the state of an object: every
/// [`NetConfig::broadcast_interval`] ticks while it is moving, and immediately whenever it
/// comes to rest or wakes up.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UpdateSchedule {
    schedule: Schedule,
    was_at_rest: Option<bool>,
}

impl UpdateSchedule {
    /// Creates a schedule which will send on the first call to [`Self::should_send()`].
    pub fn new(config: &NetConfig) -> Self {
        Self {
            schedule: Schedule::from_period(
                NonZeroU16::new(config.broadcast_interval).unwrap_or(NonZeroU16::MIN),
            ),
            was_at_rest: None,
        }
    }

    /// Returns whether to send the object's state at the end of `tick`.
    pub fn should_send(&mut self, tick: Tick, at_rest: bool) -> bool {
        let transition = self.was_at_rest != Some(at_rest);
        self.was_at_rest = Some(at_rest);
        transition || (!at_rest && self.schedule.contains(tick))
    }
}
