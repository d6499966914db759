//! Walking characters, which move by sweeping a sphere rather than by rigid-body
//! dynamics.

use core::f64::consts::{FRAC_PI_2, TAU};
use core::fmt;

use arrayvec::ArrayVec;
use euclid::{Angle, Rotation3D, vec3};
use manyfmt::Refmt as _;

use crate::config::{CharacterConfig, PhysicsConfig};
use crate::math::{
    FreeCoordinate, FreePoint, FreeVector, Local, Rotation, UP, is_finite_vector, yaw_rotation,
};
use crate::net::{InputRecord, Triggers};
use crate::physics::{
    ImpulseQueue, POSITION_EPSILON, Surface, SurfaceKind, sweep_and_resolve, sweep_sphere,
};
use crate::time::Tick;
use crate::util::ConciseDebug;

mod solver;
pub use solver::*;


/// Movement input to a [`Character`] for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[non_exhaustive]
pub struct CharacterInput {
    /// Forward movement, from -1 to 1.
    pub forward: FreeCoordinate,
    /// Rightward movement, from -1 to 1.
    pub strafe: FreeCoordinate,
    /// Turn, as a fraction of the maximum turn per tick; positive turns left.
    pub turn: FreeCoordinate,
    /// Change of pitch, as a fraction of the maximum turn per tick; positive looks up.
    pub look: FreeCoordinate,
    /// Whether to jump.
    pub jump: bool,
}

impl CharacterInput {
    /// Interprets a client input record: throttle as forward movement, yaw and pitch as
    /// turning, and the jump trigger.
    pub fn from_input(input: &InputRecord) -> Self {
        Self {
            forward: input.throttle,
            strafe: 0.0,
            turn: input.yaw,
            look: input.pitch,
            jump: input.triggers.contains(Triggers::JUMP),
        }
    }
}

/// A walking, jumping character.
///
/// The character collides as a sphere resting on its feet. Its position is that of its
/// feet.
#[derive(Clone, Debug, PartialEq)]
pub struct Character {
    feet: FreePoint,
    velocity: FreeVector,
    yaw: FreeCoordinate,
    pitch: FreeCoordinate,
    radius: FreeCoordinate,
    mass: FreeCoordinate,

    input: CharacterInput,
    ground: Option<GroundClass>,
    ground_normal: Option<FreeVector>,
    /// Ticks remaining until another jump is allowed.
    jump_cooldown: u32,
}

impl Character {
    /// Creates a stationary character standing at `feet`, facing `yaw` radians
    /// counterclockwise from +Y.
    pub fn new(feet: FreePoint, yaw: FreeCoordinate, config: &CharacterConfig) -> Self {
        Self {
            feet,
            velocity: FreeVector::zero(),
            yaw: yaw.rem_euclid(TAU),
            pitch: 0.0,
            radius: config.radius,
            mass: config.mass,
            input: CharacterInput::default(),
            ground: None,
            ground_normal: None,
            jump_cooldown: 0,
        }
    }

    /// Position of the feet.
    pub fn feet(&self) -> FreePoint {
        self.feet
    }

    /// Center of the collision sphere.
    pub fn center(&self) -> FreePoint {
        self.feet + UP * self.radius
    }

    /// Velocity in meters per second.
    pub fn velocity(&self) -> FreeVector {
        self.velocity
    }

    /// Mass in kilograms, used when pushing other objects.
    pub fn mass(&self) -> FreeCoordinate {
        self.mass
    }

    /// Heading in radians in `[0, 2π)`, counterclockwise from +Y.
    pub fn yaw(&self) -> FreeCoordinate {
        self.yaw
    }

    /// Look angle in radians above the horizontal.
    pub fn pitch(&self) -> FreeCoordinate {
        self.pitch
    }

    /// Orientation combining yaw and pitch.
    pub fn orientation(&self) -> Rotation {
        Rotation3D::<FreeCoordinate, Local, Local>::around_x(Angle::radians(self.pitch))
            .then(&yaw_rotation(self.yaw))
    }

    /// Classification of the ground found under the character after the last step, if
    /// any was found.
    pub fn ground(&self) -> Option<GroundClass> {
        self.ground
    }

    /// Normal of the ground found under the character after the last step.
    pub fn ground_normal(&self) -> Option<FreeVector> {
        self.ground_normal
    }

    /// Current input.
    pub fn input(&self) -> CharacterInput {
        self.input
    }

    /// Sets the input used by subsequent steps.
    pub fn set_input(&mut self, input: CharacterInput) {
        self.input = input;
    }

    /// Sets the input from a client input record.
    pub fn apply_input(&mut self, input: &InputRecord) {
        self.set_input(CharacterInput::from_input(input));
    }

    /// Moves the character to a new pose. Velocity is kept.
    pub fn set_pose(&mut self, feet: FreePoint, orientation: Rotation) {
        self.feet = feet;
        let forward = orientation.transform_vector3d(vec3(0.0, 1.0, 0.0));
        self.yaw = (-forward.x).atan2(forward.y).rem_euclid(TAU);
        self.pitch = forward.z.clamp(-1.0, 1.0).asin();
    }

    /// Sets the velocity.
    pub fn set_velocity(&mut self, velocity: FreeVector) {
        if is_finite_vector(velocity) {
            self.velocity = velocity;
        }
    }

    /// Advances the character by one tick.
    pub fn step(
        &mut self,
        surfaces: &[Surface],
        tick: Tick,
        physics: &PhysicsConfig,
        config: &CharacterConfig,
        impulses: &mut ImpulseQueue,
    ) -> CharacterStepInfo {
        let mut info = CharacterStepInfo::default();
        if tick.paused() {
            return info;
        }
        let dt = tick.delta_t_f64();
        let input = self.input;

        self.yaw = (self.yaw + input.turn.clamp(-1.0, 1.0) * config.max_turn_per_tick)
            .rem_euclid(TAU);
        self.pitch = (self.pitch + input.look.clamp(-1.0, 1.0) * config.max_turn_per_tick)
            .clamp(-FRAC_PI_2, FRAC_PI_2);
        self.jump_cooldown = self.jump_cooldown.saturating_sub(1);

        self.accelerate(input, dt, config);
        if input.jump && self.ground.is_some_and(|g| g.jumpable) && self.jump_cooldown == 0 {
            self.velocity.z = config.jump_speed;
            self.jump_cooldown = config.jump_delay_ticks;
            self.ground = None;
            info.jumped = true;
            log::trace!("jumped from {:?}", self.feet.refmt(&ConciseDebug));
        }
        self.velocity += physics.gravity * dt;

        let mut policy = SlideAndStep::new(config);
        let outcome = sweep_and_resolve(
            self.center(),
            self.radius,
            self.velocity,
            dt,
            surfaces,
            config.max_retries,
            &mut policy,
        );
        self.feet = outcome.position - UP * self.radius;
        self.velocity = outcome.velocity;
        info.sweeps = outcome.sweeps;
        info.exhausted = outcome.exhausted;
        info.steps = policy.steps;
        info.hits = outcome.hits.len() as u32;
        for hit in &outcome.hits {
            if let SurfaceKind::Object(id) = surfaces[hit.surface].kind {
                if hit.closing_speed > 0.0 {
                    impulses.push(id, hit.point, -hit.normal * (self.mass * hit.closing_speed));
                }
            }
        }
        if outcome.exhausted {
            log::trace!("character boxed in at {:?}", self.feet.refmt(&ConciseDebug));
        }

        self.probe_ground(surfaces, config);
        info.ground = self.ground;
        self.find_overlaps(surfaces, &mut info.overlaps);
        info
    }

    /// Adjusts the horizontal velocity toward the desired running velocity.
    fn accelerate(&mut self, input: CharacterInput, dt: FreeCoordinate, config: &CharacterConfig) {
        let local = vec3::<FreeCoordinate, Local>(
            input.strafe.clamp(-1.0, 1.0),
            input.forward.clamp(-1.0, 1.0),
            0.0,
        );
        let local = if local.square_length() > 1.0 {
            local.normalize()
        } else {
            local
        };
        let target = yaw_rotation(self.yaw).transform_vector3d(local) * config.run_speed;

        let rate = if self.ground.is_some_and(|g| g.walkable) {
            config.run_acceleration
        } else {
            config.run_acceleration * config.air_control
        };
        let horizontal = vec3(self.velocity.x, self.velocity.y, 0.0);
        let change = (target - horizontal).with_max_length(rate * dt);
        self.velocity += change;
    }

    /// Looks for ground just below the feet, and settles onto it if it is walkable and the
    /// character is not moving away from it.
    fn probe_ground(&mut self, surfaces: &[Surface], config: &CharacterConfig) {
        let probe = -UP * config.ground_probe_distance;
        let Some(hit) = sweep_sphere(self.center(), self.radius, probe, surfaces) else {
            self.ground = None;
            self.ground_normal = None;
            return;
        };
        let class = GroundClass::of_normal(hit.normal, config);
        let into = self.velocity.dot(hit.normal);
        if class.walkable && into <= 0.0 {
            self.feet += probe * hit.fraction + hit.normal * POSITION_EPSILON;
            self.velocity -= hit.normal * into;
        }
        self.ground = Some(class);
        self.ground_normal = Some(hit.normal);
    }

    fn find_overlaps(&self, surfaces: &[Surface], out: &mut ArrayVec<SurfaceKind, 4>) {
        let center = self.center();
        for surface in surfaces {
            if surface.kind.is_solid() || out.contains(&surface.kind) {
                continue;
            }
            if surface.signed_distance(center).abs() <= self.radius
                && surface.contains_projection(center, self.radius)
            {
                let _ = out.try_push(surface.kind);
            }
        }
    }
}

/// Diagnostic data produced by [`Character::step()`].
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct CharacterStepInfo {
    /// Number of sweeps performed.
    pub sweeps: u32,
    /// Whether the sweep budget ran out, so the character was stopped.
    pub exhausted: bool,
    /// Number of step-ups.
    pub steps: u32,
    /// Number of surfaces hit.
    pub hits: u32,
    /// Whether the character jumped.
    pub jumped: bool,
    /// The ground under the character after moving.
    pub ground: Option<GroundClass>,
    /// Non-solid surfaces the character overlaps.
    pub overlaps: ArrayVec<SurfaceKind, 4>,
}

impl manyfmt::Fmt<ConciseDebug> for CharacterStepInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, _: &ConciseDebug) -> fmt::Result {
        write!(fmt, "{} sweeps, {} hits", self.sweeps, self.hits)?;
        if self.steps > 0 {
            write!(fmt, ", {} steps", self.steps)?;
        }
        if self.exhausted {
            write!(fmt, ", exhausted")?;
        }
        if self.jumped {
            write!(fmt, ", jumped")?;
        }
        match self.ground {
            Some(GroundClass { walkable: true, .. }) => write!(fmt, ", grounded")?,
            Some(_) => write!(fmt, ", on steep ground")?,
            None => write!(fmt, ", airborne")?,
        }
        if !self.overlaps.is_empty() {
            write!(fmt, ", overlapping {:?}", self.overlaps)?;
        }
        Ok(())
    }
}
