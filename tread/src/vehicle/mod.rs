//! Wheeled vehicles: a chassis [`RigidBody`] held up and driven by [`Wheel`]s.
//!
//! Each sub-step, every wheel casts a ray down from its hub to find the ground, applies a
//! suspension force at the hub, and applies a tire force at the contact patch. The tire
//! force comes from lateral and longitudinal deformation accumulators, bounded by a
//! friction circle whose radius is the wheel's vertical load times the friction
//! coefficient. The engine and brakes act on the wheels' spin, not on the chassis directly.

use core::fmt;
use std::sync::Arc;

use euclid::{point3, vec3};
use manyfmt::Refmt as _;

use crate::config::{PhysicsConfig, SimConfig, SpringProfile, TireProfile, VehicleConfig};
use crate::math::{FreeCoordinate, FreePoint, FreeVector, Rotation};
use crate::net::{InputRecord, Triggers};
use crate::physics::{
    Actuator, BodyStepInfo, CollisionShape, ImpulseQueue, RigidBody, Surface, step_one_body,
};
use crate::time::Tick;
use crate::util::ConciseDebug;

mod wheel;
pub use wheel::*;

#[cfg(test)]
mod tests;

/// Half the size of the chassis box of [`Vehicle::car()`].
const CAR_HALF_EXTENTS: [FreeCoordinate; 3] = [0.9, 2.0, 0.3];
/// Hub positions of [`Vehicle::car()`], front pair first.
const CAR_HUBS: [[FreeCoordinate; 3]; 4] = [
    [-0.8, 1.5, -0.2],
    [0.8, 1.5, -0.2],
    [-0.8, -1.5, -0.2],
    [0.8, -1.5, -0.2],
];

/// Driver input to a [`Vehicle`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Controls {
    /// Engine power, from -1 (full reverse) to 1 (full forward).
    pub throttle: FreeCoordinate,
    /// Steering, from -1 (full right) to 1 (full left).
    pub steering: FreeCoordinate,
    /// Whether the brakes are applied.
    pub brake: bool,
}

impl Controls {
    /// Constructs controls, clamping the inputs to their ranges.
    /// NaN inputs are treated as zero.
    pub fn new(throttle: FreeCoordinate, steering: FreeCoordinate, brake: bool) -> Self {
        let clamp = |value: FreeCoordinate| {
            if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) }
        };
        Self {
            throttle: clamp(throttle),
            steering: clamp(steering),
            brake,
        }
    }

    /// Interprets a client input record: throttle, yaw as steering, and the brake trigger.
    pub fn from_input(input: &InputRecord) -> Self {
        Self::new(
            input.throttle,
            input.yaw,
            input.triggers.contains(Triggers::BRAKE),
        )
    }

    /// Whether the controls ask for nothing.
    pub fn is_idle(&self) -> bool {
        self.throttle == 0.0 && self.steering == 0.0 && !self.brake
    }
}

/// The wheels of a vehicle together with what they share, acting on the chassis.
#[derive(Clone, Debug, PartialEq)]
struct Drivetrain {
    wheels: Vec<Wheel>,
    tire: Arc<TireProfile>,
    spring: Arc<SpringProfile>,
    config: VehicleConfig,
    controls: Controls,
}

impl Actuator for Drivetrain {
    fn actuate(
        &mut self,
        body: &mut RigidBody,
        surfaces: &[Surface],
        dt: FreeCoordinate,
        impulses: &mut ImpulseQueue,
    ) -> bool {
        for wheel in &mut self.wheels {
            wheel.probe(body, surfaces, &self.tire, &self.spring);
        }
        for i in 0..self.wheels.len() {
            let opposite = self.wheels[i]
                .opposite()
                .map(|j| self.wheels[j].extension());
            self.wheels[i].apply_suspension(body, &self.spring, opposite, dt, impulses);
        }
        for wheel in &mut self.wheels {
            wheel.apply_tire(body, &self.tire, &self.config, &self.controls, dt, impulses);
        }
        self.wheels.iter().any(|wheel| wheel.contact().is_some())
    }
}

/// A chassis on wheels.
#[derive(Clone, Debug, PartialEq)]
pub struct Vehicle {
    body: RigidBody,
    shape: CollisionShape,
    drivetrain: Drivetrain,
}

impl Vehicle {
    /// Constructs a vehicle from a chassis and wheel mountings.
    ///
    /// Wheels are paired across axles for anti-sway: each wheel is paired with the first
    /// unpaired wheel whose hub has nearly the same Y coordinate.
    pub fn new(
        body: RigidBody,
        shape: CollisionShape,
        wheels: impl IntoIterator<Item = WheelSpec>,
        tire: Arc<TireProfile>,
        spring: Arc<SpringProfile>,
        config: VehicleConfig,
    ) -> Self {
        let mut wheels: Vec<Wheel> = wheels.into_iter().map(Wheel::new).collect();
        pair_wheels(&mut wheels);
        Self {
            body,
            shape,
            drivetrain: Drivetrain {
                wheels,
                tire,
                spring,
                config,
                controls: Controls::default(),
            },
        }
    }

    /// Constructs a four-wheeled car with front steering and rear-wheel drive, with its
    /// chassis origin at `position`.
    pub fn car(position: FreePoint, orientation: Rotation, config: &SimConfig) -> Self {
        let [x, y, z] = CAR_HALF_EXTENTS;
        let half = vec3(x, y, z);
        let mass = config.vehicle.mass;
        let body = RigidBody::new(
            mass,
            CollisionShape::cuboid_inertia(half, mass),
            position,
            orientation,
        );
        let wheels = CAR_HUBS.iter().enumerate().map(|(i, &[hx, hy, hz])| {
            let spec = WheelSpec::new(point3(hx, hy, hz));
            if i < 2 { spec.steered(1.0) } else { spec.powered() }
        });
        Self::new(
            body,
            CollisionShape::cuboid(half),
            wheels,
            Arc::new(config.tire.clone()),
            Arc::new(config.spring.clone()),
            config.vehicle.clone(),
        )
    }

    /// The chassis.
    pub fn body(&self) -> &RigidBody {
        &self.body
    }

    /// The chassis, for modification.
    pub fn body_mut(&mut self) -> &mut RigidBody {
        &mut self.body
    }

    /// Collision shape of the chassis.
    pub fn shape(&self) -> &CollisionShape {
        &self.shape
    }

    /// The wheels, in the order given at construction.
    pub fn wheels(&self) -> &[Wheel] {
        &self.drivetrain.wheels
    }

    /// Tire constants shared by the wheels.
    pub fn tire(&self) -> &Arc<TireProfile> {
        &self.drivetrain.tire
    }

    /// Suspension constants shared by the wheels.
    pub fn spring(&self) -> &Arc<SpringProfile> {
        &self.drivetrain.spring
    }

    /// Current driver input.
    pub fn controls(&self) -> Controls {
        self.drivetrain.controls
    }

    /// Sets the driver input. Any input other than idle wakes the chassis.
    pub fn set_controls(&mut self, controls: Controls) {
        if !controls.is_idle() {
            self.body.wake();
        }
        self.drivetrain.controls = controls;
    }

    /// Sets the driver input from a client input record.
    pub fn apply_input(&mut self, input: &InputRecord) {
        self.set_controls(Controls::from_input(input));
    }

    /// Forward speed of the chassis, in meters per second.
    pub fn forward_speed(&self) -> FreeCoordinate {
        self.body
            .velocity()
            .dot(self.body.to_world_vector(vec3(0.0, 1.0, 0.0)))
    }

    /// Advances the vehicle by one tick.
    pub fn step(
        &mut self,
        surfaces: &[Surface],
        tick: Tick,
        config: &PhysicsConfig,
        impulses: &mut ImpulseQueue,
    ) -> VehicleStepInfo {
        let body = step_one_body(
            &mut self.body,
            &self.shape,
            surfaces,
            tick,
            config,
            &mut self.drivetrain,
            impulses,
        );
        let wheels = &self.drivetrain.wheels;
        VehicleStepInfo {
            body,
            wheels_on_ground: wheels.iter().filter(|w| w.contact().is_some()).count() as u32,
            wheels_slipping: wheels.iter().filter(|w| w.is_slipping()).count() as u32,
            velocity: self.body.velocity(),
        }
    }
}

/// Diagnostic data produced by [`Vehicle::step()`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct VehicleStepInfo {
    /// The chassis step.
    pub body: BodyStepInfo,
    /// Number of wheels touching the ground at the end of the step.
    pub wheels_on_ground: u32,
    /// Number of wheels whose tire force was limited by friction.
    pub wheels_slipping: u32,
    /// Velocity of the chassis after the step.
    pub velocity: FreeVector,
}

impl manyfmt::Fmt<ConciseDebug> for VehicleStepInfo {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>, fopt: &ConciseDebug) -> fmt::Result {
        write!(
            fmt,
            "{} on ground, {} slipping, v {:?}; {:?}",
            self.wheels_on_ground,
            self.wheels_slipping,
            self.velocity.refmt(fopt),
            self.body.refmt(fopt)
        )
    }
}
