//! Tunable constants, passed explicitly into every solver call.
//!
//! Every configuration type is a plain immutable value with a [`Default`] carrying the
//! standard tuning. With the `serde` feature, missing fields deserialize to those defaults,
//! so a configuration file need only mention what it changes.

use euclid::vec3;

use crate::math::{FreeCoordinate, FreeVector};
use crate::time::TickSchedule;

/// Complete configuration of a simulation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct SimConfig {
    /// Number of ticks per second of simulated time.
    pub ticks_per_second: u16,
    /// Rigid body integration and contact resolution.
    pub physics: PhysicsConfig,
    /// Character movement.
    pub character: CharacterConfig,
    /// Network reconciliation.
    pub net: NetConfig,
    /// Drive train and steering of vehicles.
    pub vehicle: VehicleConfig,
    /// Tires shared by all wheels of vehicles built from this configuration.
    pub tire: TireProfile,
    /// Suspension springs shared by all wheels of vehicles built from this configuration.
    pub spring: SpringProfile,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 60,
            physics: PhysicsConfig::default(),
            character: CharacterConfig::default(),
            net: NetConfig::default(),
            vehicle: VehicleConfig::default(),
            tire: TireProfile::default(),
            spring: SpringProfile::default(),
        }
    }
}

impl SimConfig {
    /// Returns the [`TickSchedule`] described by `ticks_per_second`.
    pub fn tick_schedule(&self) -> TickSchedule {
        TickSchedule::per_second(self.ticks_per_second.max(1))
    }

    /// Returns the length of a tick in seconds.
    ///
    /// This is the [`Duration`](core::time::Duration) of [`Self::tick_schedule()`], which is
    /// rounded to whole nanoseconds, so it agrees exactly with the ticks bodies are
    /// integrated over.
    pub fn tick_seconds(&self) -> FreeCoordinate {
        self.tick_schedule().delta_t().as_secs_f64()
    }
}

/// Rigid body integration and contact resolution constants.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct PhysicsConfig {
    /// Acceleration applied to every body, in m/s².
    pub gravity: FreeVector,
    /// Number of integration sub-steps per tick.
    pub substeps: u32,
    /// Contacts closing faster than this (m/s) are resolved by impulses;
    /// slower ones are supported by penalty forces.
    pub contact_velocity_tolerance: FreeCoordinate,
    /// Separation (m) within which a vertex is considered in contact with a surface.
    /// The penalty force is zero at exactly this separation.
    pub collision_tolerance: FreeCoordinate,
    /// Contacts penetrating deeper than this (m) are ignored as being on the wrong side
    /// of a thin surface.
    pub max_penetration: FreeCoordinate,
    /// Penalty spring stiffness per unit mass, per contact, in 1/s².
    pub zero_impulse_stiffness: FreeCoordinate,
    /// Penalty damping per unit mass, per contact, in 1/s.
    pub contact_damping: FreeCoordinate,
    /// Maximum number of single-contact collision impulses applied per body per sub-step.
    pub max_collision_iterations: u32,
    /// Kinetic energy per unit mass (J/kg) below which a supported body counts as still.
    pub rest_tolerance: FreeCoordinate,
    /// Number of consecutive still ticks after which a body is put at rest.
    pub rest_count: u32,
    /// Number of integrations between rebuilds of the world-space inertia tensor.
    pub renormalize_interval: u32,
    /// Speeds above this (m/s) are clamped, bounding per-tick collision work.
    pub max_velocity: FreeCoordinate,
    /// Distance (m) by which the cached collision query region exceeds the body's
    /// swept bounds.
    pub working_set_margin: FreeCoordinate,
    /// Number of ticks after which the cached collision query result is refreshed even if
    /// the body has stayed within it.
    pub working_set_max_age: u32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: vec3(0.0, 0.0, -20.0),
            substeps: 4,
            contact_velocity_tolerance: 0.5,
            collision_tolerance: 0.1,
            max_penetration: 1.0,
            zero_impulse_stiffness: 1000.0,
            contact_damping: 30.0,
            max_collision_iterations: 24,
            rest_tolerance: 0.001,
            rest_count: 10,
            renormalize_interval: 30,
            max_velocity: 200.0,
            working_set_margin: 2.0,
            working_set_max_age: 30,
        }
    }
}

/// Character movement constants.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct CharacterConfig {
    /// Radius (m) of the collision sphere, whose bottom is at the character's feet.
    pub radius: FreeCoordinate,
    /// Mass (kg), used for pushing other objects.
    pub mass: FreeCoordinate,
    /// Target horizontal speed (m/s) at full throttle.
    pub run_speed: FreeCoordinate,
    /// Maximum horizontal acceleration (m/s²) toward the target speed on walkable ground.
    pub run_acceleration: FreeCoordinate,
    /// Fraction of `run_acceleration` available while not on walkable ground.
    pub air_control: FreeCoordinate,
    /// Upward speed (m/s) given by a jump.
    pub jump_speed: FreeCoordinate,
    /// Minimum number of ticks between jumps.
    pub jump_delay_ticks: u32,
    /// Maximum height (m) of an obstruction that is stepped onto instead of blocking.
    pub step_height: FreeCoordinate,
    /// Surfaces whose normal has an up component below this are near-vertical,
    /// and may be stepped onto.
    pub step_dot: FreeCoordinate,
    /// Ground whose normal has an up component at least this is walkable.
    pub walkable_cos: FreeCoordinate,
    /// Ground whose normal has an up component at least this can be jumped from.
    pub jumpable_cos: FreeCoordinate,
    /// Fraction of the into-surface velocity reflected on collision.
    pub elasticity: FreeCoordinate,
    /// Tangential speed lost per unit of into-surface speed on collision.
    pub friction: FreeCoordinate,
    /// Maximum number of sweeps per movement.
    pub max_retries: u32,
    /// Distance (m) below the feet searched for ground after moving.
    pub ground_probe_distance: FreeCoordinate,
    /// Yaw change (radians) per tick at full steering input.
    pub max_turn_per_tick: FreeCoordinate,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            radius: 0.3,
            mass: 80.0,
            run_speed: 6.0,
            run_acceleration: 40.0,
            air_control: 0.3,
            jump_speed: 7.0,
            jump_delay_ticks: 20,
            step_height: 0.5,
            step_dot: 0.4,
            walkable_cos: core::f64::consts::FRAC_1_SQRT_2,
            jumpable_cos: 0.866,
            elasticity: 0.0,
            friction: 0.5,
            max_retries: 5,
            ground_probe_distance: 0.1,
            max_turn_per_tick: 0.1,
        }
    }
}

/// Network reconciliation constants.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct NetConfig {
    /// Maximum number of ticks over which a correction is spread.
    pub max_warp_ticks: u32,
    /// Number of ticks a client keeps extrapolating without fresh authoritative data.
    pub max_prediction_ticks: u32,
    /// Corrections that would take less than this fraction of a tick to travel at the
    /// object's own speed are folded into the current tick instead of warped.
    pub min_warp_fraction: FreeCoordinate,
    /// The server sends each object's state every this many ticks, and also whenever
    /// the object comes to rest or wakes.
    pub broadcast_interval: u16,
    /// Authoritative speeds (m/s) below this are corrected by snapping.
    pub snap_speed: FreeCoordinate,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            max_warp_ticks: 3,
            max_prediction_ticks: 30,
            min_warp_fraction: 0.5,
            broadcast_interval: 3,
            snap_speed: 0.01,
        }
    }
}

/// Drive train and steering constants of a vehicle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct VehicleConfig {
    /// Mass (kg) of the chassis of a standard car.
    pub mass: FreeCoordinate,
    /// Torque (N·m) applied to each powered wheel at full throttle.
    pub engine_torque: FreeCoordinate,
    /// Torque (N·m) opposing the spin of every wheel while braking.
    pub brake_torque: FreeCoordinate,
    /// Torque (N·m) opposing the spin of powered wheels while the throttle is released.
    pub engine_brake_torque: FreeCoordinate,
    /// Maximum linear speed (m/s) of the tire surface; the wheel's angular speed is
    /// capped at this divided by the tire radius.
    pub max_wheel_speed: FreeCoordinate,
    /// Steering angle (radians) at full steering input.
    pub max_steering_angle: FreeCoordinate,
    /// Rate (1/s) at which the tire deformation of a wheel off the ground decays.
    pub airborne_relax_rate: FreeCoordinate,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            mass: 1000.0,
            engine_torque: 2000.0,
            brake_torque: 3000.0,
            engine_brake_torque: 200.0,
            max_wheel_speed: 20.0,
            max_steering_angle: 0.6,
            airborne_relax_rate: 10.0,
        }
    }
}

/// Tire constants, shared read-only by every wheel that uses them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct TireProfile {
    /// Radius (m).
    pub radius: FreeCoordinate,
    /// Mass (kg); the wheel's rotational inertia is `mass × radius²`.
    pub mass: FreeCoordinate,
    /// Force (N) per meter of sideways deformation.
    pub lateral_stiffness: FreeCoordinate,
    /// Force (N) per m/s of sideways deformation rate.
    pub lateral_damping: FreeCoordinate,
    /// Decay of sideways deformation per radian of wheel rotation.
    pub lateral_relaxation: FreeCoordinate,
    /// Force (N) per meter of rolling-direction deformation.
    pub longitudinal_stiffness: FreeCoordinate,
    /// Force (N) per m/s of rolling-direction deformation rate.
    pub longitudinal_damping: FreeCoordinate,
    /// Decay of rolling-direction deformation per radian of wheel rotation.
    pub longitudinal_relaxation: FreeCoordinate,
    /// Friction coefficient while gripping.
    pub static_friction: FreeCoordinate,
    /// Friction coefficient while slipping.
    pub kinetic_friction: FreeCoordinate,
}

impl Default for TireProfile {
    fn default() -> Self {
        Self {
            radius: 0.35,
            mass: 20.0,
            lateral_stiffness: 20000.0,
            lateral_damping: 1500.0,
            lateral_relaxation: 1.0,
            longitudinal_stiffness: 20000.0,
            longitudinal_damping: 1500.0,
            longitudinal_relaxation: 1.0,
            static_friction: 1.2,
            kinetic_friction: 0.9,
        }
    }
}

/// Suspension spring constants, shared read-only by every wheel that uses them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
#[non_exhaustive]
pub struct SpringProfile {
    /// Travel (m) from fully compressed to fully extended.
    pub length: FreeCoordinate,
    /// Force (N) at full compression; the spring force is this times `1 − extension`.
    pub force: FreeCoordinate,
    /// Damping force (N) per unit of compression rate, where the rate is in spring
    /// lengths per second.
    pub damping: FreeCoordinate,
    /// Force (N) per unit of extension difference from the laterally paired wheel.
    pub anti_sway_force: FreeCoordinate,
}

impl Default for SpringProfile {
    fn default() -> Self {
        Self {
            length: 0.5,
            force: 20000.0,
            damping: 2500.0,
            anti_sway_force: 5000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_length() {
        let config = SimConfig::default();
        assert_eq!(config.ticks_per_second, 60);
        assert!((config.tick_seconds() - 1.0 / 60.0).abs() < 1e-9);
    }

    /// Reconciliation extrapolates with `tick_seconds()`, so it must be the same length
    /// bodies are integrated over, not the exact fraction.
    #[test]
    fn tick_seconds_matches_integrated_ticks() {
        let config = SimConfig::default();
        let tick = crate::time::Clock::new(config.tick_schedule(), 0).next_tick(false);
        assert_eq!(config.tick_seconds(), tick.delta_t_f64());
        assert_ne!(config.tick_seconds(), 1.0 / 60.0);
    }

    #[test]
    fn thresholds_allow_walkable_but_not_jumpable() {
        let c = CharacterConfig::default();
        assert!(c.jumpable_cos > c.walkable_cos);
        assert!(c.step_dot < c.walkable_cos);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_uses_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "physics": { "substeps": 8 }, "net": { "max_warp_ticks": 2 } }"#)
                .unwrap();
        assert_eq!(config.physics.substeps, 8);
        assert_eq!(config.physics.gravity, PhysicsConfig::default().gravity);
        assert_eq!(config.net.max_warp_ticks, 2);
        assert_eq!(config.character, CharacterConfig::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip() {
        let config = SimConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let back: SimConfig = serde_json::from_str(&text).unwrap();
        pretty_assertions::assert_eq!(back, config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn unknown_field_is_rejected() {
        let result = serde_json::from_str::<NetConfig>(r#"{ "max_warp_tick": 2 }"#);
        assert!(result.is_err());
    }
}
