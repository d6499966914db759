use core::f64::consts::TAU;

use crate::config::{SpringProfile, TireProfile, VehicleConfig};
use crate::math::{
    FreeCoordinate, FreePoint, FreeVector, LocalPoint, LocalVector, ZeroOne, project_onto_plane,
};
use crate::physics::{ImpulseQueue, RigidBody, Surface, SurfaceKind, raycast};
use crate::vehicle::Controls;

/// Wheels whose hubs differ in Y by less than this are paired for anti-sway.
pub const PAIRING_DISTANCE: FreeCoordinate = 0.5;

/// Tangent directions shorter than this are not used to orient the tire.
const AXIS_EPSILON: FreeCoordinate = 1e-9;

/// Where a wheel is mounted and what it does, for building a [`Vehicle`](super::Vehicle).
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct WheelSpec {
    /// Position of the top of the suspension, in the chassis frame.
    pub hub: LocalPoint,
    /// Whether the engine drives this wheel.
    pub powered: bool,
    /// Multiplier of the steering angle; 0 for wheels that do not steer, negative for
    /// rear steering.
    pub steering_factor: FreeCoordinate,
}

impl WheelSpec {
    /// An unpowered, unsteered wheel at `hub`.
    pub fn new(hub: LocalPoint) -> Self {
        Self {
            hub,
            powered: false,
            steering_factor: 0.0,
        }
    }

    /// Makes the wheel driven by the engine.
    #[must_use]
    pub fn powered(mut self) -> Self {
        self.powered = true;
        self
    }

    /// Makes the wheel steer with the given factor.
    #[must_use]
    pub fn steered(mut self, factor: FreeCoordinate) -> Self {
        self.steering_factor = factor;
        self
    }
}

/// Where a wheel is touching the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub struct WheelContact {
    /// The contact patch, in world coordinates.
    pub point: FreePoint,
    /// Normal of the ground.
    pub normal: FreeVector,
    /// Velocity of the ground.
    pub surface_velocity: FreeVector,
    /// Friction multiplier of the ground.
    pub friction: FreeCoordinate,
    /// What the ground belongs to.
    pub kind: SurfaceKind,
}

/// One wheel of a vehicle: suspension, tire and spin.
///
/// The tire is modeled as two springs, lateral and longitudinal, whose deformation is
/// accumulated while the contact patch is dragged across the ground and relaxes as the
/// wheel rolls.
#[derive(Clone, Debug, PartialEq)]
pub struct Wheel {
    hub: LocalPoint,
    powered: bool,
    steering_factor: FreeCoordinate,
    /// Index of the wheel on the other side of the same axle.
    opposite: Option<usize>,

    extension: ZeroOne,
    contact: Option<WheelContact>,
    suspension_force: FreeCoordinate,
    steering_angle: FreeCoordinate,

    lateral_deformation: FreeCoordinate,
    longitudinal_deformation: FreeCoordinate,
    angle: FreeCoordinate,
    angular_velocity: FreeCoordinate,
    slipping: bool,
    slip: ZeroOne,
}

impl Wheel {
    pub(crate) fn new(spec: WheelSpec) -> Self {
        Self {
            hub: spec.hub,
            powered: spec.powered,
            steering_factor: spec.steering_factor,
            opposite: None,
            extension: ZeroOne::ONE,
            contact: None,
            suspension_force: 0.0,
            steering_angle: 0.0,
            lateral_deformation: 0.0,
            longitudinal_deformation: 0.0,
            angle: 0.0,
            angular_velocity: 0.0,
            slipping: false,
            slip: ZeroOne::ZERO,
        }
    }

    /// Position of the top of the suspension, in the chassis frame.
    pub fn hub(&self) -> LocalPoint {
        self.hub
    }

    /// Whether the engine drives this wheel.
    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Index of the wheel paired with this one for anti-sway, if any.
    pub fn opposite(&self) -> Option<usize> {
        self.opposite
    }

    /// How far the suspension is extended; 1 is fully extended, 0 fully compressed.
    pub fn extension(&self) -> ZeroOne {
        self.extension
    }

    /// The ground contact found in the last sub-step.
    pub fn contact(&self) -> Option<&WheelContact> {
        self.contact.as_ref()
    }

    /// Suspension force in the last sub-step, in newtons; this is the tire's vertical load.
    pub fn suspension_force(&self) -> FreeCoordinate {
        self.suspension_force
    }

    /// Current steering angle in radians, counterclockwise.
    pub fn steering_angle(&self) -> FreeCoordinate {
        self.steering_angle
    }

    /// Lateral tire deformation, in meters.
    pub fn lateral_deformation(&self) -> FreeCoordinate {
        self.lateral_deformation
    }

    /// Longitudinal tire deformation, in meters.
    pub fn longitudinal_deformation(&self) -> FreeCoordinate {
        self.longitudinal_deformation
    }

    /// Angular position in `[0, 2π)`.
    pub fn angle(&self) -> FreeCoordinate {
        self.angle
    }

    /// Spin in radians per second; positive rolls forward.
    pub fn angular_velocity(&self) -> FreeCoordinate {
        self.angular_velocity
    }

    /// Whether the tire force exceeded the friction circle in the last sub-step.
    pub fn is_slipping(&self) -> bool {
        self.slipping
    }

    /// Fraction of the tire force lost to the friction circle in the last sub-step.
    pub fn slip(&self) -> ZeroOne {
        self.slip
    }

    /// Finds the ground under the wheel and sets the extension.
    pub(crate) fn probe(
        &mut self,
        body: &RigidBody,
        surfaces: &[Surface],
        tire: &TireProfile,
        spring: &SpringProfile,
    ) {
        let down = -body.to_world_vector(LocalVector::new(0.0, 0.0, 1.0));
        let hub = body.to_world(self.hub);
        let reach = spring.length + tire.radius;
        match raycast(hub, down, reach, surfaces) {
            Some(hit) => {
                let surface = &surfaces[hit.surface];
                self.extension = ZeroOne::new_clamped(if spring.length > 0.0 {
                    (hit.distance - tire.radius) / spring.length
                } else {
                    0.0
                });
                self.contact = Some(WheelContact {
                    point: hit.point,
                    normal: hit.normal,
                    surface_velocity: surface.velocity,
                    friction: surface.friction,
                    kind: surface.kind,
                });
            }
            None => {
                self.extension = ZeroOne::ONE;
                self.contact = None;
            }
        }
    }

    /// Applies the suspension force to `body`, returning it.
    ///
    /// `opposite_extension` is the extension of the paired wheel, if any.
    pub(crate) fn apply_suspension(
        &mut self,
        body: &mut RigidBody,
        spring: &SpringProfile,
        opposite_extension: Option<ZeroOne>,
        dt: FreeCoordinate,
        impulses: &mut ImpulseQueue,
    ) -> FreeCoordinate {
        let Some(contact) = self.contact else {
            self.suspension_force = 0.0;
            return 0.0;
        };
        let up = body.to_world_vector(LocalVector::new(0.0, 0.0, 1.0));
        let hub = body.to_world(self.hub);
        let extension = self.extension.into_inner();

        let spring_force = spring.force * (1.0 - extension);
        let compression_speed = -(body.velocity_at_point(hub) - contact.surface_velocity).dot(up);
        // Damping only resists compression; on rebound the spring alone holds the body up.
        let damping_force = if spring.length > 0.0 {
            (spring.damping * compression_speed / spring.length).max(0.0)
        } else {
            0.0
        };
        let anti_sway = opposite_extension.map_or(0.0, |opposite| {
            spring.anti_sway_force * (opposite.into_inner() - extension).max(0.0)
        });
        let total = (spring_force + damping_force + anti_sway).max(0.0);

        body.apply_force(hub, up * total);
        if let Some(other) = contact.kind.object() {
            impulses.push(other, contact.point, -up * (total * dt));
        }
        self.suspension_force = total;
        total
    }

    /// Updates the tire deformation and applies the tire force to `body`, then updates the
    /// wheel's spin from the drive train and the tire's reaction.
    pub(crate) fn apply_tire(
        &mut self,
        body: &mut RigidBody,
        tire: &TireProfile,
        config: &VehicleConfig,
        controls: &Controls,
        dt: FreeCoordinate,
        impulses: &mut ImpulseQueue,
    ) {
        self.steering_angle = controls.steering * config.max_steering_angle * self.steering_factor;
        let longitudinal_force = match self.contact {
            Some(contact) => self.apply_tire_force(body, tire, contact, dt, impulses),
            None => {
                let relax = (-config.airborne_relax_rate * dt).exp();
                self.lateral_deformation *= relax;
                self.longitudinal_deformation *= relax;
                self.slipping = false;
                self.slip = ZeroOne::ZERO;
                0.0
            }
        };
        self.spin(tire, config, controls, longitudinal_force, dt);
    }

    /// Returns the longitudinal force.
    fn apply_tire_force(
        &mut self,
        body: &mut RigidBody,
        tire: &TireProfile,
        contact: WheelContact,
        dt: FreeCoordinate,
        impulses: &mut ImpulseQueue,
    ) -> FreeCoordinate {
        let (sin, cos) = self.steering_angle.sin_cos();
        let forward = body.to_world_vector(LocalVector::new(-sin, cos, 0.0));
        let tire_y = project_onto_plane(forward, contact.normal);
        let length = tire_y.length();
        if !(length > AXIS_EPSILON) {
            // The ground is perpendicular to the wheel's rolling direction.
            return 0.0;
        }
        let tire_y = tire_y / length;
        let tire_x = tire_y.cross(contact.normal);

        let velocity = body.velocity_at_point(contact.point) - contact.surface_velocity;
        let vx = velocity.dot(tire_x);
        let vy = velocity.dot(tire_y);
        let rolling = self.angular_velocity.abs();

        let lateral_rate = -vx - tire.lateral_relaxation * rolling * self.lateral_deformation;
        self.lateral_deformation += lateral_rate * dt;
        let mut lateral =
            tire.lateral_stiffness * self.lateral_deformation + tire.lateral_damping * lateral_rate;

        let longitudinal_rate = (self.angular_velocity * tire.radius - vy)
            - tire.longitudinal_relaxation * rolling * self.longitudinal_deformation;
        self.longitudinal_deformation += longitudinal_rate * dt;
        let mut longitudinal = tire.longitudinal_stiffness * self.longitudinal_deformation
            + tire.longitudinal_damping * longitudinal_rate;

        let coefficient = if self.slipping {
            tire.kinetic_friction
        } else {
            tire.static_friction
        } * contact.friction;
        let scale = friction_circle_scale(lateral, longitudinal, self.suspension_force * coefficient);
        if scale < 1.0 {
            lateral *= scale;
            longitudinal *= scale;
            self.lateral_deformation *= scale;
            self.longitudinal_deformation *= scale;
            self.slipping = true;
            self.slip = ZeroOne::new_clamped(1.0 - scale);
        } else {
            self.slipping = false;
            self.slip = ZeroOne::ZERO;
        }

        let force = tire_x * lateral + tire_y * longitudinal;
        body.apply_force(contact.point, force);
        if let Some(other) = contact.kind.object() {
            impulses.push(other, contact.point, -force * dt);
        }
        longitudinal
    }

    fn spin(
        &mut self,
        tire: &TireProfile,
        config: &VehicleConfig,
        controls: &Controls,
        longitudinal_force: FreeCoordinate,
        dt: FreeCoordinate,
    ) {
        let inertia = tire.mass * tire.radius * tire.radius;
        if !(inertia > 0.0) {
            return;
        }
        let max_speed = config.max_wheel_speed / tire.radius;

        let drive = if self.powered {
            let headroom = (1.0 - self.angular_velocity.abs() / max_speed).max(0.0);
            headroom * controls.throttle * config.engine_torque
        } else {
            0.0
        };
        self.angular_velocity += (drive - longitudinal_force * tire.radius) / inertia * dt;

        let brake = if controls.brake {
            config.brake_torque
        } else if self.powered && controls.throttle == 0.0 {
            config.engine_brake_torque
        } else {
            0.0
        };
        let loss = brake / inertia * dt;
        if self.angular_velocity.abs() <= loss {
            self.angular_velocity = 0.0;
        } else {
            self.angular_velocity -= loss.copysign(self.angular_velocity);
        }

        self.angular_velocity = self.angular_velocity.clamp(-max_speed, max_speed);
        self.angle = (self.angle + self.angular_velocity * dt).rem_euclid(TAU);
    }
}

/// Returns the factor by which a tire force of the given components must be scaled to lie
/// within a friction circle of radius `max_force`; 1 if it already does.
pub fn friction_circle_scale(
    lateral: FreeCoordinate,
    longitudinal: FreeCoordinate,
    max_force: FreeCoordinate,
) -> FreeCoordinate {
    let max_force = max_force.max(0.0);
    let square = lateral * lateral + longitudinal * longitudinal;
    if square > max_force * max_force {
        max_force / square.sqrt()
    } else {
        1.0
    }
}

/// Pairs each wheel with the first unpaired wheel whose hub is within
/// [`PAIRING_DISTANCE`] in Y, recording the pairing on both.
pub(crate) fn pair_wheels(wheels: &mut [Wheel]) {
    for i in 0..wheels.len() {
        if wheels[i].opposite.is_some() {
            continue;
        }
        let y = wheels[i].hub.y;
        let partner = (0..wheels.len()).find(|&j| {
            j != i && wheels[j].opposite.is_none() && (wheels[j].hub.y - y).abs() < PAIRING_DISTANCE
        });
        if let Some(j) = partner {
            wheels[i].opposite = Some(j);
            wheels[j].opposite = Some(i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::math::{Aab, Rotation};
    use crate::physics::{CollisionQuery as _, CollisionShape, StaticScene, SurfaceMask};
    use euclid::{point3, vec3};
    use rand::{Rng as _, SeedableRng as _};
    use rstest::rstest;

    const DT: FreeCoordinate = 1.0 / 240.0;

    fn ground() -> Vec<Surface> {
        let mut scene = StaticScene::new();
        scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 50.0);
        let mut surfaces = Vec::new();
        scene.find_surfaces(
            &Aab::new(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0),
            SurfaceMask::SOLID,
            &mut surfaces,
        );
        surfaces
    }

    /// A wheel hung from the origin of a body moving at `velocity`, with the hub 0.725 m
    /// above the ground so that the default spring is at 3/4 extension.
    fn grounded_wheel(velocity: FreeVector) -> (RigidBody, Wheel) {
        let config = SimConfig::default();
        let mut body = RigidBody::new(
            1000.0,
            CollisionShape::cuboid_inertia(vec3(1.0, 1.0, 1.0), 1000.0),
            point3(0.0, 0.0, 0.725),
            Rotation::identity(),
        );
        body.set_velocity(velocity);
        let mut wheel = Wheel::new(WheelSpec::new(point3(0.0, 0.0, 0.0)));
        wheel.probe(&body, &ground(), &config.tire, &config.spring);
        assert!((wheel.extension().into_inner() - 0.75).abs() < 1e-9);
        (body, wheel)
    }

    /// Runs one tire sub-step with no controls and returns the magnitude of the tire force.
    fn tire_force(body: &mut RigidBody, wheel: &mut Wheel, config: &SimConfig) -> f64 {
        body.clear_forces();
        wheel.apply_tire(
            body,
            &config.tire,
            &config.vehicle,
            &Controls::default(),
            DT,
            &mut ImpulseQueue::new(),
        );
        // The ground is horizontal, so the tire force is too.
        let force = body.force();
        assert!(force.z.abs() < 1e-9);
        force.x.hypot(force.y)
    }

    // Spring term is 20000 × (1 − 0.75); damping is 2500 per spring length per second.
    #[rstest]
    #[case::rebounding(1.0, 5000.0)]
    #[case::still(0.0, 5000.0)]
    #[case::compressing(-1.0, 10000.0)]
    fn suspension_damping_resists_only_compression(
        #[case] vertical_velocity: f64,
        #[case] expected: f64,
    ) {
        let spring = SpringProfile::default();
        assert_eq!((spring.force, spring.damping, spring.length), (20000.0, 2500.0, 0.5));
        let (mut body, mut wheel) = grounded_wheel(vec3(0.0, 0.0, vertical_velocity));

        let force = wheel.apply_suspension(&mut body, &spring, None, DT, &mut ImpulseQueue::new());
        assert!((force - expected).abs() < 1e-6, "force {force}");
        assert!((body.force().z - expected).abs() < 1e-6);
        assert_eq!(wheel.suspension_force(), force);
    }

    #[rstest]
    #[case::opposite_extended(Some(1.0), 6250.0)]
    #[case::opposite_equal(Some(0.75), 5000.0)]
    #[case::opposite_compressed(Some(0.5), 5000.0)]
    #[case::unpaired(None, 5000.0)]
    fn anti_sway_stiffens_the_more_compressed_side(
        #[case] opposite: Option<f64>,
        #[case] expected: f64,
    ) {
        let spring = SpringProfile::default();
        assert_eq!(spring.anti_sway_force, 5000.0);
        let (mut body, mut wheel) = grounded_wheel(FreeVector::zero());
        let force = wheel.apply_suspension(
            &mut body,
            &spring,
            opposite.map(ZeroOne::new_clamped),
            DT,
            &mut ImpulseQueue::new(),
        );
        assert!((force - expected).abs() < 1e-6, "force {force}");
    }

    #[test]
    fn friction_switches_between_static_and_kinetic() {
        let config = SimConfig::default();
        let tire = &config.tire;
        let (mut body, mut wheel) = grounded_wheel(vec3(5.0, 0.0, 0.0));
        let load =
            wheel.apply_suspension(&mut body, &config.spring, None, DT, &mut ImpulseQueue::new());

        // Sliding sideways at 5 m/s asks for more than static friction allows.
        let demanded = tire.lateral_stiffness * 5.0 * DT + tire.lateral_damping * 5.0;
        assert!(demanded > load * tire.static_friction);
        let force = tire_force(&mut body, &mut wheel, &config);
        assert!(wheel.is_slipping());
        assert!((force - load * tire.static_friction).abs() < 1e-6, "force {force}");
        let expected_slip = 1.0 - load * tire.static_friction / demanded;
        assert!((wheel.slip().into_inner() - expected_slip).abs() < 1e-9);

        // Once slipping, the lower kinetic coefficient applies.
        let force = tire_force(&mut body, &mut wheel, &config);
        assert!(wheel.is_slipping());
        assert!((force - load * tire.kinetic_friction).abs() < 1e-6, "force {force}");

        // Stopped, the remaining deformation is within the circle and the tire grips again.
        body.set_velocity(FreeVector::zero());
        let force = tire_force(&mut body, &mut wheel, &config);
        assert!(!wheel.is_slipping());
        assert_eq!(wheel.slip(), ZeroOne::ZERO);
        assert!(force > 0.0 && force < load * tire.kinetic_friction, "force {force}");
    }

    #[test]
    fn friction_circle_bounds_force() {
        let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(5);
        for _ in 0..1000 {
            let lateral = rng.random_range(-1e5..1e5);
            let longitudinal = rng.random_range(-1e5..1e5);
            let max = rng.random_range(0.0..5e4);
            let scale = friction_circle_scale(lateral, longitudinal, max);
            assert!((0.0..=1.0).contains(&scale));
            let clamped = ((lateral * scale).powi(2) + (longitudinal * scale).powi(2)).sqrt();
            assert!(clamped <= max * (1.0 + 1e-12) + 1e-9, "{clamped} > {max}");
        }
    }

    #[test]
    fn friction_circle_leaves_small_forces() {
        assert_eq!(friction_circle_scale(3.0, 4.0, 5.0), 1.0);
        assert_eq!(friction_circle_scale(6.0, 8.0, 5.0), 0.5);
        assert_eq!(friction_circle_scale(6.0, 8.0, -1.0), 0.0);
    }

    #[test]
    fn pairing_is_symmetric_and_first_match() {
        let mut wheels: Vec<Wheel> = [
            point3(-0.8, 1.5, 0.0),
            point3(0.8, 1.5, 0.0),
            point3(-0.8, -1.5, 0.0),
            point3(0.8, -1.3, 0.0),
            point3(0.0, -1.6, 0.0),
        ]
        .into_iter()
        .map(|hub| Wheel::new(WheelSpec::new(hub)))
        .collect();
        pair_wheels(&mut wheels);
        let pairs: Vec<Option<usize>> = wheels.iter().map(Wheel::opposite).collect();
        pretty_assertions::assert_eq!(pairs, vec![Some(1), Some(0), Some(3), Some(2), None]);
    }
}
