use std::sync::Arc;

use euclid::{point3, vec3};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::config::SimConfig;
use crate::math::{Aab, Rotation};
use crate::physics::{
    CollisionQuery as _, CollisionShape, ImpulseQueue, RigidBody, StaticScene, Surface,
    SurfaceMask,
};
use crate::time::{Tick, TickNumber};
use crate::vehicle::{Controls, Vehicle, Wheel, WheelSpec};

fn ground() -> Vec<Surface> {
    let mut scene = StaticScene::new();
    scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 500.0);
    let mut surfaces = Vec::new();
    scene.find_surfaces(
        &Aab::new(-1.0, 1.0, -1.0, 1.0, -1.0, 1.0),
        SurfaceMask::SOLID,
        &mut surfaces,
    );
    surfaces
}

fn run(
    vehicle: &mut Vehicle,
    surfaces: &[Surface],
    config: &SimConfig,
    start: TickNumber,
    ticks: TickNumber,
) {
    let mut impulses = ImpulseQueue::new();
    for number in start..start + ticks {
        let tick = Tick::arbitrary().with_number(number);
        vehicle.step(surfaces, tick, &config.physics, &mut impulses);
        assert!(impulses.is_empty());
    }
}

/// A car with only its rear left wheel powered.
fn one_wheel_drive(config: &SimConfig) -> Vehicle {
    let mass = config.vehicle.mass;
    let half = vec3(0.9, 2.0, 0.3);
    Vehicle::new(
        RigidBody::new(
            mass,
            CollisionShape::cuboid_inertia(half, mass),
            point3(0.0, 0.0, 1.0),
            Rotation::identity(),
        ),
        CollisionShape::cuboid(half),
        [
            WheelSpec::new(point3(-0.8, 1.5, -0.2)).steered(1.0),
            WheelSpec::new(point3(0.8, 1.5, -0.2)).steered(1.0),
            WheelSpec::new(point3(-0.8, -1.5, -0.2)).powered(),
            WheelSpec::new(point3(0.8, -1.5, -0.2)),
        ],
        Arc::new(config.tire.clone()),
        Arc::new(config.spring.clone()),
        config.vehicle.clone(),
    )
}

#[test]
fn car_wheels_are_paired_across_axles() {
    let car = Vehicle::car(point3(0.0, 0.0, 1.0), Rotation::identity(), &SimConfig::default());
    let pairs: Vec<Option<usize>> = car.wheels().iter().map(Wheel::opposite).collect();
    assert_eq!(pairs, vec![Some(1), Some(0), Some(3), Some(2)]);
}

#[test]
fn settled_suspension_holds_extension() {
    let config = SimConfig::default();
    let surfaces = ground();
    let mut car = Vehicle::car(point3(0.0, 0.0, 1.0), Rotation::identity(), &config);
    run(&mut car, &surfaces, &config, 0, 240);

    // Each wheel carries a quarter of the weight.
    let load = config.vehicle.mass * -config.physics.gravity.z / 4.0;
    let equilibrium = 1.0 - load / config.spring.force;
    let settled: Vec<f64> = car.wheels().iter().map(|w| w.extension().into_inner()).collect();
    for &extension in &settled {
        assert!((extension - equilibrium).abs() < 0.01, "{settled:?}");
    }

    for number in 240..340 {
        run(&mut car, &surfaces, &config, number, 1);
        for (wheel, &before) in car.wheels().iter().zip(&settled) {
            assert!(
                (wheel.extension().into_inner() - before).abs() < 1e-3,
                "tick {number}: {before} -> {:?}",
                wheel.extension()
            );
        }
    }
    assert!(car.body().velocity().length() < config.physics.contact_velocity_tolerance);
}

#[test]
fn single_powered_wheel_reaches_steady_state() {
    let config = SimConfig::default();
    let max_speed = config.vehicle.max_wheel_speed;
    let surfaces = ground();
    let mut car = one_wheel_drive(&config);
    run(&mut car, &surfaces, &config, 0, 120);
    assert!(car.forward_speed().abs() < 0.1);

    car.set_controls(Controls::new(1.0, 0.0, false));
    assert!(!car.body().is_at_rest());
    run(&mut car, &surfaces, &config, 120, 60);
    assert!(car.forward_speed() > 0.5, "speed {}", car.forward_speed());
    assert!(car.wheels()[2].angular_velocity() > 0.0);

    // The drive torque tapers to zero at the wheel speed limit, so with nothing else
    // resisting, the car approaches that speed and the one-sided push stops turning it.
    run(&mut car, &surfaces, &config, 180, 1380);
    let mut speeds = Vec::new();
    for number in 1560..1680 {
        run(&mut car, &surfaces, &config, number, 1);
        speeds.push(car.forward_speed());
        let yaw_rate = car.body().angular_velocity().z;
        assert!(yaw_rate.abs() < 0.5, "tick {number}: yaw rate {yaw_rate}");
        for wheel in car.wheels() {
            assert!(
                wheel.angular_velocity().abs() * config.tire.radius <= max_speed + 1e-9
            );
            assert!((0.0..core::f64::consts::TAU).contains(&wheel.angle()));
        }
    }
    let slowest = speeds.iter().copied().fold(f64::INFINITY, f64::min);
    let fastest = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(slowest > 0.75 * max_speed, "{speeds:?}");
    assert!(fastest <= max_speed + 0.1, "{speeds:?}");
    assert!(fastest - slowest < 0.5, "still accelerating: {speeds:?}");
}

#[test]
fn brakes_slow_the_car() {
    let config = SimConfig::default();
    let surfaces = ground();
    let mut car = Vehicle::car(point3(0.0, 0.0, 1.0), Rotation::identity(), &config);
    run(&mut car, &surfaces, &config, 0, 60);
    car.set_controls(Controls::new(1.0, 0.0, false));
    run(&mut car, &surfaces, &config, 60, 60);
    let cruising = car.forward_speed();
    assert!(cruising > 1.0, "speed {cruising}");

    car.set_controls(Controls::new(0.0, 0.0, true));
    run(&mut car, &surfaces, &config, 120, 30);
    let braked = car.forward_speed();
    assert!(braked.abs() < cruising * 0.5, "{cruising} -> {braked}");
}

#[test]
fn steering_turns_only_steered_wheels() {
    let config = SimConfig::default();
    let mut car = Vehicle::car(point3(0.0, 0.0, 1.0), Rotation::identity(), &config);
    car.set_controls(Controls::new(0.0, 0.5, false));
    run(&mut car, &ground(), &config, 0, 1);
    let angles: Vec<f64> = car.wheels().iter().map(Wheel::steering_angle).collect();
    let expected = 0.5 * config.vehicle.max_steering_angle;
    assert_eq!(angles, vec![expected, expected, 0.0, 0.0]);
}

#[test]
fn airborne_wheels_relax_deformation() {
    let config = SimConfig::default();
    let mut car = Vehicle::car(point3(0.0, 0.0, 1.0), Rotation::identity(), &config);
    run(&mut car, &ground(), &config, 0, 60);
    car.set_controls(Controls::new(1.0, 0.0, false));
    run(&mut car, &ground(), &config, 60, 20);
    let magnitude = |car: &Vehicle| -> Vec<f64> {
        car.wheels()
            .iter()
            .map(|w| w.lateral_deformation().hypot(w.longitudinal_deformation()))
            .collect()
    };
    let initial = magnitude(&car);
    assert!(initial.iter().any(|&d| d > 1e-4), "{initial:?}");
    let mut before = initial.clone();

    // Lift the car into empty space.
    car.body_mut().set_position(point3(0.0, 0.0, 100.0));
    for number in 80..100 {
        run(&mut car, &[], &config, number, 1);
        let after = magnitude(&car);
        for (a, b) in after.iter().zip(&before) {
            assert!(a <= b, "{before:?} -> {after:?}");
        }
        for wheel in car.wheels() {
            assert!(wheel.contact().is_none());
            assert!(wheel.extension().is_one());
            assert!(!wheel.is_slipping());
        }
        before = after;
    }
    for (last, first) in before.iter().zip(&initial) {
        assert!(*last <= first * 0.05, "{initial:?} -> {before:?}");
    }
}

#[rstest]
#[case::nearly_extended(0.84, 0.98)]
#[case::beyond_reach(2.0, 1.0)]
#[case::equilibrium(0.725, 0.75)]
#[case::half(0.6, 0.5)]
#[case::fully_compressed(0.2, 0.0)]
fn extension_from_ground_distance(#[case] hub_height: f64, #[case] expected: f64) {
    let config = SimConfig::default();
    let body = RigidBody::new(
        1.0,
        CollisionShape::cuboid_inertia(vec3(1.0, 1.0, 1.0), 1.0),
        point3(0.0, 0.0, hub_height),
        Rotation::identity(),
    );
    let mut wheel = Wheel::new(WheelSpec::new(point3(0.0, 0.0, 0.0)));
    wheel.probe(&body, &ground(), &config.tire, &config.spring);
    assert!((wheel.extension().into_inner() - expected).abs() < 1e-9);
    assert_eq!(
        wheel.contact().is_some(),
        hub_height <= config.tire.radius + config.spring.length
    );
}

#[test]
fn controls_are_clamped() {
    let controls = Controls::new(3.0, f64::NAN, false);
    assert_eq!(controls, Controls::new(1.0, 0.0, false));
    assert!(!controls.is_idle());
    assert!(Controls::default().is_idle());
}
