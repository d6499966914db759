use euclid::{point3, vec3};
use rand::{Rng as _, SeedableRng as _};
use rstest::rstest;

use crate::config::PhysicsConfig;
use crate::math::{Aab, FreeVector, Rotation, angle_between, yaw_rotation};
use crate::physics::{
    CollisionQuery as _, CollisionShape, ImpulseQueue, RigidBody, StaticScene, Surface,
    SurfaceKind, SurfaceMask, step_one_body,
};
use crate::time::Tick;
use crate::world::ObjectId;

fn ground_surfaces() -> Vec<Surface> {
    let mut scene = StaticScene::new();
    scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 50.0);
    let mut surfaces = Vec::new();
    scene.find_surfaces(
        &Aab::new(-60.0, 60.0, -60.0, 60.0, -60.0, 60.0),
        SurfaceMask::all(),
        &mut surfaces,
    );
    surfaces
}

fn unit_cube(mass: f64, z: f64, orientation: Rotation) -> (RigidBody, CollisionShape) {
    let half = vec3(0.5, 0.5, 0.5);
    (
        RigidBody::new(
            mass,
            CollisionShape::cuboid_inertia(half, mass),
            point3(0.0, 0.0, z),
            orientation,
        ),
        CollisionShape::cuboid(half),
    )
}

#[test]
fn free_integration_conserves_energy_without_drag() {
    let config = PhysicsConfig::default();
    let mut rng = rand_xoshiro::Xoshiro256Plus::seed_from_u64(0x7e4d);
    for _ in 0..20 {
        let (mut body, _) = unit_cube(rng.random_range(0.5..50.0), 0.0, Rotation::identity());
        body.set_momentum(
            vec3(
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
                rng.random_range(-10.0..10.0),
            ),
            vec3(
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
                rng.random_range(-5.0..5.0),
            ),
        );
        let energy = body.kinetic_energy();
        for _ in 0..600 {
            body.clear_forces();
            body.integrate(1.0 / 240.0, &config);
        }
        let drift = (body.kinetic_energy() - energy).abs() / energy;
        assert!(drift < 1e-9, "energy drifted by {drift}: {body:?}");
    }
}

#[rstest]
fn drag_never_adds_energy(#[values(0.1, 1.0, 10.0, 1000.0)] drag: f64) {
    let config = PhysicsConfig::default();
    let (mut body, _) = unit_cube(3.0, 0.0, yaw_rotation(0.7));
    body.linear_drag = drag;
    body.angular_drag = drag;
    body.set_momentum(vec3(3.0, -4.0, 1.0), vec3(0.5, 0.25, -2.0));
    let mut energy = body.kinetic_energy();
    for _ in 0..240 {
        body.integrate(1.0 / 240.0, &config);
        let next = body.kinetic_energy();
        assert!(next <= energy * (1.0 + 1e-12), "{next} > {energy}");
        energy = next;
    }
}

/// A cube dropped from a height comes to rest on the ground, at the separation where
/// the penalty springs of its four bottom corners carry its weight.
#[rstest]
fn dropped_cube_comes_to_rest(
    #[values(1.0, 100.0)] mass: f64,
    #[values(0.0, 0.3)] tilt: f64,
) {
    let config = PhysicsConfig::default();
    let surfaces = ground_surfaces();
    let orientation = Rotation::around_axis(vec3(1.0, 0.3, 0.0), euclid::Angle::radians(tilt));
    let (mut body, shape) = unit_cube(mass, 10.0, orientation);
    let mut impulses = ImpulseQueue::new();

    let mut first_contact = None;
    let mut rested = None;
    for tick_number in 0..600 {
        let info = step_one_body(
            &mut body,
            &shape,
            &surfaces,
            Tick::arbitrary().with_number(tick_number),
            &config,
            &mut (),
            &mut impulses,
        );
        if first_contact.is_none() && (info.collisions > 0 || info.resting_contacts > 0) {
            first_contact = Some(tick_number);
        }
        if info.came_to_rest {
            rested = Some(tick_number);
            break;
        }
    }

    let first_contact = first_contact.expect("never touched the ground");
    let rested = rested.expect("never came to rest");
    assert!(
        rested - first_contact <= 150,
        "took {} ticks to rest",
        rested - first_contact
    );
    let gravity = -config.gravity.z;
    let equilibrium =
        0.5 + config.collision_tolerance - gravity / (4.0 * config.zero_impulse_stiffness);
    assert!(
        (body.center_of_mass().z - equilibrium).abs() < 0.005,
        "rested at {body:?}"
    );
    assert!(impulses.is_empty());
}

#[test]
fn resting_body_is_not_stepped() {
    let config = PhysicsConfig::default();
    let (mut body, shape) = unit_cube(1.0, 3.0, Rotation::identity());
    body.set_at_rest();
    let info = step_one_body(
        &mut body,
        &shape,
        &[],
        Tick::arbitrary(),
        &config,
        &mut (),
        &mut ImpulseQueue::new(),
    );
    assert!(info.quiescent);
    assert_eq!(body.position(), point3(0.0, 0.0, 3.0));
}

#[test]
fn fast_body_does_not_pass_through_floor() {
    let config = PhysicsConfig::default();
    let surfaces = ground_surfaces();
    let (mut body, shape) = unit_cube(1.0, 3.0, Rotation::identity());
    body.set_velocity(vec3(0.0, 0.0, -150.0));
    let mut swept = 0;
    for tick_number in 0..10 {
        let info = step_one_body(
            &mut body,
            &shape,
            &surfaces,
            Tick::arbitrary().with_number(tick_number),
            &config,
            &mut (),
            &mut ImpulseQueue::new(),
        );
        swept += info.swept_hits;
        assert!(body.center_of_mass().z > 0.0, "fell through: {body:?}");
    }
    assert!(swept > 0);
}

/// A body fast enough to need the swept guard pushes back on the object it hits.
#[test]
fn swept_hit_on_object_queues_reaction() {
    let config = PhysicsConfig::default();
    let platform = ObjectId::new(4);
    let surfaces = vec![
        Surface::new(
            [
                point3(-10.0, -10.0, 0.0),
                point3(10.0, -10.0, 0.0),
                point3(10.0, 10.0, 0.0),
                point3(-10.0, 10.0, 0.0),
            ],
            SurfaceKind::Object(platform),
        )
        .unwrap()
        .with_motion(FreeVector::zero(), 0.01),
    ];
    // The sweep reaches the platform in the last of the 4 sub-steps.
    let (mut body, shape) = unit_cube(2.0, 2.9, Rotation::identity());
    body.set_velocity(vec3(0.0, 0.0, -150.0));
    let mut impulses = ImpulseQueue::new();

    let info = step_one_body(
        &mut body,
        &shape,
        &surfaces,
        Tick::arbitrary(),
        &config,
        &mut (),
        &mut impulses,
    );

    assert_eq!(info.swept_hits, 1);
    assert_eq!(info.collisions, 0, "reaction should come only from the sweep");
    assert_eq!(impulses.len(), 1);
    let queued = impulses.iter().next().unwrap();
    assert_eq!(queued.target, platform);
    let expected = body.mass() * 150.0 * (1.0 + body.restitution);
    assert!(
        queued.impulse.z < -expected && queued.impulse.z > -expected * 1.01,
        "{queued:?}"
    );
    assert!(queued.impulse.x.abs() < 1e-9 && queued.impulse.y.abs() < 1e-9);
    assert!(body.velocity().z > 0.0, "should have bounced: {body:?}");
}

#[test]
fn inertia_is_symmetrized_periodically() {
    let mut config = PhysicsConfig::default();
    config.renormalize_interval = 7;
    let half = vec3(0.2, 0.7, 1.3);
    let mut body = RigidBody::new(
        5.0,
        CollisionShape::cuboid_inertia(half, 5.0),
        point3(0.0, 0.0, 0.0),
        Rotation::around_axis(vec3(1.0, 2.0, 3.0), euclid::Angle::radians(0.4)),
    );
    body.set_momentum(FreeVector::zero(), vec3(1.5, -0.4, 2.2));
    let mut unrenormalized = body.clone();
    let mut plain_config = config.clone();
    plain_config.renormalize_interval = 0;

    for integration in 1..=70 {
        body.integrate(1.0 / 240.0, &config);
        unrenormalized.integrate(1.0 / 240.0, &plain_config);
        if integration % 7 == 0 {
            let inertia = body.inverse_inertia();
            assert_eq!(*inertia, inertia.transpose(), "after {integration} integrations");
        }
    }
    assert!((body.angular_velocity() - unrenormalized.angular_velocity()).length() < 1e-9);
    assert!(angle_between(&body.orientation(), &unrenormalized.orientation()) < 1e-6);
}

#[test]
fn speed_is_capped() {
    let config = PhysicsConfig::default();
    let (mut body, shape) = unit_cube(1.0, 100.0, Rotation::identity());
    body.set_velocity(vec3(1000.0, 0.0, 0.0));
    step_one_body(
        &mut body,
        &shape,
        &[],
        Tick::arbitrary(),
        &config,
        &mut (),
        &mut ImpulseQueue::new(),
    );
    assert!(body.velocity().length() <= config.max_velocity + 1e-9);
    assert!(body.velocity().x > 0.0);
}

#[test]
fn gravity_without_surfaces() {
    let config = PhysicsConfig::default();
    let (mut body, shape) = unit_cube(1.0, 100.0, Rotation::identity());
    let info = step_one_body(
        &mut body,
        &shape,
        &[],
        Tick::from_seconds(0.5),
        &config,
        &mut (),
        &mut ImpulseQueue::new(),
    );
    assert_eq!(info.collisions, 0);
    assert!((body.velocity() - FreeVector::new(0.0, 0.0, -10.0)).length() < 1e-9);
    assert!((info.delta_v - FreeVector::new(0.0, 0.0, -10.0)).length() < 1e-9);
}
