use euclid::{point3, vec3};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::character::Character;
use crate::config::SimConfig;
use crate::math::{FreePoint, FreeVector, Rotation};
use crate::net::{
    AuthoritativeState, Correction, InputRecord, Networked as _, ReconcileMode, StateUpdate,
    Triggers,
};
use crate::physics::{CollisionQuery, CollisionShape, RigidBody, StaticScene};
use crate::util::assert_send_sync;
use crate::vehicle::Vehicle;
use crate::world::{Object, ObjectId, ObjectStepInfo, Role, World};

fn cube(half: f64, mass: f64, x: f64, z: f64) -> Object {
    let half = vec3(half, half, half);
    Object::Body {
        body: RigidBody::new(
            mass,
            CollisionShape::cuboid_inertia(half, mass),
            point3(x, 0.0, z),
            Rotation::identity(),
        ),
        shape: CollisionShape::cuboid(half),
    }
}

fn weightless() -> SimConfig {
    let mut config = SimConfig::default();
    config.physics.gravity = FreeVector::zero();
    config
}

fn moving_cube(velocity: FreeVector) -> Object {
    let mut object = cube(0.5, 1.0, 0.0, 0.0);
    if let Object::Body { body, .. } = &mut object {
        body.set_velocity(velocity);
    }
    object
}

fn position_of<Q: CollisionQuery>(world: &World<Q>, id: ObjectId) -> FreePoint {
    world.get(id).unwrap().pose().position
}

#[test]
fn world_is_send_sync() {
    assert_send_sync::<World<StaticScene>>();
}

#[test]
fn ids_are_allocated_around_explicit_ones() {
    let mut world = World::new(StaticScene::new(), SimConfig::default(), Role::Server);
    assert!(world.insert_as(ObjectId::new(1), cube(0.5, 1.0, 0.0, 0.0)).is_none());
    let a = world.insert(cube(0.5, 1.0, 3.0, 0.0));
    let b = world.insert(cube(0.5, 1.0, 6.0, 0.0));
    assert_eq!((a, b), (ObjectId::new(0), ObjectId::new(2)));
    assert_eq!(world.len(), 3);

    assert!(world.remove(a).is_some());
    assert!(world.remove(a).is_none());
    let ids: Vec<ObjectId> = world.objects().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![ObjectId::new(1), ObjectId::new(2)]);
}

#[test]
fn paused_step_changes_nothing() {
    let mut world = World::new(StaticScene::new(), SimConfig::default(), Role::Server);
    let id = world.insert(cube(0.5, 1.0, 0.0, 10.0));
    let info = world.step(true);
    assert!(info.paused);
    assert_eq!((info.stepped, info.updates.len()), (0, 0));
    assert_eq!(world.next_tick_number(), 0);
    assert_eq!(position_of(&world, id), point3(0.0, 0.0, 10.0));
}

/// Runs one tick of a character landing on a resting box, and returns the box's velocity
/// afterward.
fn land_on_box(character_first: bool) -> FreeVector {
    let config = SimConfig::default();
    let mut world = World::new(StaticScene::new(), config.clone(), Role::Server);
    let mut resting_box = cube(1.0, 50.0, 0.0, 0.0);
    if let Object::Body { body, .. } = &mut resting_box {
        body.set_at_rest();
    }
    let mut character = Character::new(point3(0.0, 0.0, 1.02), 0.0, &config.character);
    character.set_velocity(vec3(0.0, 0.0, -2.0));

    let (box_id, character_id) = if character_first {
        (ObjectId::new(1), ObjectId::new(0))
    } else {
        (ObjectId::new(0), ObjectId::new(1))
    };
    world.insert_as(box_id, resting_box);
    world.insert_as(character_id, Object::Character(character));

    let info = world.step(false);
    assert_eq!(info.impulses, 1, "{info:?}");
    let object = world.get(box_id).unwrap();
    assert!(!object.is_at_rest());
    assert!(
        matches!(
            info.objects.iter().find(|(id, _)| *id == box_id),
            Some((_, ObjectStepInfo::Body(body_info))) if body_info.quiescent
        ),
        "box should have been asleep while stepped"
    );
    object.velocity()
}

#[test]
fn landing_character_pushes_box_after_all_objects_step() {
    let velocity = land_on_box(false);
    assert!(velocity.z < 0.0, "{velocity:?}");
    assert_eq!(land_on_box(true), velocity);
}

#[test]
fn working_set_refreshes_when_stale() {
    let config = SimConfig::default();
    let max_age = config.physics.working_set_max_age;
    let mut world = World::new(StaticScene::new(), config, Role::Server);
    let mut object = cube(0.5, 1.0, 0.0, 0.0);
    if let Object::Body { body, .. } = &mut object {
        body.set_at_rest();
    }
    world.insert(object);

    let queried: Vec<u32> = (0..2 * (max_age + 1) + 1)
        .filter(|_| world.step(false).queries > 0)
        .collect();
    assert_eq!(queried, vec![0, max_age + 1, 2 * (max_age + 1)]);
}

#[test]
fn working_set_refreshes_when_left() {
    // 0.45 m per tick against a 2 m margin.
    let mut world = World::new(StaticScene::new(), weightless(), Role::Server);
    world.insert(moving_cube(vec3(27.0, 0.0, 0.0)));
    let queried: Vec<u32> = (0..12).filter(|_| world.step(false).queries > 0).collect();
    assert_eq!(queried, vec![0, 5, 10]);
}

#[test]
fn server_broadcasts_moving_objects_on_schedule() {
    let config = SimConfig::default();
    assert_eq!(config.net.broadcast_interval, 3);
    let mut world = World::new(StaticScene::new(), config, Role::Server);
    let mut resting = cube(0.5, 1.0, 0.0, 0.0);
    if let Object::Body { body, .. } = &mut resting {
        body.set_at_rest();
    }
    let resting = world.insert(resting);
    let falling = world.insert(cube(0.5, 1.0, 5.0, 0.0));

    let mut sent = Vec::new();
    for _ in 0..10 {
        let info = world.step(false);
        for update in info.updates {
            sent.push((update.tick, update.object));
        }
    }
    assert_eq!(
        sent,
        vec![
            (0, resting),
            (0, falling),
            (3, falling),
            (6, falling),
            (9, falling),
        ]
    );

    let update = StateUpdate::new(falling, 9, world.get(falling).unwrap().authoritative_state());
    assert_eq!(world.receive(&update, 0), Some(Correction::Ignored));
}

#[test]
fn client_holds_while_warping() {
    let config = weightless();
    let dt = config.tick_seconds();
    let mut world = World::new(StaticScene::new(), config, Role::Client);
    let id = world.insert(moving_cube(vec3(10.0, 0.0, 0.0)));
    assert_eq!(world.step(false).stepped, 1);

    let predicted = world.get(id).unwrap().pose();
    let state = AuthoritativeState::new(
        predicted.position + vec3(0.4, 0.0, 0.0),
        predicted.orientation,
        vec3(10.0, 0.0, 0.0),
        FreeVector::zero(),
        false,
    );
    let correction = world.receive(&StateUpdate::new(id, 1, state), 0);
    assert_eq!(correction, Some(Correction::Warp { ticks: 2 }));
    assert_eq!(world.reconcile_mode(id), Some(ReconcileMode::Warping));

    for expected_mode in [ReconcileMode::Warping, ReconcileMode::Predicting] {
        let info = world.step(false);
        assert_eq!((info.stepped, info.held), (0, 1));
        assert_eq!(info.objects, vec![(id, ObjectStepInfo::Held)]);
        assert_eq!(world.reconcile_mode(id), Some(expected_mode));
    }
    let warped = state.position + vec3(10.0, 0.0, 0.0) * (2.0 * dt);
    assert!((position_of(&world, id) - warped).length() < 1e-9);

    assert_eq!(world.step(false).stepped, 1);
    let simulated = warped + vec3(10.0, 0.0, 0.0) * dt;
    assert!((position_of(&world, id) - simulated).length() < 1e-9);
}

#[test]
fn client_stops_after_prediction_horizon() {
    let config = weightless();
    let horizon = config.net.max_prediction_ticks;
    let mut world = World::new(StaticScene::new(), config, Role::Client);
    let id = world.insert(moving_cube(vec3(1.0, 0.0, 0.0)));

    for _ in 0..horizon {
        assert_eq!(world.step(false).stepped, 1);
    }
    let stopped_at = position_of(&world, id);
    let info = world.step(false);
    assert_eq!((info.stepped, info.held), (0, 1));
    assert_eq!(world.reconcile_mode(id), Some(ReconcileMode::Snapped));
    assert_eq!(position_of(&world, id), stopped_at);

    let state = world.get(id).unwrap().authoritative_state();
    assert_eq!(
        world.receive(&StateUpdate::new(id, horizon, state), 0),
        Some(Correction::Folded)
    );
    assert_eq!(world.step(false).stepped, 1);
}

#[test]
fn render_pose_of_missing_object() {
    let world = World::new(StaticScene::new(), SimConfig::default(), Role::Client);
    assert_eq!(world.render_pose(ObjectId::new(7), 0.5), None);
    assert_eq!(world.reconcile_mode(ObjectId::new(7)), None);
}

#[rstest]
#[case::body(false)]
#[case::character(true)]
fn input_goes_only_to_controllable_objects(#[case] controllable: bool) {
    let config = SimConfig::default();
    let mut world = World::new(StaticScene::new(), config.clone(), Role::Server);
    let object = if controllable {
        Object::Character(Character::new(point3(0.0, 0.0, 0.0), 0.0, &config.character))
    } else {
        cube(0.5, 1.0, 0.0, 0.0)
    };
    let id = world.insert(object);
    let input = InputRecord::new(0, 1.0, 0.0, 0.0, Triggers::empty());
    assert_eq!(world.apply_input(id, &input), controllable);
    assert!(!world.apply_input(ObjectId::new(99), &input));
}

#[test]
fn car_drives_on_ground() {
    let config = SimConfig::default();
    let mut scene = StaticScene::new();
    scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 500.0);
    let mut world = World::new(scene, config.clone(), Role::Server);
    let car = world.insert(Object::Vehicle(Vehicle::car(
        point3(0.0, 0.0, 1.0),
        Rotation::identity(),
        &config,
    )));
    for _ in 0..60 {
        world.step(false);
    }
    assert!(world.apply_input(
        car,
        &InputRecord::new(60, 1.0, 0.0, 0.0, Triggers::empty())
    ));
    for _ in 0..60 {
        world.step(false);
    }
    let Some(Object::Vehicle(vehicle)) = world.get(car) else {
        panic!("car missing");
    };
    let speed = vehicle.forward_speed();
    assert!(speed > 1.0, "speed {speed}");
}
