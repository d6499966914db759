#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use euclid::{point3, vec3};

use tread::character::Character;
use tread::config::SimConfig;
use tread::math::{Aab, Rotation};
use tread::net::{Networked as _, StatePacket, StateUpdate};
use tread::physics::{CollisionShape, RigidBody, StaticScene};
use tread::vehicle::Vehicle;
use tread::world::{Object, ObjectId, Role, World};

fn arena() -> StaticScene {
    let mut scene = StaticScene::new();
    scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 200.0);
    for i in 0..8 {
        let x = f64::from(i) * 6.0 - 24.0;
        scene.add_box(Aab::new(x, x + 2.0, 10.0, 12.0, 0.0, 0.4));
    }
    scene
}

fn populated_world(count: u32) -> World<StaticScene> {
    let config = SimConfig::default();
    let mut world = World::new(arena(), config.clone(), Role::Server);
    for i in 0..count {
        let x = f64::from(i % 8) * 6.0 - 24.0;
        let y = f64::from(i / 8) * 6.0;
        let object = match i % 3 {
            0 => {
                let half = vec3(0.5, 0.5, 0.5);
                Object::Body {
                    body: RigidBody::new(
                        10.0,
                        CollisionShape::cuboid_inertia(half, 10.0),
                        point3(x, y, 3.0),
                        Rotation::identity(),
                    ),
                    shape: CollisionShape::cuboid(half),
                }
            }
            1 => Object::Vehicle(Vehicle::car(point3(x, y, 1.0), Rotation::identity(), &config)),
            _ => Object::Character(Character::new(point3(x, y, 0.0), 0.0, &config.character)),
        };
        world.insert(object);
    }
    world
}

fn world_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world");
    for count in [1u32, 12, 48] {
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_function(BenchmarkId::new("step", count), |b| {
            b.iter_batched_ref(
                || populated_world(count),
                |world| black_box(world.step(false)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn state_records(c: &mut Criterion) {
    let world = populated_world(1);
    let (_, object) = world.objects().next().unwrap();
    let update = StateUpdate::new(ObjectId::new(0), 0, object.authoritative_state());
    let packet = update.encode();

    let mut group = c.benchmark_group("record");
    group.bench_function("encode", |b| b.iter(|| black_box(&update).encode()));
    group.bench_function("decode", |b| {
        b.iter(|| StatePacket::from_bytes(black_box(packet.as_bytes())).and_then(|p| p.decode()))
    });
    group.finish();
}

criterion_group!(benches, world_step, state_records);
criterion_main!(benches);
