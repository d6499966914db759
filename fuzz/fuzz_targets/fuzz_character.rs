#![no_main]

use libfuzzer_sys::fuzz_target;

use tread::character::{Character, CharacterInput};
use tread::config::{CharacterConfig, PhysicsConfig};
use tread::math::{Aab, FreeCoordinate, FreePoint, FreeVector, NotNan};
use tread::physics::{CollisionQuery as _, ImpulseQueue, StaticScene, SurfaceMask};
use tread::time::Tick;

type Triple = [NotNan<FreeCoordinate>; 3];

fn unwrap_triple(value: Triple) -> [FreeCoordinate; 3] {
    value.map(NotNan::into_inner)
}

fuzz_target!(|input: (Triple, Triple, Vec<(Triple, Triple)>, Vec<CharacterInput>)| {
    let (feet, velocity, boxes, inputs) = input;
    let feet = FreePoint::from(unwrap_triple(feet));
    let velocity = FreeVector::from(unwrap_triple(velocity));
    if !(feet.to_vector().length() < 100.0) || !(velocity.length() < 1000.0) {
        return;
    }
    if inputs.iter().any(|i| {
        ![i.forward, i.strafe, i.turn, i.look]
            .iter()
            .all(|value| value.is_finite())
    }) {
        return;
    }

    let mut scene = StaticScene::new();
    scene.add_plane(FreePoint::new(0.0, 0.0, -20.0), FreeVector::new(0.0, 0.0, 1.0), 200.0);
    for (lower, size) in boxes.into_iter().take(8) {
        let lower = FreePoint::from(unwrap_triple(lower));
        let size = FreeVector::from(unwrap_triple(size));
        if !(lower.to_vector().length() < 100.0)
            || !(size.x >= 0.05 && size.y >= 0.05 && size.z >= 0.05)
            || !(size.length() < 100.0)
        {
            continue;
        }
        scene.add_box(Aab::from_lower_upper(lower, lower + size));
    }
    let bounds = Aab::new(-300.0, 300.0, -300.0, 300.0, -300.0, 300.0);
    let mut surfaces = Vec::new();
    scene.find_surfaces(&bounds, SurfaceMask::all(), &mut surfaces);

    let physics = PhysicsConfig::default();
    let config = CharacterConfig::default();
    let mut character = Character::new(feet, 0.0, &config);
    character.set_velocity(velocity);
    let mut impulses = ImpulseQueue::new();

    for (i, &step_input) in inputs.iter().cycle().take(300).enumerate() {
        if !bounds.contains(character.feet()) {
            // Flying out of bounds is not interesting.
            return;
        }
        character.set_input(step_input);
        let info = character.step(
            &surfaces,
            Tick::arbitrary().with_number(i as u32),
            &physics,
            &config,
            &mut impulses,
        );
        assert!(info.sweeps <= config.max_retries, "{info:?}");
        let feet = character.feet();
        assert!(
            feet.x.is_finite() && feet.y.is_finite() && feet.z.is_finite(),
            "non-finite position after {info:?}"
        );
        assert!(impulses.is_empty(), "static surfaces should not be pushed");
    }
});
