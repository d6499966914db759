//! Built-in scenarios and running them.

use std::fmt;

use euclid::{point3, vec3};
use manyfmt::Refmt as _;

use tread::character::Character;
use tread::config::SimConfig;
use tread::math::{Aab, FreeCoordinate, FreePoint, Rotation};
use tread::net::{InputRecord, Triggers};
use tread::physics::{CollisionShape, RigidBody, StaticScene};
use tread::time::TickNumber;
use tread::util::ConciseDebug;
use tread::vehicle::Vehicle;
use tread::world::{Object, ObjectId, Role, World};

/// A built-in situation to simulate.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
#[non_exhaustive]
pub enum Scenario {
    /// A tilted box falls onto the ground and settles.
    Drop,
    /// A car settles on its suspension for a second, then accelerates at full throttle.
    Drive,
    /// A character walks forward and climbs a low step.
    Walk,
}

impl Scenario {
    /// Builds the world for this scenario, returning it along with the object the summary
    /// describes.
    pub fn build(self, config: &SimConfig) -> (World<StaticScene>, ObjectId) {
        let mut scene = StaticScene::new();
        scene.add_plane(point3(0.0, 0.0, 0.0), vec3(0.0, 0.0, 1.0), 500.0);
        if self == Scenario::Walk {
            scene.add_box(Aab::new(-5.0, 5.0, 4.0, 8.0, 0.0, 0.3));
        }

        let object = match self {
            Scenario::Drop => {
                let half = vec3(0.5, 0.5, 0.5);
                let mass = 100.0;
                Object::Body {
                    body: RigidBody::new(
                        mass,
                        CollisionShape::cuboid_inertia(half, mass),
                        point3(0.0, 0.0, 10.0),
                        Rotation::around_axis(vec3(1.0, 0.3, 0.0), euclid::Angle::radians(0.3)),
                    ),
                    shape: CollisionShape::cuboid(half),
                }
            }
            Scenario::Drive => Object::Vehicle(Vehicle::car(
                point3(0.0, 0.0, 1.0),
                Rotation::identity(),
                config,
            )),
            Scenario::Walk => Object::Character(Character::new(
                point3(0.0, 0.0, 0.0),
                0.0,
                &config.character,
            )),
        };

        let mut world = World::new(scene, config.clone(), Role::Server);
        let id = world.insert(object);
        (world, id)
    }

    /// Input given to the scenario's object on `tick`.
    fn input(self, tick: TickNumber) -> Option<InputRecord> {
        match self {
            Scenario::Drop => None,
            Scenario::Drive => {
                let throttle = if tick < 60 { 0.0 } else { 1.0 };
                Some(InputRecord::new(tick, throttle, 0.0, 0.0, Triggers::empty()))
            }
            Scenario::Walk => Some(InputRecord::new(tick, 1.0, 0.0, 0.0, Triggers::empty())),
        }
    }

    /// Builds and runs this scenario for `ticks` ticks.
    pub fn run(self, config: &SimConfig, ticks: TickNumber) -> Summary {
        let (mut world, id) = self.build(config);
        let mut summary = Summary {
            scenario: self,
            ticks: 0,
            position: FreePoint::origin(),
            speed: 0.0,
            at_rest: false,
            ticks_to_rest: None,
            impulses: 0,
            queries: 0,
            updates: 0,
        };

        for _ in 0..ticks {
            let number = world.next_tick_number();
            if let Some(input) = self.input(number) {
                world.apply_input(id, &input);
            }
            let info = world.step(false);
            log::trace!("{:?}", info.refmt(&ConciseDebug));
            summary.ticks += 1;
            summary.impulses += info.impulses;
            summary.queries += info.queries;
            summary.updates += info.updates.len();

            if let Some(object) = world.get(id) {
                if object.is_at_rest() && summary.ticks_to_rest.is_none() {
                    summary.ticks_to_rest = Some(summary.ticks);
                    log::info!("{self:?}: object came to rest after {} ticks", summary.ticks);
                }
            }
        }

        if let Some(object) = world.get(id) {
            summary.position = object.pose().position;
            summary.speed = object.velocity().length();
            summary.at_rest = object.is_at_rest();
        }
        summary
    }
}

/// The outcome of [`Scenario::run()`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct Summary {
    /// Which scenario was run.
    pub scenario: Scenario,
    /// Number of ticks simulated.
    pub ticks: TickNumber,
    /// Final position of the scenario's object.
    pub position: FreePoint,
    /// Final speed of the scenario's object.
    pub speed: FreeCoordinate,
    /// Whether the object is at rest at the end.
    pub at_rest: bool,
    /// Number of ticks after which the object first came to rest.
    pub ticks_to_rest: Option<TickNumber>,
    /// Total impulses exchanged between objects.
    pub impulses: u32,
    /// Total collision queries made.
    pub queries: u32,
    /// Total state updates the server would have broadcast.
    pub updates: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.position;
        writeln!(f, "scenario:      {:?}", self.scenario)?;
        writeln!(f, "ticks:         {}", self.ticks)?;
        writeln!(f, "position:      ({:.3}, {:.3}, {:.3})", p.x, p.y, p.z)?;
        writeln!(f, "speed:         {:.3} m/s", self.speed)?;
        writeln!(f, "at rest:       {}", self.at_rest)?;
        match self.ticks_to_rest {
            Some(ticks) => writeln!(f, "ticks to rest: {ticks}")?,
            None => writeln!(f, "ticks to rest: never")?,
        }
        write!(
            f,
            "queries: {}, impulses: {}, updates: {}",
            self.queries, self.impulses, self.updates
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn drop_comes_to_rest() {
        let summary = Scenario::Drop.run(&SimConfig::default(), 600);
        assert!(summary.at_rest, "{summary}");
        let ticks_to_rest = summary.ticks_to_rest.unwrap();
        assert!(ticks_to_rest < 300, "{summary}");
        assert!(summary.position.z < 1.0, "{summary}");
        assert_eq!(summary.speed, 0.0);
    }

    #[test]
    fn drive_gains_speed() {
        let summary = Scenario::Drive.run(&SimConfig::default(), 120);
        assert!(summary.speed > 1.0, "{summary}");
        assert!(!summary.at_rest);
    }

    #[test]
    fn walk_moves_forward() {
        let summary = Scenario::Walk.run(&SimConfig::default(), 60);
        assert!(summary.position.y > 3.0, "{summary}");
        assert_eq!(summary.ticks_to_rest, None);
    }

    #[rstest]
    fn every_scenario_broadcasts(
        #[values(Scenario::Drop, Scenario::Drive, Scenario::Walk)] scenario: Scenario,
    ) {
        let summary = scenario.run(&SimConfig::default(), 10);
        assert_eq!(summary.ticks, 10);
        assert!(summary.updates >= 1, "{summary}");
        assert!(summary.queries >= 1, "{summary}");
    }

    #[test]
    fn summary_display() {
        let summary = Summary {
            scenario: Scenario::Drop,
            ticks: 5,
            position: point3(1.0, 2.0, 0.5),
            speed: 0.0,
            at_rest: true,
            ticks_to_rest: Some(4),
            impulses: 0,
            queries: 1,
            updates: 2,
        };
        assert_eq!(
            summary.to_string(),
            "scenario:      Drop\n\
             ticks:         5\n\
             position:      (1.000, 2.000, 0.500)\n\
             speed:         0.000 m/s\n\
             at rest:       true\n\
             ticks to rest: 4\n\
             queries: 1, impulses: 0, updates: 2"
        );
    }
}
