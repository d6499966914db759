use manyfmt::Refmt as _;

use crate::config::CharacterConfig;
use crate::math::{FreeCoordinate, FreePoint, FreeVector, UP, project_onto_plane};
use crate::physics::{Response, ResponsePolicy, SweepContext, SweepHit, sweep_sphere};
use crate::util::ConciseDebug;

/// Extra height added to a step-up so that the sphere clears the top of the obstruction.
pub(crate) const STEP_CLEARANCE: FreeCoordinate = 0.01;

/// How a surface under a character may be used.
///
/// The two properties are judged by independent thresholds, so a slope may be walkable
/// without being jumpable.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct GroundClass {
    /// The character can stand and run on it.
    pub walkable: bool,
    /// The character can jump from it.
    pub jumpable: bool,
}

impl GroundClass {
    /// Classifies a surface by its unit normal.
    pub fn of_normal(normal: FreeVector, config: &CharacterConfig) -> Self {
        let up = normal.dot(UP);
        Self {
            walkable: up >= config.walkable_cos,
            jumpable: up >= config.jumpable_cos,
        }
    }
}

/// The [`ResponsePolicy`] of a walking character: step up onto low obstructions, and
/// otherwise slide along what was hit, losing speed to friction.
#[derive(Debug)]
pub struct SlideAndStep<'a> {
    config: &'a CharacterConfig,
    /// Number of step-ups performed.
    pub steps: u32,
}

impl<'a> SlideAndStep<'a> {
    /// Creates the policy for a character with the given configuration.
    pub fn new(config: &'a CharacterConfig) -> Self {
        Self { config, steps: 0 }
    }

    /// Tries to lift the sphere over the surface it hit. Returns whether it did.
    fn try_step(
        &mut self,
        context: &SweepContext<'_>,
        hit: &SweepHit,
        center: &mut FreePoint,
    ) -> bool {
        if hit.normal.dot(UP) >= self.config.step_dot {
            return false;
        }
        let feet = center.z - context.radius;
        let height = context.surfaces[hit.surface].highest_point() - feet;
        if !(height > 0.0 && height <= self.config.step_height) {
            return false;
        }
        let lift = UP * (height + STEP_CLEARANCE);
        if sweep_sphere(*center, context.radius, lift, context.surfaces).is_some() {
            return false;
        }
        log::trace!("stepped up {height:.3} at {:?}", center.refmt(&ConciseDebug));
        *center += lift;
        self.steps += 1;
        true
    }
}

impl ResponsePolicy for SlideAndStep<'_> {
    fn respond(
        &mut self,
        context: &SweepContext<'_>,
        hit: &SweepHit,
        center: &mut FreePoint,
        velocity: &mut FreeVector,
    ) -> Response {
        if self.try_step(context, hit, center) {
            return Response::Continue;
        }
        *velocity = deflect(*velocity, hit.normal, self.config);
        Response::Continue
    }
}

/// Removes the into-surface component of `velocity`, scaled by `1 + elasticity`, and
/// reduces the tangential component by the into-surface speed times the friction
/// coefficient, without reversing it.
pub(crate) fn deflect(
    velocity: FreeVector,
    normal: FreeVector,
    config: &CharacterConfig,
) -> FreeVector {
    let into = velocity.dot(normal);
    if into >= 0.0 {
        return velocity;
    }
    let tangential = project_onto_plane(velocity, normal);
    let speed = tangential.length();
    let lost = -into * config.friction;
    let tangential = if speed > lost {
        tangential * (1.0 - lost / speed)
    } else {
        FreeVector::zero()
    };
    tangential - normal * (into * config.elasticity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use euclid::vec3;
    use rstest::rstest;

    #[rstest]
    #[case::flat(0.0, true, true)]
    #[case::gentle(20.0, true, true)]
    #[case::walkable_only(40.0, true, false)]
    #[case::too_steep(50.0, false, false)]
    #[case::wall(90.0, false, false)]
    fn slope_classification(#[case] degrees: f64, #[case] walkable: bool, #[case] jumpable: bool) {
        let slope = degrees.to_radians();
        let normal = vec3(slope.sin(), 0.0, slope.cos());
        assert_eq!(
            GroundClass::of_normal(normal, &CharacterConfig::default()),
            GroundClass { walkable, jumpable }
        );
    }

    #[test]
    fn deflect_removes_into_surface_and_applies_friction() {
        let config = CharacterConfig {
            elasticity: 0.5,
            friction: 0.5,
            ..CharacterConfig::default()
        };
        let v = deflect(vec3(4.0, 0.0, -2.0), vec3(0.0, 0.0, 1.0), &config);
        assert_eq!(v, vec3(3.0, 0.0, 1.0));
    }

    #[test]
    fn deflect_does_not_reverse_sliding() {
        let v = deflect(vec3(0.1, 0.0, -5.0), vec3(0.0, 0.0, 1.0), &CharacterConfig::default());
        assert_eq!(v, vec3(0.0, 0.0, 0.0));
    }

    #[test]
    fn deflect_ignores_separating_motion() {
        let v = vec3(1.0, 2.0, 3.0);
        assert_eq!(deflect(v, vec3(0.0, 0.0, 1.0), &CharacterConfig::default()), v);
    }
}
