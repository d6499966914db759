//! Rigid bodies, contacts, and the collision surfaces they are resolved against.

use crate::math::FreeCoordinate;

mod body;
pub use body::*;
mod contact;
pub use contact::*;
mod query;
pub use query::*;
mod resolve;
pub use resolve::*;
mod shape;
pub use shape::*;
mod step;
pub use step::*;
pub(crate) mod sweep;
pub use sweep::{Response, ResponsePolicy, RigidImpulse, SweepContext, SweepHit, SweepOutcome};
pub use sweep::{RayHit, raycast, sweep_and_resolve, sweep_sphere};

#[cfg(test)]
mod tests;

/// Moving objects that stop at a surface are placed this far from it, so that the next
/// sweep does not start already touching.
pub(crate) const POSITION_EPSILON: FreeCoordinate = 1e-4;
