//! Tread is a real-time physics engine for wheeled vehicles, free rigid bodies and walking
//! characters in a networked 3D simulation.
//!
//! ## Overview
//!
//! Each fixed-length [`time::Tick`], a [`world::World`]:
//!
//! 1. computes wheel, suspension and tire forces for every [`vehicle::Vehicle`] and the
//!    desired movement of every [`character::Character`],
//! 2. resolves contacts against the surfaces supplied by a [`physics::CollisionQuery`]
//!    (collision impulses for fast impacts, penalty springs for resting support),
//! 3. integrates every [`physics::RigidBody`], and
//! 4. on a server, packages the authoritative state of each object for broadcast, or on a
//!    client, reconciles received authoritative state with its own prediction
//!    (see the [`net`] module).
//!
//! All tunable constants are passed in explicitly as a [`config::SimConfig`] value.
//!
//! Coordinates are right-handed with +Z up; a body's local frame has +X to the right and
//! +Y forward. Quantities are in meters, seconds and kilograms.
//!
//! ## Crate features
//!
//! * `serde`: `Serialize` and `Deserialize` for configuration types.
//! * `arbitrary`: `arbitrary::Arbitrary` for input types, used by fuzzing.
//!
//! ## Error handling
//!
//! Simulation never fails: degenerate numbers, exhausted iteration budgets and
//! desynchronization are handled by documented fallbacks and reported in the `*Info`
//! values returned by stepping functions, and by [`log`] messages. The only fallible
//! operations are decoding network records ([`net::DecodeError`]).

pub mod character;
pub mod config;
pub mod net;
pub mod physics;
pub mod vehicle;
pub mod world;

/// Mathematical utilities and decisions.
pub mod math {
    pub use tread_base::math::*;
}

/// Data types for simulated time.
pub mod time {
    pub use tread_base::time::*;
}

/// Tools that we could imagine being in the Rust standard library, but aren't.
pub mod util {
    pub use tread_base::util::*;
}
