//! Synchronizing simulated objects between a server and its clients.
//!
//! The server simulates every object ([`ReconcileMode::Authoritative`]) and, on the cadence
//! chosen by an [`UpdateSchedule`], sends each object's [`AuthoritativeState`] as a
//! [`StatePacket`]. Clients send an [`InputPacket`] every tick.
//!
//! A client simulates objects ahead of the last state it received, and when a new state
//! arrives its [`MovementDelta`] decides how to converge on it:
//!
//! * if the object is nearly still, the state is applied directly;
//! * if the correction is small compared to how far the object moves in a tick, it is
//!   applied within the current tick, and render interpolation hides the jump;
//! * otherwise the object is warped to an extrapolated target over a small number of ticks
//!   without being simulated.
//!
//! If no state arrives for [`NetConfig::max_prediction_ticks`] ticks, the client stops
//! moving the object until one does.
//!
//! Only the record formats are defined here; transporting them is up to the caller.
//!
//! [`NetConfig::max_prediction_ticks`]: crate::config::NetConfig::max_prediction_ticks

mod record;
pub use record::*;
mod reconcile;
pub use reconcile::*;
mod state;
pub(crate) use state::blend_rotation;
pub use state::{AuthoritativeState, Networked, Pose, UpdateSchedule};
