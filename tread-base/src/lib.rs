//! This library is an internal component of [`tread`],
//! which defines some core mathematical types and functions.
//! Do not depend on this library; use only [`tread`] instead.
//!
//! [`tread`]: ../tread/index.html

// Crate-specific lint settings. (General settings can be found in the workspace manifest.)
#![warn(clippy::missing_inline_in_public_items)]

/// Do not use this module directly; its contents are re-exported from `tread`.
pub mod math;

/// Do not use this module directly; its contents are re-exported from `tread`.
pub mod time;

/// Do not use this module directly; its contents are re-exported from `tread`.
pub mod util;
