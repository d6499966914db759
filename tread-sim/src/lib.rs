//! Headless runner for [`tread`] physics scenarios.
//!
//! This library half of the `tread-sim` package holds everything but command-line parsing,
//! so that it can be tested directly.

pub mod config_files;
pub mod logging;
pub mod scenario;
