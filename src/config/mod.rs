// src/config/mod.rs

//! Scenario files.
//!
//! - [`model`] is the TOML-backed data model.
//! - [`loader`] reads a scenario from disk.
//! - [`validate`] checks it and fixes the launch order.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigSection, ExpectConfig, ProcessConfig, RawScenarioFile, ScenarioFile};
pub use validate::{MAX_TIMEOUT, validate_scenario};
