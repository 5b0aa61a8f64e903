// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawScenarioFile, ScenarioFile};
use crate::errors::Result;

/// Load a scenario file and return the raw, unvalidated model.
///
/// Duration strings are parsed here; everything else is checked by
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawScenarioFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let scenario: RawScenarioFile = toml::from_str(&contents)?;
    Ok(scenario)
}

/// Load a scenario file and validate it:
///
/// - every process names exactly one of `provider` / `cmd`,
/// - providers are known and have a `mode`,
/// - expectation regexes compile,
/// - `after` references exist and form no cycle.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ScenarioFile> {
    let raw = load_from_path(&path)?;
    ScenarioFile::try_from(raw)
}
