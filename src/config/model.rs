// src/config/model.rs

use std::collections::BTreeMap;
use std::ops::Range;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{Ciphersuite, Mode, Protocol};

/// Scenario file exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// timeout = "5s"
///
/// [process.server]
/// provider = "s2n"
/// mode = "server"
///
/// [process.client]
/// provider = "openssl"
/// mode = "client"
/// after = ["server"]
/// input = "hello"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RawScenarioFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All processes from `[process.<name>]`, keyed by name.
    #[serde(default)]
    pub process: BTreeMap<String, ProcessConfig>,
}

/// A validated scenario. Built through `TryFrom<RawScenarioFile>`.
#[derive(Debug, Clone)]
pub struct ScenarioFile {
    pub config: ConfigSection,
    pub process: BTreeMap<String, ProcessConfig>,
    launch_order: Vec<String>,
}

impl ScenarioFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        process: BTreeMap<String, ProcessConfig>,
        launch_order: Vec<String>,
    ) -> Self {
        Self {
            config,
            process,
            launch_order,
        }
    }

    /// Process names ordered so that every process comes after everything
    /// listed in its `after`.
    pub fn launch_order(&self) -> &[String] {
        &self.launch_order
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Host substituted for `{host}` and passed to providers.
    #[serde(default = "default_host")]
    pub host: String,

    /// Default per-process deadline.
    #[serde(default = "default_timeout", with = "duration_str")]
    pub timeout: Duration,

    #[serde(default = "default_port_range_start")]
    pub port_range_start: u16,

    /// Exclusive upper bound.
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_port_range_start() -> u16 {
    8000
}

fn default_port_range_end() -> u16 {
    9000
}

impl ConfigSection {
    pub fn port_range(&self) -> Range<u16> {
        self.port_range_start..self.port_range_end
    }
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout: default_timeout(),
            port_range_start: default_port_range_start(),
            port_range_end: default_port_range_end(),
        }
    }
}

/// `[process.<name>]` section.
///
/// A process is either a named provider (`provider` + `mode` and TLS
/// options) or a raw `cmd`. `{host}` and `{port}` in a raw `cmd` are
/// replaced with the scenario's host and port.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessConfig {
    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default)]
    pub cmd: Option<Vec<String>>,

    #[serde(default)]
    pub mode: Option<Mode>,

    #[serde(default)]
    pub cipher: Option<Ciphersuite>,

    #[serde(default)]
    pub curve: Option<String>,

    #[serde(default)]
    pub protocol: Option<Protocol>,

    #[serde(default)]
    pub key: Option<String>,

    #[serde(default)]
    pub cert: Option<String>,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default)]
    pub use_session_ticket: bool,

    #[serde(default)]
    pub extra_flags: Vec<String>,

    /// Payload written to the process's stdin.
    #[serde(default)]
    pub input: Option<String>,

    /// Binary payload as hex digits, e.g. `"16030100ff"`. Mutually
    /// exclusive with `input`.
    #[serde(default)]
    pub input_hex: Option<String>,

    /// Marker that must appear in the output before `input` is sent.
    /// Overrides the provider's own marker.
    #[serde(default)]
    pub ready_to_send: Option<String>,

    /// Overrides `[config].timeout`.
    #[serde(default, with = "duration_str::option")]
    pub timeout: Option<Duration>,

    /// Overrides the provider's grace period before readiness.
    #[serde(default, with = "duration_str::option")]
    pub ready_delay: Option<Duration>,

    /// Processes that must be ready before this one is launched.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub expect: ExpectConfig,
}

impl ProcessConfig {
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Bytes to write to stdin, from `input` or the decoded `input_hex`.
    pub fn payload(&self) -> Result<Option<Vec<u8>>, hex::FromHexError> {
        match (&self.input, &self.input_hex) {
            (Some(text), _) => Ok(Some(text.as_bytes().to_vec())),
            (None, Some(digits)) => hex::decode(digits.trim()).map(Some),
            (None, None) => Ok(None),
        }
    }
}

/// `[process.<name>.expect]` section: checks applied to the result record.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectConfig {
    #[serde(default)]
    pub exit_code: i32,

    /// When true, the process is expected to hit its deadline and
    /// `exit_code` is not checked.
    #[serde(default)]
    pub timed_out: bool,

    #[serde(default)]
    pub stdout_contains: Vec<String>,

    #[serde(default)]
    pub stderr_contains: Vec<String>,

    /// Byte regex that must match somewhere in stdout.
    #[serde(default)]
    pub stdout_matches: Option<String>,

    /// Exact number of occurrences of each key in stdout.
    #[serde(default)]
    pub stdout_count: BTreeMap<String, usize>,

    /// The process's own `input` must appear in its stdout (echo servers).
    #[serde(default)]
    pub stdout_contains_input: bool,
}

impl Default for ExpectConfig {
    fn default() -> Self {
        Self {
            exit_code: 0,
            timed_out: false,
            stdout_contains: Vec::new(),
            stderr_contains: Vec::new(),
            stdout_matches: None,
            stdout_count: BTreeMap::new(),
            stdout_contains_input: false,
        }
    }
}

/// Serde helpers for duration strings such as `"250ms"` or `"5s"`.
mod duration_str {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    use crate::types::parse_duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(de)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D: Deserializer<'de>>(
            de: D,
        ) -> Result<Option<Duration>, D::Error> {
            let s: Option<String> = Option::deserialize(de)?;
            s.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
