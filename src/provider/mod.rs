// src/provider/mod.rs

//! Command providers.
//!
//! A provider turns [`ProviderOptions`] into the command line of one TLS
//! implementation's client or server tool. Providers never run anything;
//! they only describe what the supervisor should launch:
//!
//! - the command line for the requested [`Mode`],
//! - an optional ready-to-send marker for the payload,
//! - a grace period to wait after spawning before the process counts as
//!   ready (servers need a moment to bind their port).

use std::time::Duration;

use crate::errors::{HarnessError, Result};
use crate::exec::{CommandLine, Marker, ProcessSpec};
use crate::types::{Ciphersuite, Mode, Protocol};

pub mod boringssl;
pub mod openssl;
pub mod s2n;

pub use boringssl::BoringSsl;
pub use openssl::OpenSsl;
pub use s2n::S2n;

/// Grace period used by providers whose server needs to bind a port.
pub const SERVER_READY_DELAY: Duration = Duration::from_millis(100);

/// Options shared by all providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOptions {
    pub mode: Mode,
    pub host: String,
    pub port: u16,
    pub cipher: Option<Ciphersuite>,
    pub curve: Option<String>,
    pub key: Option<String>,
    pub cert: Option<String>,
    pub use_session_ticket: bool,
    pub insecure: bool,
    pub protocol: Option<Protocol>,
    pub data_to_send: Option<Vec<u8>>,
    pub extra_flags: Vec<String>,
}

impl ProviderOptions {
    pub fn new(mode: Mode, host: impl Into<String>, port: u16) -> Self {
        Self {
            mode,
            host: host.into(),
            port,
            cipher: None,
            curve: None,
            key: None,
            cert: None,
            use_session_ticket: false,
            insecure: false,
            protocol: None,
            data_to_send: None,
            extra_flags: Vec::new(),
        }
    }

    /// Same options for the opposite side of the connection, without a
    /// payload or extra flags.
    pub fn peer(&self) -> Self {
        Self {
            mode: match self.mode {
                Mode::Client => Mode::Server,
                Mode::Server => Mode::Client,
            },
            data_to_send: None,
            extra_flags: Vec::new(),
            ..self.clone()
        }
    }

    pub(crate) fn host_port(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Builds command lines for one TLS implementation.
pub trait CommandProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn client_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine>;

    fn server_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine>;

    fn cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        match options.mode {
            Mode::Client => self.client_cmd_line(options),
            Mode::Server => self.server_cmd_line(options),
        }
    }

    /// Output that shows the provider is ready to accept stdin data.
    fn ready_to_send_marker(&self, _mode: Mode) -> Option<Marker> {
        None
    }

    fn ready_delay(&self, _mode: Mode) -> Duration {
        Duration::ZERO
    }

    /// Everything the supervisor needs to launch this provider.
    ///
    /// The marker is only attached when there is a payload to gate.
    fn process_spec(&self, options: &ProviderOptions, timeout: Duration) -> Result<ProcessSpec> {
        let mut spec = ProcessSpec::new(self.cmd_line(options)?, timeout)
            .with_ready_delay(self.ready_delay(options.mode));
        if let Some(data) = &options.data_to_send {
            spec = spec.with_payload(data.clone());
            if let Some(marker) = self.ready_to_send_marker(options.mode) {
                spec = spec.with_marker(marker);
            }
        }
        Ok(spec)
    }
}

/// Look a provider up by the name used in scenario files.
pub fn provider_by_name(name: &str) -> Option<Box<dyn CommandProvider>> {
    match name.trim().to_lowercase().as_str() {
        "s2n" => Some(Box::new(S2n)),
        "openssl" => Some(Box::new(OpenSsl)),
        "bssl" | "boringssl" => Some(Box::new(BoringSsl)),
        _ => None,
    }
}

pub(crate) fn unsupported(provider: &str, what: impl std::fmt::Display) -> HarnessError {
    HarnessError::Unsupported(format!("{provider} does not support {what}"))
}
