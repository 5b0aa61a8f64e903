//! A fake command provider backed by `sh -c` scripts.

use std::time::Duration;

use tlsharness::errors::Result;
use tlsharness::exec::{CommandLine, Marker};
use tlsharness::provider::{CommandProvider, ProviderOptions};
use tlsharness::types::Mode;

/// Runs a shell script per mode instead of a real TLS tool.
///
/// `{host}` and `{port}` in the scripts are replaced from the options,
/// so tests can check that options flow through.
#[derive(Debug, Clone)]
pub struct ScriptProvider {
    pub client_script: String,
    pub server_script: String,
    pub client_marker: Option<String>,
    pub server_ready_delay: Duration,
}

impl ScriptProvider {
    pub fn new(client_script: &str, server_script: &str) -> Self {
        Self {
            client_script: client_script.to_string(),
            server_script: server_script.to_string(),
            client_marker: None,
            server_ready_delay: Duration::ZERO,
        }
    }

    pub fn with_client_marker(mut self, marker: &str) -> Self {
        self.client_marker = Some(marker.to_string());
        self
    }

    pub fn with_server_ready_delay(mut self, delay: Duration) -> Self {
        self.server_ready_delay = delay;
        self
    }

    fn script(script: &str, options: &ProviderOptions) -> Result<CommandLine> {
        let script = script
            .replace("{host}", &options.host)
            .replace("{port}", &options.port.to_string());
        CommandLine::new(["sh".to_string(), "-c".to_string(), script])
    }
}

impl CommandProvider for ScriptProvider {
    fn name(&self) -> &'static str {
        "script"
    }

    fn client_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        Self::script(&self.client_script, options)
    }

    fn server_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        Self::script(&self.server_script, options)
    }

    fn ready_to_send_marker(&self, mode: Mode) -> Option<Marker> {
        match mode {
            Mode::Client => self.client_marker.as_deref().map(Marker::from),
            Mode::Server => None,
        }
    }

    fn ready_delay(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Client => Duration::ZERO,
            Mode::Server => self.server_ready_delay,
        }
    }
}
