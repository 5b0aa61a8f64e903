// src/provider/s2n.rs

use std::time::Duration;

use crate::errors::Result;
use crate::exec::{CommandLine, Marker};
use crate::types::{Mode, Protocol};

use super::{CommandProvider, ProviderOptions, SERVER_READY_DELAY};

/// Translates options into `s2nc` / `s2nd` arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct S2n;

impl S2n {
    /// Every TLS 1.3 suite we test is in the `default_tls13` preference
    /// list, so any requested cipher selects it.
    fn cipher_prefs(options: &ProviderOptions, args: &mut Vec<String>) {
        if options.cipher.is_some() {
            args.extend(["-c".to_string(), "default_tls13".to_string()]);
        }
    }

    fn common_flags(options: &ProviderOptions, args: &mut Vec<String>) {
        if options.insecure {
            args.push("--insecure".to_string());
        }
        if options.protocol == Some(Protocol::Tls13) {
            args.push("--tls13".to_string());
        }
        args.extend(options.extra_flags.iter().cloned());
        args.push(options.host.clone());
        args.push(options.port.to_string());
    }
}

impl CommandProvider for S2n {
    fn name(&self) -> &'static str {
        "s2n"
    }

    fn client_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        let mut args = vec!["s2nc".to_string()];
        Self::cipher_prefs(options, &mut args);
        if let Some(curve) = &options.curve {
            args.extend(["-k".to_string(), curve.clone()]);
        }
        if !options.use_session_ticket {
            args.push("-T".to_string());
        }
        Self::common_flags(options, &mut args);
        CommandLine::new(args)
    }

    fn server_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        let mut args = vec!["s2nd".to_string(), "-n".to_string()];
        Self::cipher_prefs(options, &mut args);
        if let Some(key) = &options.key {
            args.extend(["--key".to_string(), key.clone()]);
        }
        if let Some(cert) = &options.cert {
            args.extend(["--cert".to_string(), cert.clone()]);
        }
        Self::common_flags(options, &mut args);
        CommandLine::new(args)
    }

    fn ready_to_send_marker(&self, mode: Mode) -> Option<Marker> {
        match mode {
            Mode::Client => Some(Marker::from("Cipher negotiated")),
            Mode::Server => None,
        }
    }

    fn ready_delay(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Client => Duration::ZERO,
            Mode::Server => SERVER_READY_DELAY,
        }
    }
}
