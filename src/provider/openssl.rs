// src/provider/openssl.rs

use std::time::Duration;

use crate::errors::Result;
use crate::exec::{CommandLine, Marker};
use crate::types::{Mode, Protocol};

use super::{CommandProvider, ProviderOptions, SERVER_READY_DELAY};

/// Translates options into `openssl s_client` / `openssl s_server` arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenSsl;

impl OpenSsl {
    fn common_flags(options: &ProviderOptions, args: &mut Vec<String>) {
        if let Some(cert) = &options.cert {
            args.extend(["-cert".to_string(), cert.clone()]);
        }
        if let Some(key) = &options.key {
            args.extend(["-key".to_string(), key.clone()]);
        }
        match options.protocol {
            Some(Protocol::Tls13) => args.push("-tls1_3".to_string()),
            Some(Protocol::Tls12) => args.push("-tls1_2".to_string()),
            None => {}
        }
        if let Some(cipher) = options.cipher {
            args.extend(["-ciphersuites".to_string(), cipher.iana_name().to_string()]);
        }
        if let Some(curve) = &options.curve {
            args.extend(["-curves".to_string(), curve.clone()]);
        }
        args.extend(options.extra_flags.iter().cloned());
    }
}

impl CommandProvider for OpenSsl {
    fn name(&self) -> &'static str {
        "openssl"
    }

    fn client_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        let mut args = vec![
            "openssl".to_string(),
            "s_client".to_string(),
            "-connect".to_string(),
            options.host_port(),
        ];
        Self::common_flags(options, &mut args);
        CommandLine::new(args)
    }

    fn server_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        let mut args = vec![
            "openssl".to_string(),
            "s_server".to_string(),
            "-accept".to_string(),
            options.host_port(),
        ];
        Self::common_flags(options, &mut args);
        CommandLine::new(args)
    }

    fn ready_to_send_marker(&self, mode: Mode) -> Option<Marker> {
        match mode {
            Mode::Client => Some(Marker::from("Verify return code")),
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
