// src/provider/boringssl.rs

use crate::errors::Result;
use crate::exec::CommandLine;
use crate::types::Ciphersuite;

use super::{CommandProvider, ProviderOptions, unsupported};

/// Translates options into `bssl s_client` arguments. Client only.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoringSsl;

impl CommandProvider for BoringSsl {
    fn name(&self) -> &'static str {
        "bssl"
    }

    fn client_cmd_line(&self, options: &ProviderOptions) -> Result<CommandLine> {
        let mut args = vec![
            "bssl".to_string(),
            "s_client".to_string(),
            "-connect".to_string(),
            options.host_port(),
        ];
        if let Some(cert) = &options.cert {
            args.extend(["-cert".to_string(), cert.clone()]);
        }
        if let Some(key) = &options.key {
            args.extend(["-key".to_string(), key.clone()]);
        }
        match options.cipher {
            Some(Ciphersuite::Chacha20Poly1305Sha256) => args.extend([
                "-cipher".to_string(),
                "TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256".to_string(),
            ]),
            Some(other) => return Err(unsupported(self.name(), format!("cipher {other}"))),
            None => {}
        }
        args.extend(options.extra_flags.iter().cloned());
        CommandLine::new(args)
    }

    fn server_cmd_line(&self, _options: &ProviderOptions) -> Result<CommandLine> {
        Err(unsupported(self.name(), "server mode"))
    }
}
