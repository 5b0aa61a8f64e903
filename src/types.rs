use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

/// Whether a provider is launched as the connecting or the accepting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Client,
    Server,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Client => f.write_str("client"),
            Mode::Server => f.write_str("server"),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "client" => Ok(Mode::Client),
            "server" => Ok(Mode::Server),
            other => Err(format!(
                "invalid mode: {other} (expected \"client\" or \"server\")"
            )),
        }
    }
}

/// Protocol version a provider should be pinned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tls12,
    Tls13,
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['.', '_'], "").as_str() {
            "tls12" => Ok(Protocol::Tls12),
            "tls13" => Ok(Protocol::Tls13),
            other => Err(format!(
                "invalid protocol: {other} (expected \"tls12\" or \"tls13\")"
            )),
        }
    }
}

/// TLS 1.3 ciphersuites the providers know how to request.
///
/// Serialized and displayed using the IANA names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Ciphersuite {
    #[serde(rename = "TLS_CHACHA20_POLY1305_SHA256")]
    Chacha20Poly1305Sha256,
    #[serde(rename = "TLS_AES_128_GCM_SHA256")]
    Aes128GcmSha256,
    #[serde(rename = "TLS_AES_256_GCM_SHA384")]
    Aes256GcmSha384,
}

impl Ciphersuite {
    pub const ALL: [Ciphersuite; 3] = [
        Ciphersuite::Chacha20Poly1305Sha256,
        Ciphersuite::Aes128GcmSha256,
        Ciphersuite::Aes256GcmSha384,
    ];

    pub fn iana_name(self) -> &'static str {
        match self {
            Ciphersuite::Chacha20Poly1305Sha256 => "TLS_CHACHA20_POLY1305_SHA256",
            Ciphersuite::Aes128GcmSha256 => "TLS_AES_128_GCM_SHA256",
            Ciphersuite::Aes256GcmSha384 => "TLS_AES_256_GCM_SHA384",
        }
    }
}

impl fmt::Display for Ciphersuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.iana_name())
    }
}

impl FromStr for Ciphersuite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        Ciphersuite::ALL
            .into_iter()
            .find(|c| c.iana_name() == wanted)
            .ok_or_else(|| format!("unknown ciphersuite: {}", s.trim()))
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
/// The number may have a fractional part (`"0.5s"`).
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between the number and suffix.
    let idx = s
        .chars()
        .position(|c| !(c.is_ascii_digit() || c == '.'))
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let unit = unit_part.trim().to_lowercase();
    let scale: u64 = match unit.as_str() {
        "ms" => 1,
        "s" => 1_000,
        "m" => 60 * 1_000,
        "h" => 60 * 60 * 1_000,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    // Whole numbers stay exact; fractions go through f64.
    if !num_part.contains('.') {
        let value: u64 = num_part
            .parse()
            .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
        return value
            .checked_mul(scale)
            .map(Duration::from_millis)
            .ok_or_else(|| format!("duration '{s}' out of range"));
    }

    let value: f64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    Duration::try_from_secs_f64(value * scale as f64 / 1_000.0)
        .map_err(|e| format!("duration '{s}' out of range: {e}"))
}
