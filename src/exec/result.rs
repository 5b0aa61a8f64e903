// src/exec/result.rs

//! The terminal record produced once per supervised process.

use std::fmt;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

/// Why a supervised process did not complete normally.
///
/// This is kept separate from [`crate::errors::HarnessError`] so that a
/// [`ResultRecord`] can be cloned, shared between waiters and compared.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The process never ran (missing executable, permission denied, ...).
    #[error("could not start process: {message}")]
    Spawn { kind: io::ErrorKind, message: String },

    /// The deadline elapsed and the process was killed.
    #[error("process timed out after {after:?}")]
    Timeout { after: Duration },

    /// Any other I/O problem while supervising a running process.
    #[error("process I/O error: {message}")]
    Io { message: String },
}

/// Exit code as reported for a finished child: the status code, or the
/// negated signal number when it was terminated by a signal.
pub fn exit_code_of(status: ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(-signal);
        }
    }
    status.code()
}

/// Captured output of one supervised process.
///
/// A record whose `failure` is [`Failure::Spawn`] has empty streams and no
/// exit code: the process never ran. A negative exit code is the negated
/// number of the signal that terminated the process. After a timeout the streams contain
/// whatever was captured up to (and briefly after) the kill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRecord {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<i32>,
    pub failure: Option<Failure>,
}

impl ResultRecord {
    pub fn never_started(failure: Failure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::default()
        }
    }

    /// Exited on its own with status 0.
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.exit_code == Some(0)
    }

    /// Signal that terminated the process, if any.
    pub fn signal(&self) -> Option<i32> {
        self.exit_code.filter(|code| *code < 0).map(|code| -code)
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.failure, Some(Failure::Timeout { .. }))
    }

    pub fn failed_to_start(&self) -> bool {
        matches!(self.failure, Some(Failure::Spawn { .. }))
    }

    pub fn stdout_contains(&self, needle: &[u8]) -> bool {
        contains(&self.stdout, needle)
    }

    pub fn stderr_contains(&self, needle: &[u8]) -> bool {
        contains(&self.stderr, needle)
    }

    /// Non-overlapping occurrences of `needle` in stdout.
    pub fn stdout_count(&self, needle: &[u8]) -> usize {
        count(&self.stdout, needle)
    }
}

impl fmt::Display for ResultRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stdout: {}", String::from_utf8_lossy(&self.stdout))?;
        writeln!(f, "Stderr: {}", String::from_utf8_lossy(&self.stderr))?;
        match self.exit_code {
            Some(code) if code < 0 => writeln!(f, "Exit code: {code} (killed by signal {})", -code)?,
            Some(code) => writeln!(f, "Exit code: {code}")?,
            None => writeln!(f, "Exit code: none")?,
        }
        match &self.failure {
            Some(failure) => write!(f, "Failure: {failure}"),
            None => write!(f, "Failure: none"),
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn count(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() {
        return 0;
    }
    let mut n = 0;
    let mut rest = haystack;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        n += 1;
        rest = &rest[pos + needle.len()..];
    }
    n
}
