// src/engine/expect.rs

//! Expectation checks applied to a finished process.

use regex::bytes::Regex;

use crate::config::ExpectConfig;
use crate::exec::ResultRecord;

/// Compare a result record against its `expect` block.
///
/// Returns one human-readable line per violated expectation; an empty
/// vector means the process passed.
pub fn check_expectations(
    expect: &ExpectConfig,
    input: Option<&[u8]>,
    record: &ResultRecord,
) -> Vec<String> {
    let mut violations = Vec::new();

    if let Some(failure) = &record.failure {
        if record.failed_to_start() {
            violations.push(format!("process never started: {failure}"));
            return violations;
        }
    }

    if expect.timed_out {
        if !record.timed_out() {
            violations.push(format!(
                "expected the process to time out, but it exited with {:?}",
                record.exit_code
            ));
        }
    } else {
        if let Some(failure) = &record.failure {
            violations.push(format!("unexpected failure: {failure}"));
        }
        if record.exit_code != Some(expect.exit_code) {
            violations.push(format!(
                "exit code {:?}, expected {}",
                record.exit_code, expect.exit_code
            ));
        }
    }

    for needle in expect.stdout_contains.iter() {
        if !record.stdout_contains(needle.as_bytes()) {
            violations.push(format!("stdout does not contain {needle:?}"));
        }
    }

    for needle in expect.stderr_contains.iter() {
        if !record.stderr_contains(needle.as_bytes()) {
            violations.push(format!("stderr does not contain {needle:?}"));
        }
    }

    if let Some(pattern) = &expect.stdout_matches {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(&record.stdout) => {}
            Ok(_) => violations.push(format!("stdout does not match /{pattern}/")),
            Err(e) => violations.push(format!("invalid stdout regex /{pattern}/: {e}")),
        }
    }

    for (needle, expected) in expect.stdout_count.iter() {
        let found = record.stdout_count(needle.as_bytes());
        if found != *expected {
            violations.push(format!(
                "stdout contains {needle:?} {found} time(s), expected {expected}"
            ));
        }
    }

    if expect.stdout_contains_input {
        match input {
            Some(input) if record.stdout_contains(input) => {}
            Some(_) => violations.push("stdout does not contain the input payload".to_string()),
            None => violations.push("no input payload to look for in stdout".to_string()),
        }
    }

    violations
}
