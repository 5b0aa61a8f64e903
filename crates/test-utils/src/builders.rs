#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::Duration;

use tlsharness::config::{
    ConfigSection, ExpectConfig, ProcessConfig, RawScenarioFile, ScenarioFile,
};
use tlsharness::types::Mode;

/// Builder for `ScenarioFile` to simplify test setup.
pub struct ScenarioBuilder {
    scenario: RawScenarioFile,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        Self {
            scenario: RawScenarioFile {
                config: ConfigSection::default(),
                process: BTreeMap::new(),
            },
        }
    }

    pub fn with_process(mut self, name: &str, process: ProcessConfig) -> Self {
        self.scenario.process.insert(name.to_string(), process);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.scenario.config.timeout = timeout;
        self
    }

    pub fn with_port_range(mut self, start: u16, end: u16) -> Self {
        self.scenario.config.port_range_start = start;
        self.scenario.config.port_range_end = end;
        self
    }

    pub fn raw(self) -> RawScenarioFile {
        self.scenario
    }

    pub fn build(self) -> ScenarioFile {
        ScenarioFile::try_from(self.scenario).expect("Failed to build valid scenario from builder")
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProcessConfig`.
pub struct ProcessConfigBuilder {
    process: ProcessConfig,
}

impl ProcessConfigBuilder {
    /// A raw `cmd` process running `script` under `sh -c`.
    pub fn script(script: &str) -> Self {
        Self {
            process: ProcessConfig {
                cmd: Some(vec!["sh".to_string(), "-c".to_string(), script.to_string()]),
                ..ProcessConfig::default()
            },
        }
    }

    pub fn provider(name: &str, mode: Mode) -> Self {
        Self {
            process: ProcessConfig {
                provider: Some(name.to_string()),
                mode: Some(mode),
                ..ProcessConfig::default()
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.process.after.push(dep.to_string());
        self
    }

    pub fn input(mut self, input: &str) -> Self {
        self.process.input = Some(input.to_string());
        self
    }

    pub fn input_hex(mut self, digits: &str) -> Self {
        self.process.input_hex = Some(digits.to_string());
        self
    }

    pub fn ready_to_send(mut self, marker: &str) -> Self {
        self.process.ready_to_send = Some(marker.to_string());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.process.timeout = Some(timeout);
        self
    }

    pub fn ready_delay(mut self, delay: Duration) -> Self {
        self.process.ready_delay = Some(delay);
        self
    }

    pub fn expect(mut self, expect: ExpectConfig) -> Self {
        self.process.expect = expect;
        self
    }

    pub fn expect_stdout(mut self, needle: &str) -> Self {
        self.process.expect.stdout_contains.push(needle.to_string());
        self
    }

    pub fn expect_exit_code(mut self, code: i32) -> Self {
        self.process.expect.exit_code = code;
        self
    }

    pub fn expect_timeout(mut self) -> Self {
        self.process.expect.timed_out = true;
        self
    }

    pub fn build(self) -> ProcessConfig {
        self.process
    }
}
