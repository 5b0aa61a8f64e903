// src/exec/supervisor.rs

//! Managed process supervisor.
//!
//! A [`ManagedProcess`] owns one child from spawn to result delivery. It
//! runs as its own Tokio task so the launcher can carry on (typically to
//! start the peer process) while the exchange is in flight. The launcher
//! and the supervisor only share the two gates:
//!
//! - the ready gate, opened once the child exists and its grace period has
//!   elapsed, strictly before the pump starts;
//! - the result gate, filled exactly once with the [`ResultRecord`].

use std::fmt;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, info, warn};

use crate::errors::{HarnessError, Result};

use super::gate::{Gate, ReadyGate};
use super::marker::Marker;
use super::pump::{Exchange, Pump, PumpError};
use super::result::{Failure, ResultRecord, exit_code_of};

/// How long to keep collecting buffered output after a timeout kill.
pub const DRAIN_BOUND: Duration = Duration::from_millis(500);

/// Extra time `get_results` allows beyond the process timeout, covering the
/// kill and drain that follow a timeout.
pub const RESULT_ALLOWANCE: Duration = Duration::from_secs(1);

/// Stand-in deadline for timeouts too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Immutable, validated command line: program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(Vec<String>);

impl CommandLine {
    pub fn new<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() || args[0].is_empty() {
            return Err(HarnessError::ConfigError(
                "command line must name a program".to_string(),
            ));
        }
        Ok(Self(args))
    }

    pub fn program(&self) -> &str {
        &self.0[0]
    }

    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Everything needed to launch and supervise one process.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub cmd_line: CommandLine,
    pub timeout: Duration,
    pub exchange: Exchange,
    /// Grace period between spawn and signalling readiness, for servers
    /// that need time to bind their listening port.
    pub ready_delay: Duration,
}

impl ProcessSpec {
    pub fn new(cmd_line: CommandLine, timeout: Duration) -> Self {
        Self {
            cmd_line,
            timeout,
            exchange: Exchange::default(),
            ready_delay: Duration::ZERO,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.exchange = Exchange::new(Some(payload.into()), self.exchange.marker);
        self
    }

    pub fn with_marker(mut self, marker: impl Into<Marker>) -> Self {
        self.exchange = Exchange::new(self.exchange.payload, Some(marker.into()));
        self
    }

    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }
}

/// Lifecycle position of a [`ManagedProcess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Created,
    Running,
    Ready,
    Completed,
}

/// Supervises a single subprocess. See the module docs.
#[derive(Debug)]
pub struct ManagedProcess {
    spec: ProcessSpec,
    started: AtomicBool,
    ready: ReadyGate,
    result: Gate<Arc<ResultRecord>>,
    handle: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl ManagedProcess {
    pub fn new(spec: ProcessSpec) -> Arc<Self> {
        Arc::new(Self {
            spec,
            started: AtomicBool::new(false),
            ready: ReadyGate::new(),
            result: Gate::new(),
            handle: Mutex::new(None),
        })
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    pub fn cmd_line(&self) -> &CommandLine {
        &self.spec.cmd_line
    }

    pub fn state(&self) -> ProcessState {
        if self.result.is_open() {
            ProcessState::Completed
        } else if self.ready.is_open() {
            ProcessState::Ready
        } else if self.started.load(Ordering::Acquire) {
            ProcessState::Running
        } else {
            ProcessState::Created
        }
    }

    /// Spawn the supervising task. Must be called from within a Tokio
    /// runtime.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(HarnessError::AlreadyStarted);
        }

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.supervise().await });
        *self.handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    /// Wait up to `bound` for the child to be spawned and warmed up.
    ///
    /// Returns `false` early if a result is published without the process
    /// ever becoming ready (it could not be spawned).
    pub async fn wait_ready(&self, bound: Duration) -> bool {
        tokio::select! {
            ready = self.ready.wait(bound) => ready.is_some(),
            _ = self.result.wait(bound) => self.ready.is_open(),
        }
    }

    /// Block until the result record exists, allowing the process timeout
    /// plus [`RESULT_ALLOWANCE`].
    pub async fn get_results(&self) -> Result<Arc<ResultRecord>> {
        self.get_results_within(self.spec.timeout.saturating_add(RESULT_ALLOWANCE))
            .await
    }

    /// Block up to `bound` for the result record. Every successful call
    /// returns the same record.
    pub async fn get_results_within(&self, bound: Duration) -> Result<Arc<ResultRecord>> {
        self.result
            .wait(bound)
            .await
            .ok_or(HarnessError::ResultTimeout(bound))
    }

    /// Wait for the supervising task to finish.
    ///
    /// Returns the spawn failure if the process could not be started. A
    /// second call (or a call before `start`) returns `Ok(())`.
    pub async fn join(&self) -> Result<()> {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| HarnessError::Other(anyhow::anyhow!("supervisor task failed: {e}")))?,
            None => Ok(()),
        }
    }

    async fn supervise(&self) -> Result<()> {
        let cmd_line = &self.spec.cmd_line;
        info!(cmd = %cmd_line, timeout = ?self.spec.timeout, "starting provider process");

        let mut child = match spawn_child(cmd_line) {
            Ok(child) => child,
            Err(source) => {
                let failure = Failure::Spawn {
                    kind: source.kind(),
                    message: source.to_string(),
                };
                let record = ResultRecord::never_started(failure);
                report(cmd_line, &record);
                self.publish(record);
                return Err(HarnessError::Spawn {
                    program: cmd_line.program().to_string(),
                    source,
                });
            }
        };

        // The deadline covers the grace period too.
        let deadline = deadline_after(self.spec.timeout);

        if !self.spec.ready_delay.is_zero() {
            sleep(self.spec.ready_delay).await;
        }
        self.ready.open(());
        debug!(pid = ?child.id(), "process ready");

        let mut pump = Pump::new(&mut child, self.spec.exchange.clone());
        let record = match pump.run(&mut child, deadline).await {
            Ok(status) => {
                let (stdout, stderr) = pump.into_output();
                ResultRecord {
                    stdout,
                    stderr,
                    exit_code: exit_code_of(status),
                    failure: None,
                }
            }
            Err(PumpError::DeadlineExceeded) => {
                self.kill_and_drain(&mut child, pump, Failure::Timeout {
                    after: self.spec.timeout,
                })
                .await
            }
            Err(PumpError::Wait(e)) => {
                self.kill_and_drain(&mut child, pump, Failure::Io {
                    message: e.to_string(),
                })
                .await
            }
        };

        report(cmd_line, &record);
        self.publish(record);
        Ok(())
    }

    async fn kill_and_drain(&self, child: &mut Child, mut pump: Pump, failure: Failure) -> ResultRecord {
        if let Err(e) = child.start_kill() {
            warn!(cmd = %self.spec.cmd_line, error = %e, "failed to kill process");
        }

        pump.drain(DRAIN_BOUND).await;

        let exit_code = match timeout(DRAIN_BOUND, child.wait()).await {
            Ok(Ok(status)) => exit_code_of(status),
            Ok(Err(e)) => {
                debug!(error = %e, "could not reap killed process");
                None
            }
            Err(_) => None,
        };

        let (stdout, stderr) = pump.into_output();
        ResultRecord {
            stdout,
            stderr,
            exit_code,
            failure: Some(failure),
        }
    }

    fn publish(&self, record: ResultRecord) {
        if !self.result.open(Arc::new(record)) {
            warn!(cmd = %self.spec.cmd_line, "result already published; ignoring second result");
        }
    }
}

fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout).unwrap_or(now + FAR_FUTURE)
}

fn spawn_child(cmd_line: &CommandLine) -> std::io::Result<Child> {
    // Descriptors opened by std are close-on-exec, so only the three pipes
    // below reach the child.
    Command::new(cmd_line.program())
        .args(cmd_line.args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
}

/// Diagnostics emitted for every outcome, so a failing test always has the
/// full picture in its log.
fn report(cmd_line: &CommandLine, record: &ResultRecord) {
    info!(
        cmd = %cmd_line,
        exit_code = ?record.exit_code,
        failure = ?record.failure,
        stdout = %String::from_utf8_lossy(&record.stdout),
        stderr = %String::from_utf8_lossy(&record.stderr),
        "process finished"
    );
}
