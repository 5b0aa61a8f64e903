// src/launcher.rs

//! Launch-and-track helper for provider processes.
//!
//! A [`Launcher`] starts each process, waits for it to report ready before
//! returning (so a client launched next never races a server that has not
//! spawned yet), and remembers every process so they can all be joined at
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::errors::Result;
use crate::exec::{ManagedProcess, ProcessSpec};
use crate::provider::{CommandProvider, ProviderOptions};

#[derive(Debug, Default)]
pub struct Launcher {
    processes: Vec<Arc<ManagedProcess>>,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the provider's command line and launch it with `timeout`.
    pub async fn launch(
        &mut self,
        provider: &dyn CommandProvider,
        options: &ProviderOptions,
        timeout: Duration,
    ) -> Result<Arc<ManagedProcess>> {
        let spec = provider.process_spec(options, timeout)?;
        info!(provider = provider.name(), mode = %options.mode, "launching provider");
        self.launch_spec(spec).await
    }

    /// Start a process from a pre-built spec and wait (up to its timeout)
    /// for it to become ready.
    ///
    /// A process that does not become ready is still returned; its result
    /// record tells the caller what happened.
    pub async fn launch_spec(&mut self, spec: ProcessSpec) -> Result<Arc<ManagedProcess>> {
        let bound = spec.timeout;
        let process = ManagedProcess::new(spec);
        self.processes.push(Arc::clone(&process));
        process.start()?;

        if !process.wait_ready(bound).await {
            warn!(cmd = %process.cmd_line(), ?bound, "process did not become ready");
        }
        Ok(process)
    }

    pub fn processes(&self) -> &[Arc<ManagedProcess>] {
        &self.processes
    }

    /// Join every launched process, logging abnormal terminations.
    ///
    /// Returns the first error seen, after all processes were joined.
    pub async fn join_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for process in self.processes.drain(..) {
            if let Err(e) = process.join().await {
                error!(cmd = %process.cmd_line(), error = %e, "managed process terminated abnormally");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
