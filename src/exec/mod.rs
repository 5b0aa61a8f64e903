// src/exec/mod.rs

//! Process execution core.
//!
//! - [`result`] holds the [`ResultRecord`] published once per process.
//! - [`gate`] provides the write-once ready/result gates.
//! - [`marker`] implements ready-to-send marker matching over raw bytes.
//! - [`pump`] is the conditional I/O pump that talks to a child's pipes.
//! - [`supervisor`] owns a child for its whole life and ties the above
//!   together in [`ManagedProcess`].

pub mod gate;
pub mod marker;
pub mod pump;
pub mod result;
pub mod supervisor;

pub use gate::{Gate, ReadyGate};
pub use marker::{Marker, MarkerScanner};
pub use pump::{Exchange, Input, PIPE_BUF, Pump, PumpError};
pub use result::{Failure, ResultRecord};
pub use supervisor::{CommandLine, ManagedProcess, ProcessSpec, ProcessState};
