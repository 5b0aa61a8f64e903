// src/ports.rs

//! TCP port allocation for provider pairs.
//!
//! Every scenario (or test) that needs a listening port takes the next one
//! from a shared [`PortAllocator`]. Ports are handed out in strictly
//! increasing order and never repeat, so concurrently running scenarios
//! cannot collide.

use std::ops::Range;
use std::sync::Mutex;

use crate::errors::{HarnessError, Result};

pub const DEFAULT_PORT_RANGE: Range<u16> = 8000..9000;

#[derive(Debug)]
pub struct PortAllocator {
    range: Range<u16>,
    next: Mutex<u16>,
}

impl PortAllocator {
    pub fn new(range: Range<u16>) -> Self {
        Self {
            next: Mutex::new(range.start),
            range,
        }
    }

    pub fn range(&self) -> &Range<u16> {
        &self.range
    }

    pub fn next_port(&self) -> Result<u16> {
        let mut next = self.next.lock().unwrap_or_else(|e| e.into_inner());
        if *next >= self.range.end {
            return Err(HarnessError::PortsExhausted {
                start: self.range.start,
                end: self.range.end,
            });
        }
        let port = *next;
        *next += 1;
        Ok(port)
    }
}

impl Default for PortAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_RANGE)
    }
}
