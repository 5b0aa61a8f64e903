// src/exec/marker.rs

//! Ready-to-send markers.
//!
//! A marker is a raw byte pattern. Output is never decoded before the
//! search, so invalid or partial UTF-8 in a provider's output cannot make
//! matching fail.

use std::fmt;

/// Byte pattern that gates when stdin transmission may begin.
#[derive(Clone, PartialEq, Eq)]
pub struct Marker(Vec<u8>);

impl Marker {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        Self(pattern.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn scanner(&self) -> MarkerScanner {
        MarkerScanner::new(self.clone())
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Marker({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<&str> for Marker {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<&[u8]> for Marker {
    fn from(b: &[u8]) -> Self {
        Self::new(b)
    }
}

/// Streaming search for a [`Marker`] over successive chunks of one stream.
///
/// Keeps the last `marker.len() - 1` bytes of the stream so that a marker
/// split across two reads is still found.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    marker: Marker,
    tail: Vec<u8>,
    matched: bool,
}

impl MarkerScanner {
    pub fn new(marker: Marker) -> Self {
        Self {
            matched: marker.is_empty(),
            marker,
            tail: Vec::new(),
        }
    }

    pub fn matched(&self) -> bool {
        self.matched
    }

    /// Feed the next chunk. Returns `true` only on the call that first
    /// completes a match.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        if self.matched {
            return false;
        }

        let needle = self.marker.as_bytes();
        self.tail.extend_from_slice(chunk);
        if self.tail.windows(needle.len()).any(|w| w == needle) {
            self.matched = true;
            self.tail = Vec::new();
            return true;
        }

        let keep = needle.len() - 1;
        if self.tail.len() > keep {
            self.tail.drain(..self.tail.len() - keep);
        }
        false
    }
}
