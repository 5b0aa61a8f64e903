// src/exec/pump.rs

//! Conditional I/O pump.
//!
//! Exchanges bytes with a child over its three pipes under a single
//! deadline. Output from stdout and stderr is captured in full; the payload
//! is written to stdin either immediately or only once the configured
//! [`Marker`] shows up in the child's output, and stdin is closed once the
//! payload has been flushed.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout};
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, warn};

use super::marker::{Marker, MarkerScanner};

/// Largest single write to the child's stdin.
pub const PIPE_BUF: usize = 4096;

const READ_CHUNK: usize = 32 * 1024;

/// What to send to a child, and when.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    pub payload: Option<Vec<u8>>,
    pub marker: Option<Marker>,
}

impl Exchange {
    pub fn new(payload: Option<Vec<u8>>, marker: Option<Marker>) -> Self {
        Self {
            payload,
            marker: marker.filter(|m| !m.is_empty()),
        }
    }

    /// Stdin state a pump starts in for this exchange.
    pub fn initial_input(&self) -> Input {
        match (&self.payload, &self.marker) {
            (None, None) => Input::Held,
            (Some(p), _) if p.is_empty() => Input::Sent,
            (_, Some(_)) => Input::AwaitingMarker,
            (Some(_), None) => Input::Sending,
        }
    }
}

/// Progress of the stdin side of the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// Nothing to send and nothing to wait for; stdin stays open.
    Held,
    AwaitingMarker,
    Sending,
    /// Everything was written (or there was nothing to write); stdin is
    /// about to be closed.
    Sent,
    Closed,
}

#[derive(Debug, Error)]
pub enum PumpError {
    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("waiting for process exit: {0}")]
    Wait(#[source] io::Error),
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

enum Event {
    Wrote(io::Result<usize>),
    Read(Stream, io::Result<usize>),
}

/// Owns the child's pipes for the duration of one exchange.
#[derive(Debug)]
pub struct Pump {
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    payload: Vec<u8>,
    offset: usize,
    input: Input,
    stdout_scanner: Option<MarkerScanner>,
    stderr_scanner: Option<MarkerScanner>,
    captured_stdout: Vec<u8>,
    captured_stderr: Vec<u8>,
    out_buf: Vec<u8>,
    err_buf: Vec<u8>,
}

impl Pump {
    /// Take the piped stdio handles out of `child`.
    pub fn new(child: &mut Child, exchange: Exchange) -> Self {
        let input = exchange.initial_input();
        Self {
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            stdout_scanner: exchange.marker.as_ref().map(Marker::scanner),
            stderr_scanner: exchange.marker.as_ref().map(Marker::scanner),
            payload: exchange.payload.unwrap_or_default(),
            offset: 0,
            input,
            captured_stdout: Vec::new(),
            captured_stderr: Vec::new(),
            out_buf: vec![0; READ_CHUNK],
            err_buf: vec![0; READ_CHUNK],
        }
    }

    pub fn input(&self) -> Input {
        self.input
    }

    /// Payload bytes written so far.
    pub fn bytes_sent(&self) -> usize {
        self.offset
    }

    pub fn captured_stdout(&self) -> &[u8] {
        &self.captured_stdout
    }

    pub fn captured_stderr(&self) -> &[u8] {
        &self.captured_stderr
    }

    pub fn into_output(self) -> (Vec<u8>, Vec<u8>) {
        (self.captured_stdout, self.captured_stderr)
    }

    /// Run the exchange until both output streams close (and any pending
    /// input is flushed), then wait for the child to exit.
    ///
    /// On [`PumpError::DeadlineExceeded`] everything captured so far stays
    /// available through the accessors and [`Pump::drain`].
    pub async fn run(
        &mut self,
        child: &mut Child,
        deadline: Instant,
    ) -> Result<ExitStatus, PumpError> {
        if self.stdin.is_none() && self.input != Input::Held {
            self.input = Input::Closed;
        }
        self.close_stdin_if_sent();

        while self.stdout.is_some() || self.stderr.is_some() || self.input == Input::Sending {
            if Instant::now() >= deadline {
                return Err(PumpError::DeadlineExceeded);
            }

            let Some(event) = self.next_event(deadline, true).await else {
                return Err(PumpError::DeadlineExceeded);
            };
            self.handle(event);
            self.close_stdin_if_sent();
        }

        if self.stdin.take().is_some() {
            debug!(input = ?self.input, "output streams closed; closing stdin");
            self.input = Input::Closed;
        }

        match timeout_at(deadline, child.wait()).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(e)) => Err(PumpError::Wait(e)),
            Err(_) => Err(PumpError::DeadlineExceeded),
        }
    }

    /// Collect whatever output is still buffered in the pipes, giving up
    /// after `bound`. Used after the child has been killed.
    pub async fn drain(&mut self, bound: Duration) {
        self.stdin = None;
        self.input = Input::Closed;

        let deadline = Instant::now() + bound;
        while self.stdout.is_some() || self.stderr.is_some() {
            match self.next_event(deadline, false).await {
                Some(event) => self.handle(event),
                None => {
                    debug!("drain bound elapsed with output streams still open");
                    break;
                }
            }
        }
    }

    /// Wait for the next stream to become ready, or `None` at `deadline`.
    async fn next_event(&mut self, deadline: Instant, allow_write: bool) -> Option<Event> {
        let sending = allow_write && self.input == Input::Sending;
        let end = (self.offset + PIPE_BUF).min(self.payload.len());
        let chunk = &self.payload[self.offset..end];

        tokio::select! {
            res = write_some(&mut self.stdin, chunk), if sending => Some(Event::Wrote(res)),
            res = read_some(&mut self.stdout, &mut self.out_buf) => {
                Some(Event::Read(Stream::Stdout, res))
            }
            res = read_some(&mut self.stderr, &mut self.err_buf) => {
                Some(Event::Read(Stream::Stderr, res))
            }
            _ = sleep_until(deadline) => None,
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Wrote(Ok(n)) if n > 0 => {
                self.offset += n;
                if self.offset >= self.payload.len() {
                    debug!(bytes = self.offset, "payload fully written");
                    self.input = Input::Sent;
                }
            }
            Event::Wrote(Ok(_)) => {
                debug!(sent = self.offset, "stdin accepted no bytes; abandoning input");
                self.abandon_stdin();
            }
            Event::Wrote(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
                debug!(
                    sent = self.offset,
                    total = self.payload.len(),
                    "broken pipe writing stdin; abandoning input"
                );
                self.abandon_stdin();
            }
            Event::Wrote(Err(e)) => {
                warn!(error = %e, sent = self.offset, "error writing stdin; abandoning input");
                self.abandon_stdin();
            }
            Event::Read(stream, res) => self.on_read(stream, res),
        }
    }

    fn on_read(&mut self, stream: Stream, res: io::Result<usize>) {
        let n = match res {
            Ok(0) => {
                debug!(?stream, "stream closed by child");
                self.close_stream(stream);
                return;
            }
            Ok(n) => n,
            Err(e) => {
                debug!(?stream, error = %e, "read error; treating stream as closed");
                self.close_stream(stream);
                return;
            }
        };

        let (buf, captured, scanner) = match stream {
            Stream::Stdout => (
                &self.out_buf,
                &mut self.captured_stdout,
                &mut self.stdout_scanner,
            ),
            Stream::Stderr => (
                &self.err_buf,
                &mut self.captured_stderr,
                &mut self.stderr_scanner,
            ),
        };
        let chunk = &buf[..n];
        captured.extend_from_slice(chunk);
        let found = scanner.as_mut().is_some_and(|s| s.feed(chunk));

        if found && self.input == Input::AwaitingMarker {
            if self.payload.is_empty() {
                debug!(?stream, "ready-to-send marker seen; nothing to send");
                self.input = Input::Sent;
            } else {
                debug!(
                    ?stream,
                    bytes = self.payload.len(),
                    "ready-to-send marker seen; sending payload"
                );
                self.input = Input::Sending;
            }
        }
    }

    fn close_stream(&mut self, stream: Stream) {
        match stream {
            Stream::Stdout => self.stdout = None,
            Stream::Stderr => self.stderr = None,
        }
    }

    fn abandon_stdin(&mut self) {
        self.stdin = None;
        self.input = Input::Closed;
    }

    /// Close stdin once all input is flushed. Writes complete before
    /// `handle` runs, so this never interrupts a write.
    fn close_stdin_if_sent(&mut self) {
        if self.input == Input::Sent {
            if self.stdin.take().is_some() {
                debug!(bytes = self.offset, "closing stdin");
            }
            self.input = Input::Closed;
        }
    }
}

async fn write_some<W: AsyncWrite + Unpin>(stream: &mut Option<W>, chunk: &[u8]) -> io::Result<usize> {
    match stream {
        Some(w) => w.write(chunk).await,
        None => Err(io::ErrorKind::BrokenPipe.into()),
    }
}

/// Read from an open stream; never resolves for a closed one.
async fn read_some<R: AsyncRead + Unpin>(stream: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
    match stream {
        Some(r) => r.read(buf).await,
        None => std::future::pending().await,
    }
}
