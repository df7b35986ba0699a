//! Operator-assisted detection of keyboard-like event devices.
//!
//! Event devices carry nothing the probe can trust about their type, so a candidate counts as
//! a keyboard if it has data to read right after the operator pressed a key. Data buffered
//! before the probe produces a false match.

use crate::keyboard::device::open_nonblocking;
use log::debug;
use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::Path;

/// The maximum number of bytes a probe reads from a candidate.
pub const PROBE_BUF_SIZE: usize = 128;

/// The outcome of probing one candidate device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The device had data to read.
    Match,
    /// The device opened but had nothing to read.
    NoResponse,
    /// The device could not be opened.
    Failed,
}

/// Opens candidate devices for probing.
pub trait DeviceSource {
    type Handle: Read;

    /// Open `path` read-only without blocking reads.
    fn open_nonblocking(&self, path: &Path) -> io::Result<Self::Handle>;
}

/// The event devices of the running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputDevices;

impl DeviceSource for InputDevices {
    type Handle = File;

    fn open_nonblocking(&self, path: &Path) -> io::Result<File> {
        open_nonblocking(path)
    }
}

/// The person at the keyboard, used to line up key presses with probe reads.
pub trait Operator {
    /// Show `message` to the operator.
    fn notify(&mut self, message: &str);

    /// Block until the operator has produced input.
    fn wait_for_key(&mut self) -> io::Result<()>;
}

impl<O: Operator + ?Sized> Operator for &mut O {
    fn notify(&mut self, message: &str) {
        (**self).notify(message)
    }

    fn wait_for_key(&mut self) -> io::Result<()> {
        (**self).wait_for_key()
    }
}

/// An [`Operator`] talking through a line-oriented terminal.
#[derive(Debug)]
pub struct TerminalOperator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalOperator<io::StdinLock<'static>, io::Stderr> {
    /// Prompts go to stderr so stdout carries only decoded keys.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Operator for TerminalOperator<R, W> {
    fn notify(&mut self, message: &str) {
        // Prompts are best effort
        let _ = writeln!(self.output, "{message}");
        let _ = self.output.flush();
    }

    fn wait_for_key(&mut self) -> io::Result<()> {
        // Only the arrival of a line matters, not its contents
        let mut line = Vec::new();

        if self.input.read_until(b'\n', &mut line)? == 0 {
            debug!("operator input is closed, probing without synchronization");
        }

        Ok(())
    }
}

/// Decides whether a candidate device behaves like a keyboard.
#[derive(Debug)]
pub struct DeviceProbe<S, O> {
    source: S,
    operator: O,
}

impl<S: DeviceSource, O: Operator> DeviceProbe<S, O> {
    pub fn new(source: S, operator: O) -> Self {
        Self { source, operator }
    }

    pub(crate) fn operator(&mut self) -> &mut O {
        &mut self.operator
    }

    /// Probe the device at `path`.
    ///
    /// The candidate is opened, the operator is asked for a key press, and a single read is
    /// attempted. The handle is closed before returning, whatever the outcome.
    pub fn probe(&mut self, path: &Path) -> ProbeResult {
        let mut handle = match self.source.open_nonblocking(path) {
            Ok(handle) => handle,
            Err(e) => {
                debug!("cannot open {}: {e}", path.display());
                return ProbeResult::Failed;
            }
        };

        if let Err(e) = self.operator.wait_for_key() {
            debug!("no operator input while probing {}: {e}", path.display());
            return ProbeResult::Failed;
        }

        let mut buf = [0u8; PROBE_BUF_SIZE];
        let read = handle.read(&mut buf);
        drop(handle);

        match read {
            Ok(n) if n > 0 => ProbeResult::Match,
            Ok(_) => ProbeResult::NoResponse,
            Err(e) => {
                debug!("{} did not respond: {e}", path.display());
                ProbeResult::NoResponse
            }
        }
    }
}
