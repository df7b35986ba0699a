//! Terminal echo control.

use crate::error::KeyprobeError;
use crate::KeyprobeResult;
use log::{debug, warn};
use nix::sys::termios::{self, LocalFlags, SetArg, Termios};
use std::os::fd::AsFd;

/// Turns off echo on a terminal and puts the saved settings back when dropped.
///
/// Newlines are still echoed (`ECHONL`), so the operator can see the probe prompts advance.
pub struct EchoGuard<F: AsFd> {
    fd: F,
    saved: Option<Termios>,
}

impl<F: AsFd> EchoGuard<F> {
    pub fn disable(fd: F) -> KeyprobeResult<Self> {
        let saved = termios::tcgetattr(fd.as_fd()).map_err(|source| KeyprobeError::Terminal {
            op: "tcgetattr()",
            source,
        })?;

        let mut quiet = saved.clone();
        quiet.local_flags.remove(LocalFlags::ECHO);
        quiet.local_flags.insert(LocalFlags::ECHONL);

        termios::tcsetattr(fd.as_fd(), SetArg::TCSAFLUSH, &quiet).map_err(|source| {
            KeyprobeError::Terminal {
                op: "tcsetattr()",
                source,
            }
        })?;

        debug!("terminal echo disabled");

        Ok(Self {
            fd,
            saved: Some(saved),
        })
    }

    /// The settings that will be restored.
    pub fn saved(&self) -> Option<&Termios> {
        self.saved.as_ref()
    }

    /// Put the saved settings back. Only the first call has an effect.
    pub fn restore(&mut self) -> KeyprobeResult<()> {
        let Some(saved) = self.saved.take() else {
            return Ok(());
        };

        termios::tcsetattr(self.fd.as_fd(), SetArg::TCSAFLUSH, &saved).map_err(|source| {
            KeyprobeError::Terminal {
                op: "tcsetattr()",
                source,
            }
        })?;

        debug!("terminal echo restored");

        Ok(())
    }
}

impl<F: AsFd> Drop for EchoGuard<F> {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("cannot restore terminal settings: {e}");
        }
    }
}
