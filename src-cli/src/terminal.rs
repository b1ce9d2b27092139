//! Terminal mode snapshot.
//!
//! `rpassword` turns echo off while it reads and restores it from the
//! reading thread. A signal that ends the process mid-prompt never reaches
//! that restore, so the supervisor captures the mode up front and puts it
//! back itself before exiting.

/// Saved mode of the controlling terminal, if there is one.
pub struct TerminalMode {
    #[cfg(unix)]
    saved: Option<(std::fs::File, libc::termios)>,
}

impl TerminalMode {
    /// Record the current mode of `/dev/tty`. Without a controlling
    /// terminal nothing is recorded.
    #[must_use]
    pub fn capture() -> Self {
        #[cfg(unix)]
        {
            Self {
                saved: unix::capture(),
            }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }

    /// Whether a mode was recorded.
    #[must_use]
    pub const fn is_captured(&self) -> bool {
        #[cfg(unix)]
        {
            self.saved.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Put the recorded mode back. Returns `false` if nothing was recorded
    /// or the terminal refused.
    pub fn restore(&self) -> bool {
        #[cfg(unix)]
        {
            self.saved
                .as_ref()
                .is_some_and(|(tty, mode)| unix::restore(tty, mode))
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[cfg(unix)]
mod unix {
    use std::fs::{File, OpenOptions};
    use std::os::unix::io::AsRawFd;

    pub(super) fn capture() -> Option<(File, libc::termios)> {
        let tty = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/tty")
            .ok()?;
        // SAFETY: termios is plain old data; tcgetattr fully initializes it
        // on success and we discard it on failure.
        let mut mode: libc::termios = unsafe { std::mem::zeroed() };
        // SAFETY: the descriptor is open for the lifetime of `tty`.
        if unsafe { libc::tcgetattr(tty.as_raw_fd(), &raw mut mode) } != 0 {
            return None;
        }
        Some((tty, mode))
    }

    pub(super) fn restore(tty: &File, mode: &libc::termios) -> bool {
        // SAFETY: the descriptor is open and `mode` came from tcgetattr.
        unsafe { libc::tcsetattr(tty.as_raw_fd(), libc::TCSANOW, mode) == 0 }
    }
}
