//! `poll(2)` over the network descriptor and the interrupt wake pipe.
//!
//! Both slots are always passed to the kernel; an empty slot carries fd -1,
//! which `poll` skips, so a wait with nothing attached is a plain sleep.

use libc::{POLLERR, POLLHUP, POLLIN, nfds_t, poll, pollfd};
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;

/// Outcome of one wait on the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Readiness {
    /// The network descriptor has data (or an error to report).
    Readable,
    /// Only the wake descriptor fired.
    Woken,
    TimedOut,
    /// A signal cut the wait short.
    Interrupted,
}

/// Waits for the network descriptor or the wake descriptor to become readable.
pub(crate) struct Poller {
    fd: Option<RawFd>,
    wake: Option<RawFd>,
}

impl Poller {
    pub(crate) fn new() -> Self {
        Self {
            fd: None,
            wake: None,
        }
    }

    pub(crate) fn attach(&mut self, fd: RawFd) {
        self.fd = Some(fd);
    }

    pub(crate) fn detach(&mut self) {
        self.fd = None;
    }

    /// Also watches `wake`, typically the read end of a self-pipe. `None`
    /// stops watching it.
    pub(crate) fn set_wake(&mut self, wake: Option<RawFd>) {
        self.wake = wake;
    }

    /// Blocks for at most `timeout`, forever when `None`.
    ///
    /// Network readiness wins over the wake descriptor when both fire.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> io::Result<Readiness> {
        let timeout_ms = timeout.map_or(-1, timeout_to_ms);

        let mut entries = [self.fd, self.wake].map(|fd| pollfd {
            fd: fd.unwrap_or(-1),
            events: POLLIN,
            revents: 0,
        });

        let res = unsafe { poll(entries.as_mut_ptr(), entries.len() as nfds_t, timeout_ms) };

        if res < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::Interrupted);
            }

            return Err(err);
        }

        // Errors and hangups count as readable so the receive call reports them.
        let fired = |entry: &pollfd| entry.revents & (POLLIN | POLLERR | POLLHUP) != 0;

        if res > 0 && fired(&entries[0]) {
            Ok(Readiness::Readable)
        } else if res > 0 && fired(&entries[1]) {
            Ok(Readiness::Woken)
        } else {
            Ok(Readiness::TimedOut)
        }
    }

    /// Non-blocking readiness check.
    pub(crate) fn try_wait(&self) -> io::Result<Readiness> {
        if self.fd.is_none() && self.wake.is_none() {
            return Ok(Readiness::TimedOut);
        }

        self.wait(Some(Duration::ZERO))
    }
}

// Rounds up so a sub-millisecond deadline does not turn into a busy loop.
fn timeout_to_ms(timeout: Duration) -> i32 {
    let ms = timeout.as_nanos().div_ceil(1_000_000);

    ms.min(i32::MAX as u128) as i32
}
