//! Operator interrupts (SIGINT, SIGTSTP) turned into an end-of-run request.
//!
//! The signal handler raises a flag and writes one byte into a non-blocking
//! self-pipe. The read end of that pipe sits in the poller's descriptor set, so
//! a signal that lands after the flag was checked but before the loop blocks
//! still wakes the wait instead of being noticed only at the next datagram or
//! timer. The handler state is process-wide; keep one guard alive at a time.

use crate::reactor::socket::set_nonblocking;

use libc::{
    F_SETFD, FD_CLOEXEC, SIGINT, SIGTSTP, c_int, c_void, sigaction, sigemptyset, sighandler_t,
};
use std::io;
use std::mem;
use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

/// Signals treated as an operator request to stop.
const INTERRUPT_SIGNALS: [c_int; 2] = [SIGINT, SIGTSTP];

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Write end of the live guard's self-pipe, or -1.
static WAKE_FD: AtomicI32 = AtomicI32::new(-1);

extern "C" fn on_interrupt(_signal: c_int) {
    // Only the false-to-true edge writes, so the pipe never fills and write(2)
    // cannot clobber errno with EAGAIN.
    if INTERRUPTED.swap(true, Ordering::SeqCst) {
        return;
    }

    let fd = WAKE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        let byte = 1u8;
        unsafe {
            libc::write(fd, &byte as *const u8 as *const c_void, 1);
        }
    }
}

/// Keeps the interrupt handlers installed. Dropping it puts back whatever
/// dispositions were there before and closes the self-pipe.
pub(crate) struct InterruptGuard {
    previous: Vec<(c_int, sigaction)>,
    wake_read: RawFd,
    wake_write: RawFd,
}

impl InterruptGuard {
    pub(crate) fn install() -> io::Result<Self> {
        let (wake_read, wake_write) = open_wake_pipe()?;

        // From here on the guard owns the pipe; an early return closes it and
        // restores whatever was already replaced.
        let mut guard = Self {
            previous: Vec::with_capacity(INTERRUPT_SIGNALS.len()),
            wake_read,
            wake_write,
        };

        INTERRUPTED.store(false, Ordering::SeqCst);
        WAKE_FD.store(wake_write, Ordering::SeqCst);

        for signal in INTERRUPT_SIGNALS {
            // No SA_RESTART: a blocked poll must return EINTR.
            let mut action: sigaction = unsafe { mem::zeroed() };
            action.sa_sigaction = on_interrupt as extern "C" fn(c_int) as sighandler_t;
            unsafe { sigemptyset(&mut action.sa_mask) };

            let mut previous: sigaction = unsafe { mem::zeroed() };
            let res = unsafe { libc::sigaction(signal, &action, &mut previous) };
            if res < 0 {
                return Err(io::Error::last_os_error());
            }

            guard.previous.push((signal, previous));
        }

        Ok(guard)
    }

    /// Descriptor that turns readable when a signal arrives.
    pub(crate) fn wake_fd(&self) -> RawFd {
        self.wake_read
    }

    /// Consumes a pending interrupt, if any.
    ///
    /// The pipe is drained before the flag is cleared. A signal landing in
    /// between leaves a stray byte behind, which only costs a spurious wakeup.
    pub(crate) fn take(&self) -> bool {
        self.drain();

        INTERRUPTED.swap(false, Ordering::SeqCst)
    }

    fn drain(&self) {
        let mut buf = [0u8; 16];

        loop {
            let n = unsafe {
                libc::read(self.wake_read, buf.as_mut_ptr() as *mut c_void, buf.len())
            };
            if n <= 0 {
                break;
            }
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        for (signal, previous) in self.previous.drain(..).rev() {
            unsafe {
                libc::sigaction(signal, &previous, ptr::null_mut());
            }
        }

        let _ =
            WAKE_FD.compare_exchange(self.wake_write, -1, Ordering::SeqCst, Ordering::SeqCst);

        unsafe {
            libc::close(self.wake_read);
            libc::close(self.wake_write);
        }
    }
}

fn open_wake_pipe() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [-1 as RawFd; 2];

    if unsafe { libc::pipe(fds.as_mut_ptr()) } < 0 {
        return Err(io::Error::last_os_error());
    }

    let configured = fds.iter().try_for_each(|&fd| {
        set_nonblocking(fd)?;
        if unsafe { libc::fcntl(fd, F_SETFD, FD_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    });

    if let Err(err) = configured {
        unsafe {
            libc::close(fds[0]);
            libc::close(fds[1]);
        }
        return Err(err);
    }

    Ok((fds[0], fds[1]))
}
