//! Fluent builder for [`EventLoop`] construction.

use crate::reactor::demux::MagicNumbers;
use crate::reactor::socket::DEFAULT_RECEIVE_BUFFER;
use crate::region::CriticalRegion;
use crate::runtime::{Context, EventLoop};
use crate::timer::{Clock, DEFAULT_TIMER_CAPACITY, MonotonicClock, TimerPool};

/// Builder for [`EventLoop`] instances.
///
/// # Example
/// ```ignore
/// let event_loop = EventLoopBuilder::new()
///     .timer_capacity(16)
///     .handle_interrupts(true)
///     .build();
/// ```
pub struct EventLoopBuilder {
    timer_capacity: usize,
    magic: MagicNumbers,
    handle_interrupts: bool,
    receive_buffer: usize,
    clock: Option<Box<dyn Clock>>,
    region: Option<Box<dyn CriticalRegion>>,
}

impl Default for EventLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLoopBuilder {
    pub fn new() -> Self {
        Self {
            timer_capacity: DEFAULT_TIMER_CAPACITY,
            magic: MagicNumbers::default(),
            handle_interrupts: false,
            receive_buffer: DEFAULT_RECEIVE_BUFFER,
            clock: None,
            region: None,
        }
    }

    /// Maximum number of simultaneously armed timers. Defaults to 64.
    pub fn timer_capacity(mut self, capacity: usize) -> Self {
        self.timer_capacity = capacity;
        self
    }

    pub fn peer_magic(mut self, magic: u32) -> Self {
        self.magic.peer = magic;
        self
    }

    pub fn supervisor_magic(mut self, magic: u32) -> Self {
        self.magic.supervisor = magic;
        self
    }

    /// Treat SIGINT and SIGTSTP as an end-of-run request.
    ///
    /// The handlers are installed by [`EventLoop::init`] and removed when the
    /// loop stops.
    pub fn handle_interrupts(mut self, enabled: bool) -> Self {
        self.handle_interrupts = enabled;
        self
    }

    /// Size of the buffer each datagram is received into. Defaults to
    /// [`DEFAULT_RECEIVE_BUFFER`] (64 KiB).
    ///
    /// The buffer is allocated once and reused. Longer datagrams are truncated
    /// to `size` bytes; anything under four bytes never carries a valid magic
    /// number, so every datagram is then dropped as malformed.
    ///
    /// # Example
    /// ```ignore
    /// let event_loop = EventLoopBuilder::new().receive_buffer(1500).build();
    /// ```
    pub fn receive_buffer(mut self, size: usize) -> Self {
        self.receive_buffer = size;
        self
    }

    /// Time source for timers. Defaults to [`MonotonicClock`].
    ///
    /// A [`ManualClock`](crate::ManualClock) only moves when advanced, so a loop
    /// built with one should be driven with [`EventLoop::run_pending`] rather
    /// than [`EventLoop::run`].
    pub fn clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + 'static,
    {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn critical_region<R>(mut self, region: R) -> Self
    where
        R: CriticalRegion + 'static,
    {
        self.region = Some(Box::new(region));
        self
    }

    pub fn build(self) -> EventLoop {
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        let context = Context::new(TimerPool::new(self.timer_capacity), clock, self.region);

        EventLoop::new(
            context,
            self.magic,
            self.handle_interrupts,
            self.receive_buffer,
        )
    }
}
