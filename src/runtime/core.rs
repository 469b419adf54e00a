//! The wait-and-dispatch loop.
//!
//! All three notification sources (network readiness, timer expiry and queued
//! application events) funnel into one flow of control that services exactly
//! one notification to completion before it waits again. Two notifications are
//! never in flight at once, which is what lets the registry, the timer pool and
//! the queue go without locks.
//!
//! An operator interrupt is always looked at first. The other three sources
//! take turns: each wakeup starts scanning at the source after the one serviced
//! last, so a peer that keeps the socket readable cannot starve timers or
//! queued events. A ready source waits at most two notifications. A timer
//! expiry only moves its event to the back of the application queue, so it
//! still waits behind events that were queued before it fired.

use crate::builder::EventLoopBuilder;
use crate::error::{Error, ErrorCode, HandlerResult};
use crate::event::{Channel, Cookie, EventKind, Packet};
use crate::reactor::demux::{self, MagicNumbers};
use crate::reactor::interrupt::InterruptGuard;
use crate::reactor::poller::{Poller, Readiness};
use crate::reactor::socket::{self, Transport};
use crate::registry::{self, Binding, Handler, Registry};
use crate::runtime::context::Context;
use crate::timer::TimerId;

use std::io;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Sources that take turns when more than one is ready.
const ROTATION: [Channel; 3] = [Channel::Network, Channel::TimerExpired, Channel::AppEvent];

/// Where the loop is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Built, not yet running.
    Idle,
    Running,
    /// Exit requested; finishing the notification in hand.
    ShuttingDown,
    Stopped,
}

/// Single-threaded event dispatcher.
///
/// # Example
/// ```ignore
/// use dme_events::{EventKind, EventLoopBuilder};
/// use std::net::UdpSocket;
///
/// let mut event_loop = EventLoopBuilder::new().handle_interrupts(true).build();
/// event_loop.register(EventKind::PeerMsgIn, |ctx, cookie| {
///     // parse the packet, talk to the critical region...
///     Ok(())
/// })?;
/// event_loop.init(UdpSocket::bind("0.0.0.0:5000")?)?;
/// let outcome = event_loop.run();
/// event_loop.deinit();
/// ```
pub struct EventLoop {
    registry: Registry,
    context: Context,
    transport: Option<Box<dyn Transport>>,
    /// Reused by every receive; its length is the configured buffer size.
    buffer: Vec<u8>,
    poller: Poller,
    magic: MagicNumbers,
    handle_interrupts: bool,
    interrupts: Option<InterruptGuard>,
    state: RunState,
    exit_request: bool,
    err_code: Option<ErrorCode>,
    tick: u64,
    /// Index into [`ROTATION`] where the next scan starts.
    rotation: usize,
}

impl EventLoop {
    pub(crate) fn new(
        context: Context,
        magic: MagicNumbers,
        handle_interrupts: bool,
        receive_buffer: usize,
    ) -> Self {
        Self {
            registry: Registry::new(),
            context,
            transport: None,
            buffer: vec![0u8; receive_buffer],
            poller: Poller::new(),
            magic,
            handle_interrupts,
            interrupts: None,
            state: RunState::Idle,
            exit_request: false,
            err_code: None,
            tick: 0,
            rotation: 0,
        }
    }

    /// Shorthand for [`EventLoopBuilder::new`].
    pub fn builder() -> EventLoopBuilder {
        EventLoopBuilder::new()
    }

    /// Binds a closure to `kind`, replacing any previous binding.
    ///
    /// # Errors
    /// [`ErrorCode::Misconfigured`] for internal kinds and [`EventKind::Invalid`];
    /// the existing binding is left untouched.
    pub fn register<F>(&mut self, kind: EventKind, handler: F) -> HandlerResult
    where
        F: FnMut(&mut Context, Cookie) -> HandlerResult + 'static,
    {
        self.registry.register(kind, Box::new(handler))
    }

    /// Like [`EventLoop::register`], for types implementing [`Handler`].
    pub fn register_handler<H>(&mut self, kind: EventKind, handler: H) -> HandlerResult
    where
        H: Handler + 'static,
    {
        self.registry.register(kind, Box::new(handler))
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.registry.is_bound(kind)
    }

    /// Queues `kind` for asynchronous delivery.
    ///
    /// # Arguments
    /// * `kind` - the event to deliver; unbound kinds fail fast at dispatch time
    /// * `cookie` - payload handed to the handler, owned by the queue until then
    pub fn enqueue(&mut self, kind: EventKind, cookie: Cookie) {
        self.context.enqueue(kind, cookie);
    }

    /// Delivers `kind` as an application event after `delay`.
    ///
    /// # Returns
    /// The slot id of the armed timer.
    ///
    /// # Errors
    /// [`ErrorCode::TimerPoolFull`] when every slot is armed. Nothing is
    /// queued in that case and the cookie is dropped.
    pub fn schedule(
        &mut self,
        kind: EventKind,
        cookie: Cookie,
        delay: Duration,
    ) -> Result<TimerId, ErrorCode> {
        self.context.schedule(kind, cookie, delay)
    }

    /// Runs the handler bound to `kind` right now, bypassing the queue.
    ///
    /// A fatal result requests shutdown exactly as it would from the loop.
    pub fn dispatch_now(&mut self, kind: EventKind, cookie: Cookie) -> HandlerResult {
        let result = self.invoke(kind, cookie);

        self.observe(kind, result)
    }

    /// Attaches the network transport.
    ///
    /// Puts the descriptor in non-blocking mode, installs the interrupt handlers
    /// when enabled and starts watching the descriptor for incoming data. Stops
    /// at the first failing step; do not call [`EventLoop::run`] after an error.
    pub fn init<T>(&mut self, transport: T) -> Result<(), Error>
    where
        T: Transport + 'static,
    {
        if self.transport.is_some() {
            return Err(Error::AlreadyInitialized);
        }

        let fd = transport.as_raw_fd();
        debug!(fd, "Initializing event loop");

        socket::set_nonblocking(fd)
            .map_err(Error::setup("put socket in non-blocking mode"))
            .inspect_err(|err| error!(%err, "Event loop setup failed"))?;

        if self.handle_interrupts && self.interrupts.is_none() {
            let guard = InterruptGuard::install()
                .map_err(Error::setup("install interrupt handlers"))
                .inspect_err(|err| error!(%err, "Event loop setup failed"))?;
            self.poller.set_wake(Some(guard.wake_fd()));
            self.interrupts = Some(guard);
        }

        self.poller.attach(fd);
        self.transport = Some(Box::new(transport));

        Ok(())
    }

    /// Releases timers and the transport. Safe to call after a failed `init`.
    pub fn deinit(&mut self) {
        let abandoned = self.context.timers.armed();
        if abandoned > 0 {
            debug!(abandoned, "Dropping armed timers");
        }

        self.context.timers.clear();
        self.release_interrupts();
        self.poller.detach();
        self.transport = None;
    }

    /// Waits for and dispatches notifications until shutdown is requested.
    ///
    /// Returns the fatal code that stopped the loop, or `Ok` after an
    /// end-of-run event or operator interrupt.
    pub fn run(&mut self) -> Result<(), ErrorCode> {
        self.state = RunState::Running;
        info!("Event loop started");

        while !self.exit_request {
            match self.next_notification(true) {
                Ok(Some(channel)) => self.service(channel),
                Ok(None) => {}
                Err(err) => {
                    error!(%err, "Waiting for notifications failed");
                    self.err_code = Some(ErrorCode::Fatal);
                    self.request_exit();
                }
            }
        }

        self.finish()
    }

    /// Services every notification that is ready right now, without blocking.
    ///
    /// Returns how many notifications were handled. Stops early once shutdown
    /// is requested.
    pub fn run_pending(&mut self) -> usize {
        let mut handled = 0;

        while self.turn().is_some() {
            handled += 1;
        }

        handled
    }

    /// Services at most one ready notification without blocking.
    pub fn turn(&mut self) -> Option<Channel> {
        if self.exit_request {
            return None;
        }

        let channel = match self.next_notification(false) {
            Ok(channel) => channel?,
            Err(err) => {
                error!(%err, "Polling for notifications failed");
                self.err_code = Some(ErrorCode::Fatal);
                self.request_exit();
                return None;
            }
        };

        self.service(channel);

        Some(channel)
    }

    /// Where the loop is in its life; see [`RunState`].
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Whether shutdown has been requested. Stays set once raised.
    pub fn exit_requested(&self) -> bool {
        self.exit_request
    }

    /// Last error code any handler returned.
    pub fn last_error(&self) -> Option<ErrorCode> {
        self.err_code
    }

    /// Number of wakeups serviced so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    fn next_notification(&mut self, block: bool) -> io::Result<Option<Channel>> {
        loop {
            if self.interrupts.as_ref().is_some_and(InterruptGuard::take) {
                return Ok(Some(Channel::Interrupt));
            }

            let now = self.context.now();
            for offset in 0..ROTATION.len() {
                let index = (self.rotation + offset) % ROTATION.len();
                let channel = ROTATION[index];

                if self.is_ready(channel, now)? {
                    self.rotation = (index + 1) % ROTATION.len();
                    return Ok(Some(channel));
                }
            }

            if !block {
                return Ok(None);
            }

            let timeout = self
                .context
                .timers
                .next_deadline()
                .map(|deadline| deadline.saturating_sub(now));

            // Whatever ended the wait, the next pass re-checks every source.
            let readiness = self.poller.wait(timeout)?;
            trace!(?readiness, "Wait returned");
        }
    }

    fn is_ready(&self, channel: Channel, now: Duration) -> io::Result<bool> {
        let ready = match channel {
            Channel::Network => self.poller.try_wait()? == Readiness::Readable,
            Channel::TimerExpired => self.context.timers.next_expired(now).is_some(),
            Channel::AppEvent => !self.context.queue.is_empty(),
            Channel::Interrupt => false,
        };

        Ok(ready)
    }

    fn service(&mut self, channel: Channel) {
        self.tick += 1;
        trace!(tick = self.tick, %channel, "Wakeup");

        match channel {
            Channel::Network => {
                let _ = self.dispatch_now(EventKind::PacketIn, Cookie::empty());
            }
            Channel::TimerExpired => self.expire_timer(),
            Channel::AppEvent => {
                if let Some(event) = self.context.queue.pop() {
                    let _ = self.dispatch_now(event.kind, event.cookie);
                }
            }
            Channel::Interrupt => {
                info!("Operator interrupt received");
                let _ = self.dispatch_now(EventKind::EndOfRun, Cookie::empty());
            }
        }
    }

    fn expire_timer(&mut self) {
        let now = self.context.now();
        let Some(slot) = self.context.timers.next_expired(now) else {
            return;
        };

        if let Some(event) = self.context.timers.expire(slot) {
            trace!(slot, kind = %event.kind, "Timer expired");
            self.context.queue.push(event);
        }
    }

    // Runs the bound handler without judging its result.
    fn invoke(&mut self, kind: EventKind, cookie: Cookie) -> HandlerResult {
        debug!(%kind, "Handling event");

        let outcome = match self.registry.lookup(kind) {
            Binding::User(handler) => Some(handler.handle(&mut self.context, cookie)),
            Binding::Unbound => Some(registry::fail_fast(kind)),
            Binding::EndOfRun => {
                info!("End of run requested");
                Some(Ok(()))
            }
            Binding::Demux => None,
        };

        let result = match outcome {
            Some(result) => result,
            None => self.demux(),
        };

        if kind == EventKind::EndOfRun {
            self.request_exit();
        }

        result
    }

    fn demux(&mut self) -> HandlerResult {
        let Some(transport) = self.transport.as_mut() else {
            warn!("Packet event without a transport; ignoring");
            return Err(ErrorCode::Receive);
        };

        let received = match transport.receive(&mut self.buffer) {
            Ok(received) => received,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                trace!("Spurious network wakeup");
                return Ok(());
            }
            Err(err) => {
                warn!(%err, "Failed to receive message");
                return Err(ErrorCode::Receive);
            }
        };

        let Some(data) = self.buffer.get(..received).map(<[u8]>::to_vec) else {
            warn!(
                received,
                capacity = self.buffer.len(),
                "Transport overran the receive buffer"
            );
            return Err(ErrorCode::Receive);
        };

        // `data` is dropped on every path out of here, whichever handler runs.
        let (kind, magic) = demux::classify(&self.magic, &data)?;
        trace!(%kind, len = data.len(), "Demultiplexed packet");

        self.invoke(kind, Cookie::new(Packet { magic, data }))
    }

    // The single place that decides whether a result is fatal.
    fn observe(&mut self, kind: EventKind, result: HandlerResult) -> HandlerResult {
        if let Err(code) = result {
            self.err_code = Some(code);

            if code.is_fatal() {
                error!(%kind, %code, "Fatal error; shutting down");
                self.request_exit();
            } else {
                debug!(%kind, %code, "Handler reported an error");
            }
        }

        result
    }

    fn request_exit(&mut self) {
        self.exit_request = true;
        if self.state == RunState::Running {
            self.state = RunState::ShuttingDown;
        }
    }

    fn release_interrupts(&mut self) {
        self.poller.set_wake(None);
        self.interrupts = None;
    }

    fn finish(&mut self) -> Result<(), ErrorCode> {
        self.release_interrupts();
        self.state = RunState::Stopped;
        info!(ticks = self.tick, "Exit requested. Terminating wait loop");

        match self.err_code {
            Some(code) if code.is_fatal() => Err(code),
            _ => Ok(()),
        }
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        EventLoopBuilder::new().build()
    }
}
