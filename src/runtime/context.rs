//! What a running handler can see and do.
//!
//! Handlers receive `&mut Context` instead of the loop itself. From here they
//! can enqueue further events and arm timers, but they cannot dispatch
//! anything inline, so a handler always runs to completion before the next
//! notification is looked at.

use crate::error::ErrorCode;
use crate::event::{Cookie, EventKind, PendingEvent};
use crate::region::CriticalRegion;
use crate::runtime::queue::EventQueue;
use crate::timer::{Clock, TimerId, TimerPool};

use std::time::Duration;
use tracing::trace;

/// Handler-facing slice of the loop.
pub struct Context {
    pub(crate) queue: EventQueue,
    pub(crate) timers: TimerPool,
    clock: Box<dyn Clock>,
    region: Option<Box<dyn CriticalRegion>>,
}

impl Context {
    pub(crate) fn new(
        timers: TimerPool,
        clock: Box<dyn Clock>,
        region: Option<Box<dyn CriticalRegion>>,
    ) -> Self {
        Self {
            queue: EventQueue::new(),
            timers,
            clock,
            region,
        }
    }

    /// Queues `kind` for a later dispatch pass. Never runs a handler inline.
    pub fn enqueue(&mut self, kind: EventKind, cookie: Cookie) {
        trace!(%kind, ?cookie, pending = self.queue.len(), "Queuing event");
        self.queue.push(PendingEvent::new(kind, cookie));
    }

    /// Delivers `kind` as an application event once `delay` has passed.
    ///
    /// # Errors
    /// [`ErrorCode::TimerPoolFull`] when every slot is armed.
    pub fn schedule(
        &mut self,
        kind: EventKind,
        cookie: Cookie,
        delay: Duration,
    ) -> Result<TimerId, ErrorCode> {
        let now = self.clock.now();
        self.timers
            .schedule(now, delay, PendingEvent::new(kind, cookie))
    }

    /// Current time on the loop's clock.
    ///
    /// # Returns
    /// Time since the clock's origin, the same scale timer deadlines use. Only
    /// differences between two readings mean anything.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// The collaborator given to the builder, if any.
    ///
    /// # Example
    /// ```ignore
    /// let free = ctx.critical_region().is_some_and(|region| region.is_free());
    /// if free {
    ///     ctx.enqueue(EventKind::EnteredCriticalRegion, Cookie::empty());
    /// }
    /// ```
    pub fn critical_region(&self) -> Option<&dyn CriticalRegion> {
        self.region.as_deref()
    }

    /// Application events waiting for dispatch.
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn timers(&self) -> &TimerPool {
        &self.timers
    }
}
