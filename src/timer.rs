//! Fixed-capacity timer pool and the clocks that drive it.
//!
//! A timer is one armed slot holding a deadline and the event to deliver when
//! that deadline passes. Expiry does not run a handler: the loop reclaims the
//! slot and pushes the event onto the application-event queue, behind whatever
//! is already waiting there.

use crate::error::ErrorCode;
use crate::event::{EventKind, PendingEvent};
use crate::utils::Arena;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Default number of timer slots.
pub const DEFAULT_TIMER_CAPACITY: usize = 64;

/// Source of monotonic time, measured from an arbitrary origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall-independent clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time.
///
/// # Example
/// ```ignore
/// let clock = ManualClock::new();
/// let mut event_loop = EventLoopBuilder::new().clock(clock.clone()).build();
/// clock.advance(Duration::from_secs(1));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward by `by`, stopping at [`Duration::MAX`].
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }

    /// Jumps to `to`. Nothing stops this from going backwards.
    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Index of a timer slot.
pub type TimerId = usize;

/// Observable state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Unused,
    Armed { deadline: Duration, kind: EventKind },
}

struct Armed {
    deadline: Duration,
    event: PendingEvent,
}

/// Bounded set of one-shot timers.
///
/// A slot only returns to [`SlotState::Unused`] through [`TimerPool::expire`],
/// so it can never be handed out again while its expiry is still undelivered.
pub struct TimerPool {
    slots: Arena<Armed>,
}

impl TimerPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arena::new(capacity),
        }
    }

    /// Arms a slot to deliver `event` once `delay` has elapsed past `now`.
    pub fn schedule(
        &mut self,
        now: Duration,
        delay: Duration,
        event: PendingEvent,
    ) -> Result<TimerId, ErrorCode> {
        let kind = event.kind;
        let deadline = now.saturating_add(delay);

        match self.slots.insert(Armed { deadline, event }) {
            Ok(slot) => {
                debug!(%kind, slot, ?delay, "Timer armed");
                Ok(slot)
            }
            Err(_) => {
                warn!(%kind, capacity = self.capacity(), "No free timer slot");
                Err(ErrorCode::TimerPoolFull)
            }
        }
    }

    /// The armed slot with the earliest deadline at or before `now`.
    pub fn next_expired(&self, now: Duration) -> Option<TimerId> {
        self.slots
            .iter()
            .filter(|(_, armed)| armed.deadline <= now)
            .min_by_key(|(slot, armed)| (armed.deadline, *slot))
            .map(|(slot, _)| slot)
    }

    /// Reclaims an expired slot and returns the event it was carrying.
    pub fn expire(&mut self, slot: TimerId) -> Option<PendingEvent> {
        let armed = self.slots.remove(slot)?;
        trace!(kind = %armed.event.kind, slot, "Timer slot reclaimed");

        Some(armed.event)
    }

    /// Earliest deadline among armed slots.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.slots.iter().map(|(_, armed)| armed.deadline).min()
    }

    /// What `slot` currently holds.
    ///
    /// # Arguments
    /// * `slot` - an id returned by [`TimerPool::schedule`]. Out-of-range ids
    ///   report [`SlotState::Unused`].
    pub fn slot_state(&self, slot: TimerId) -> SlotState {
        match self.slots.get(slot) {
            Some(armed) => SlotState::Armed {
                deadline: armed.deadline,
                kind: armed.event.kind,
            },
            None => SlotState::Unused,
        }
    }

    /// Number of timers waiting to expire.
    ///
    /// # Returns
    /// A count between 0 and [`TimerPool::capacity`]. Expired timers whose
    /// event is still sitting in the application queue are not counted.
    pub fn armed(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }

    /// Drops every armed timer without delivering it.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl Default for TimerPool {
    fn default() -> Self {
        Self::new(DEFAULT_TIMER_CAPACITY)
    }
}
