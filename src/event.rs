//! Event kinds, cookies and the pending-event container.

use std::any::Any;
use std::fmt;

/// What occurred.
///
/// Kinds fall into three families: peer-protocol events, supervisor-control
/// events and internal events. Internal kinds and [`EventKind::Invalid`] can
/// never be bound by user code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // Peer protocol
    PeerMsgIn,
    SupMsgIn,
    WantCriticalRegion,
    EnteredCriticalRegion,
    ExitedCriticalRegion,

    // Supervisor control
    SupervisorMsgIn,
    PeriodicWork,
    Sync,
    EndOfRun,

    // Internal
    PacketIn,

    Invalid,
}

impl EventKind {
    /// Every kind, in table order.
    pub const ALL: [EventKind; 11] = [
        EventKind::PeerMsgIn,
        EventKind::SupMsgIn,
        EventKind::WantCriticalRegion,
        EventKind::EnteredCriticalRegion,
        EventKind::ExitedCriticalRegion,
        EventKind::SupervisorMsgIn,
        EventKind::PeriodicWork,
        EventKind::Sync,
        EventKind::EndOfRun,
        EventKind::PacketIn,
        EventKind::Invalid,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Kinds the loop raises for itself and never lets user code bind.
    pub fn is_internal(self) -> bool {
        matches!(self, EventKind::PacketIn)
    }

    /// Whether user code may bind a handler to this kind.
    pub fn is_registrable(self) -> bool {
        !self.is_internal() && self != EventKind::Invalid
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::PeerMsgIn => "peer-msg-in",
            EventKind::SupMsgIn => "sup-msg-in",
            EventKind::WantCriticalRegion => "want-critical-region",
            EventKind::EnteredCriticalRegion => "entered-critical-region",
            EventKind::ExitedCriticalRegion => "exited-critical-region",
            EventKind::SupervisorMsgIn => "supervisor-msg-in",
            EventKind::PeriodicWork => "periodic-work",
            EventKind::Sync => "sync",
            EventKind::EndOfRun => "end-of-run",
            EventKind::PacketIn => "packet-in",
            EventKind::Invalid => "invalid",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque data travelling with an event.
///
/// Ownership moves with the event: whoever enqueues a cookie gives it up, and it
/// is dropped once the bound handler is done with it.
#[derive(Default)]
pub struct Cookie(Option<Box<dyn Any>>);

impl Cookie {
    /// Wraps `value` so it can travel with an event.
    ///
    /// # Example
    /// ```ignore
    /// ctx.enqueue(EventKind::Sync, Cookie::new(42u32));
    /// // later, in the sync handler:
    /// let round = cookie.take::<u32>();
    /// ```
    pub fn new<T: Any>(value: T) -> Self {
        Self(Some(Box::new(value)))
    }

    /// A cookie carrying nothing.
    pub fn empty() -> Self {
        Self(None)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    /// Borrows the value if it has type `T`.
    ///
    /// # Returns
    /// `None` for an empty cookie or when the payload is of another type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_ref().and_then(|value| value.downcast_ref::<T>())
    }

    /// Takes the value out if it has type `T`.
    pub fn take<T: Any>(self) -> Option<T> {
        self.0
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }
}

impl fmt::Debug for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Cookie(..)"),
            None => f.write_str("Cookie(empty)"),
        }
    }
}

/// An event waiting to be delivered.
#[derive(Debug)]
pub struct PendingEvent {
    pub kind: EventKind,
    pub cookie: Cookie,
}

impl PendingEvent {
    pub fn new(kind: EventKind, cookie: Cookie) -> Self {
        Self { kind, cookie }
    }
}

/// A received datagram, handed to the peer or supervisor handler as its cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub magic: u32,
    pub data: Vec<u8>,
}

/// The three logical wakeup sources, plus the operator interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Network,
    TimerExpired,
    AppEvent,
    Interrupt,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Network => "network",
            Channel::TimerExpired => "timer-expired",
            Channel::AppEvent => "app-event",
            Channel::Interrupt => "interrupt",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_user_facing_kinds_are_registrable() {
        let registrable: Vec<_> = EventKind::ALL
            .iter()
            .filter(|kind| kind.is_registrable())
            .collect();

        assert_eq!(registrable.len(), 9);
        assert!(!EventKind::PacketIn.is_registrable());
        assert!(!EventKind::Invalid.is_registrable());
    }

    #[test]
    fn table_order_matches_discriminants() {
        for (i, kind) in EventKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn cookie_hands_back_its_value() {
        let cookie = Cookie::new(42u32);

        assert_eq!(cookie.downcast_ref::<u32>(), Some(&42));
        assert_eq!(cookie.downcast_ref::<i64>(), None);
        assert_eq!(cookie.take::<u32>(), Some(42));
        assert!(Cookie::empty().take::<u32>().is_none());
    }
}
