//! FIFO queue of application events.
//!
//! Stands in for the real-time signal queue: every enqueue lands at the back,
//! the loop pops one event from the front per application-event notification.
//! Only the dispatch flow touches it, so it needs no locking.

use crate::event::PendingEvent;

use std::collections::VecDeque;

#[derive(Default)]
pub(crate) struct EventQueue {
    queue: VecDeque<PendingEvent>,
}

impl EventQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, event: PendingEvent) {
        self.queue.push_back(event);
    }

    pub(crate) fn pop(&mut self) -> Option<PendingEvent> {
        self.queue.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}
