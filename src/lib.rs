//! Event delivery and timing for a distributed critical-region protocol.
//!
//! Peers and a supervisor exchange datagrams; a per-process state machine
//! decides when the process may enter or leave the critical region. This crate
//! is the substrate underneath: it registers handlers per event kind, queues
//! events in strict FIFO order, arms a bounded pool of one-shot timers and
//! demultiplexes inbound datagrams, all on a single flow of control.
//!
//! # Architecture
//!
//! - **EventLoop**: waits on the three notification sources and dispatches one at a time
//! - **Context**: what a running handler may touch (enqueue, schedule, collaborator queries)
//! - **Registry**: event kind to handler table with a fail-fast default
//! - **TimerPool**: fixed-capacity arena of one-shot timers
//! - **Demux**: routes datagrams to the peer or supervisor handler by magic number
//! - **EventLoopBuilder**: fluent construction and configuration
//!
//! Handlers return [`HandlerResult`]. Any [`ErrorCode`] at or above
//! [`ErrorCode::FIRST_FATAL`] stops the loop after the notification in hand.
//! Logging goes through `tracing`; installing a subscriber is up to the
//! embedding program.

mod builder;
mod error;
mod event;
pub mod reactor;
mod region;
mod registry;
mod runtime;
mod timer;
mod utils;

pub use builder::EventLoopBuilder;
pub use error::{Error, ErrorCode, HandlerResult};
pub use event::{Channel, Cookie, EventKind, Packet, PendingEvent};
pub use reactor::demux::MagicNumbers;
pub use reactor::socket::{DEFAULT_RECEIVE_BUFFER, Transport};
pub use region::CriticalRegion;
pub use registry::Handler;
pub use runtime::{Context, EventLoop, RunState};
pub use timer::{
    Clock, DEFAULT_TIMER_CAPACITY, ManualClock, MonotonicClock, SlotState, TimerId, TimerPool,
};
