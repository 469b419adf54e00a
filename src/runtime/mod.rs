//! Dispatch loop and the state it owns.

pub(crate) mod context;
mod core;
pub(crate) mod queue;

pub use context::Context;
pub use self::core::{EventLoop, RunState};
