//! Event kind to handler bindings.

use crate::error::{ErrorCode, HandlerResult};
use crate::event::{Cookie, EventKind};
use crate::runtime::Context;

use tracing::{debug, error};

/// Something that reacts to one event kind.
///
/// Any `FnMut(&mut Context, Cookie) -> HandlerResult` closure is a handler.
pub trait Handler {
    fn handle(&mut self, context: &mut Context, cookie: Cookie) -> HandlerResult;
}

impl<F> Handler for F
where
    F: FnMut(&mut Context, Cookie) -> HandlerResult,
{
    fn handle(&mut self, context: &mut Context, cookie: Cookie) -> HandlerResult {
        self(context, cookie)
    }
}

/// What a kind currently resolves to.
pub(crate) enum Binding {
    /// Nothing registered. Dispatching here fails fast.
    Unbound,
    /// Built-in end-of-run handler.
    EndOfRun,
    /// Built-in network demultiplexer.
    Demux,
    User(Box<dyn Handler>),
}

impl Binding {
    fn describe(&self) -> &'static str {
        match self {
            Binding::Unbound => "unbound",
            Binding::EndOfRun => "builtin end-of-run",
            Binding::Demux => "builtin demux",
            Binding::User(_) => "user",
        }
    }
}

/// Handler table, one entry per [`EventKind`].
pub(crate) struct Registry {
    bindings: Vec<Binding>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        let bindings = EventKind::ALL
            .iter()
            .map(|kind| match kind {
                EventKind::EndOfRun => Binding::EndOfRun,
                EventKind::PacketIn => Binding::Demux,
                _ => Binding::Unbound,
            })
            .collect();

        Self { bindings }
    }

    /// Binds `handler` to `kind`, replacing any previous binding.
    pub(crate) fn register(&mut self, kind: EventKind, handler: Box<dyn Handler>) -> HandlerResult {
        if kind == EventKind::Invalid {
            error!(%kind, "Refusing to register a handler for an invalid event");
            return Err(ErrorCode::Misconfigured);
        }
        if kind.is_internal() {
            error!(%kind, "Refusing to register a handler for an internal event");
            return Err(ErrorCode::Misconfigured);
        }

        let slot = &mut self.bindings[kind.index()];
        debug!(%kind, previous = slot.describe(), "Handler registered");
        *slot = Binding::User(handler);

        Ok(())
    }

    /// Resolves `kind`. The invalid entry can never be bound, so it always
    /// resolves to [`Binding::Unbound`].
    pub(crate) fn lookup(&mut self, kind: EventKind) -> &mut Binding {
        &mut self.bindings[kind.index()]
    }

    pub(crate) fn is_bound(&self, kind: EventKind) -> bool {
        !matches!(self.bindings[kind.index()], Binding::Unbound)
    }
}

/// Runs in place of a missing handler.
pub(crate) fn fail_fast(kind: EventKind) -> HandlerResult {
    error!(
        %kind,
        "No handler registered for this event or the event is invalid; aborting"
    );

    Err(ErrorCode::Unhandled)
}
