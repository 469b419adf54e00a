//! Result codes returned by handlers and errors raised while setting up the loop.
//!
//! [`ErrorCode`] is an ordered code space: everything at or above
//! [`ErrorCode::FIRST_FATAL`] makes the event loop shut down after the
//! notification currently in hand. Handlers only ever report codes; the loop is
//! the single place that decides whether a code is fatal.

use std::io;

/// Ordered result codes. Variant order is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, thiserror::Error)]
pub enum ErrorCode {
    /// Every timer slot is armed. The caller may retry later.
    #[error("timer pool exhausted")]
    TimerPoolFull,

    /// An inbound datagram did not start with a known magic number.
    #[error("malformed message: unknown magic")]
    BadMagic,

    /// The transport failed to hand over a datagram.
    #[error("failed to receive message")]
    Receive,

    /// A handler failed in a way it can recover from.
    #[error("handler failed")]
    Failed,

    /// A handler was registered for an internal or invalid event kind.
    #[error("event kind cannot be registered")]
    Misconfigured,

    /// A handler failed and the process must stop.
    #[error("fatal handler failure")]
    Fatal,

    /// An event fired with no handler bound to it.
    #[error("no handler registered for event")]
    Unhandled,

    /// The event loop could not be set up.
    #[error("event loop setup failed")]
    Setup,
}

impl ErrorCode {
    /// First code of the fatal class.
    pub const FIRST_FATAL: ErrorCode = ErrorCode::Fatal;

    pub fn is_fatal(self) -> bool {
        self >= Self::FIRST_FATAL
    }
}

/// What every handler returns.
pub type HandlerResult = Result<(), ErrorCode>;

/// Errors raised by the lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not {step}: {source}")]
    Setup {
        step: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("event loop is already initialized")]
    AlreadyInitialized,
}

impl Error {
    pub(crate) fn setup(step: &'static str) -> impl FnOnce(io::Error) -> Error {
        move |source| Error::Setup { step, source }
    }

    /// The result code an embedding program should exit with.
    pub fn code(&self) -> ErrorCode {
        ErrorCode::Setup
    }
}
