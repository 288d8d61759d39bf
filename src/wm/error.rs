//! Error taxonomy
//!
//! Handlers return `anyhow::Result`; the variants below are the ones the
//! dispatcher needs to tell apart when deciding whether to keep running.

use thiserror::Error;
use tracing::{debug, error, warn};
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::x11_utils::X11Error;
use x11rb::protocol::xproto::Window;

/// Everything that can go wrong inside the window manager core.
#[derive(Debug, Error)]
pub enum WmError {
    /// Another client already selected SubstructureRedirect on the root.
    #[error("another window manager is already running on screen {0}")]
    AnotherWmRunning(usize),

    /// An event or command referenced a handle nobody owns (any more).
    #[error("window 0x{0:x} is not managed")]
    NotManaged(Window),

    /// The server rejected a request, usually because a client vanished.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The display connection itself is gone.
    #[error("display connection lost: {0}")]
    ConnectionLost(#[from] ConnectionError),

    /// A defensive check failed; the current operation is abandoned.
    #[error("internal inconsistency: {0}")]
    Inconsistent(&'static str),
}

/// What the event loop should do after a handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Log and go on with the next event
    Continue,
    /// Stop the event loop
    Fatal,
}

/// Classify an error coming out of an event handler.
pub fn severity(err: &anyhow::Error) -> Severity {
    for cause in err.chain() {
        if let Some(wm) = cause.downcast_ref::<WmError>() {
            return match wm {
                WmError::ConnectionLost(_) | WmError::AnotherWmRunning(_) => Severity::Fatal,
                _ => Severity::Continue,
            };
        }
        if cause.downcast_ref::<ConnectionError>().is_some() {
            return Severity::Fatal;
        }
        if let Some(reply) = cause.downcast_ref::<ReplyError>() {
            return match reply {
                ReplyError::ConnectionError(_) => Severity::Fatal,
                ReplyError::X11Error(_) => Severity::Continue,
            };
        }
        if let Some(reply) = cause.downcast_ref::<ReplyOrIdError>() {
            return match reply {
                ReplyOrIdError::ConnectionError(_) => Severity::Fatal,
                _ => Severity::Continue,
            };
        }
    }
    Severity::Continue
}

/// Log a failed handler and report whether the loop may continue.
pub fn report(err: &anyhow::Error) -> Severity {
    let severity = severity(err);
    match severity {
        Severity::Fatal => error!("Fatal error: {:#}", err),
        Severity::Continue => match err.downcast_ref::<WmError>() {
            Some(WmError::NotManaged(window)) => {
                debug!("Ignoring event for unmanaged window 0x{:x}", window)
            }
            _ => warn!("Operation failed: {:#}", err),
        },
    }
    severity
}

/// Process-wide handler for asynchronous X11 errors delivered as events.
pub fn log_x11_error(err: &X11Error) {
    // BadWindow/BadDrawable races are expected when clients vanish
    debug!(
        "X11 error {:?}: request {}.{} bad value 0x{:x} (sequence {})",
        err.error_kind, err.major_opcode, err.minor_opcode, err.bad_value, err.sequence
    );
}
