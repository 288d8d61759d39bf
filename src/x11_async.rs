//! Async X11 readiness
//!
//! A blocking mio poller watches the connection's socket and wakes the
//! event loop through a [`Notify`]; events themselves are read on the
//! loop's thread with non-blocking `poll_for_event`.

use std::os::unix::io::AsRawFd;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{oneshot, Notify};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::wm::error::WmError;

const X11_TOKEN: mio::Token = mio::Token(0);

/// How often the poller checks whether the source was dropped
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Most events handed out per `drain`, so timers and signals get a turn
/// during event storms
pub const DRAIN_LIMIT: usize = 256;

pub struct XEventSource {
    conn: Arc<RustConnection>,
    readable: Arc<Notify>,
    /// Closed on drop, which stops the poller
    _poller_alive: oneshot::Receiver<()>,
}

impl XEventSource {
    /// Start the poller. Must be called inside a tokio runtime.
    pub fn new(conn: Arc<RustConnection>) -> Result<Self> {
        let readable = Arc::new(Notify::new());
        let waker = readable.clone();
        let (alive, poller_alive) = oneshot::channel::<()>();

        let fd = conn.stream().as_raw_fd();
        let mut poll = mio::Poll::new().context("Failed to create mio Poll")?;
        poll.registry()
            .register(&mut mio::unix::SourceFd(&fd), X11_TOKEN, mio::Interest::READABLE)
            .context("Failed to register X11 socket with mio")?;

        tokio::task::spawn_blocking(move || {
            let mut ready = mio::Events::with_capacity(1);
            while !alive.is_closed() {
                match poll.poll(&mut ready, Some(POLL_TIMEOUT)) {
                    Ok(()) if ready.iter().any(|e| e.token() == X11_TOKEN) => waker.notify_one(),
                    Ok(()) => {}
                    Err(err) => tracing::warn!("X11 socket poll failed: {:?}", err),
                }
            }
            tracing::debug!("X11 socket poller stopped");
        });

        Ok(Self {
            conn,
            readable,
            _poller_alive: poller_alive,
        })
    }

    /// Take the events already queued on the connection. An empty batch
    /// means the buffer is drained.
    pub fn drain(&self) -> Result<Vec<Event>> {
        let mut batch = Vec::new();
        while batch.len() < DRAIN_LIMIT {
            match self.conn.poll_for_event().map_err(WmError::ConnectionLost)? {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        Ok(batch)
    }

    /// Resolves when the socket has become readable.
    pub async fn readable(&self) {
        self.readable.notified().await;
    }
}
