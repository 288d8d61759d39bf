//! Timer Module
//!
//! Cooperative timers fired from the event loop between event reads. The
//! queue never runs anything itself: `fire_due` hands back what expired and
//! the window manager acts on it on the same thread.

use std::time::{Duration, Instant};

use tracing::trace;
use x11rb::protocol::xproto::{Timestamp, Window};

/// Handle of a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Raise a window the pointer has been resting on
    AutoRaise(Window),
    /// Once a minute, for the toolbar clock
    ClockTick,
    /// A pending single click is no longer part of a double click
    DoubleClickExpire,
}

#[derive(Debug)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    deadline: Instant,
    interval: Option<Duration>,
}

/// Timer queue, ordered by deadline
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: Vec<Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: TimerKind, deadline: Instant, interval: Option<Duration>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let at = self.timers.partition_point(|t| t.deadline <= deadline);
        self.timers.insert(at, Timer { id, kind, deadline, interval });
        trace!("Scheduled {:?} as {:?}", kind, id);
        id
    }

    /// Fire once, `delay` after `now`.
    pub fn schedule(&mut self, kind: TimerKind, delay: Duration, now: Instant) -> TimerId {
        self.insert(kind, now + delay, None)
    }

    /// Fire every `interval`, first at `now + interval`.
    pub fn schedule_repeating(&mut self, kind: TimerKind, interval: Duration, now: Instant) -> TimerId {
        self.insert(kind, now + interval, Some(interval.max(Duration::from_millis(1))))
    }

    /// Returns whether the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        before != self.timers.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.first().map(|t| t.deadline)
    }

    /// Remove and return every timer due at `now`, earliest first.
    /// Repeating timers are put back for their next period; periods missed
    /// while the loop was busy are skipped, not replayed.
    pub fn fire_due(&mut self, now: Instant) -> Vec<TimerKind> {
        let due = self.timers.partition_point(|t| t.deadline <= now);
        let expired: Vec<Timer> = self.timers.drain(..due).collect();
        let mut fired = Vec::with_capacity(expired.len());
        for timer in expired {
            fired.push(timer.kind);
            if let Some(interval) = timer.interval {
                let mut deadline = timer.deadline + interval;
                while deadline <= now {
                    deadline += interval;
                }
                let at = self.timers.partition_point(|t| t.deadline <= deadline);
                self.timers.insert(at, Timer { deadline, ..timer });
            }
        }
        fired
    }
}

/// What a button press on a titlebar turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    Single,
    Double,
}

/// Double-click detection. A first click arms the tracker and the caller
/// schedules a `DoubleClickExpire` timer; a second click on the same window
/// with the same button inside the interval completes the pair.
#[derive(Debug, Default)]
pub struct ClickTracker {
    pending: Option<(Window, u8, Timestamp)>,
    expiry: Option<TimerId>,
}

impl ClickTracker {
    /// Record a press. `interval_ms` is compared against server timestamps.
    pub fn press(&mut self, window: Window, button: u8, time: Timestamp, interval_ms: u64) -> Click {
        if let Some((w, b, t)) = self.pending {
            let elapsed = u64::from(time.wrapping_sub(t));
            if w == window && b == button && elapsed <= interval_ms {
                self.pending = None;
                return Click::Double;
            }
        }
        self.pending = Some((window, button, time));
        Click::Single
    }

    /// Remember the expiry timer; returns the previous one to cancel.
    pub fn arm(&mut self, id: TimerId) -> Option<TimerId> {
        self.expiry.replace(id)
    }

    pub fn expire(&mut self) {
        self.pending = None;
        self.expiry = None;
    }

    /// Take the expiry timer so the caller can cancel it.
    pub fn take_expiry(&mut self) -> Option<TimerId> {
        self.expiry.take()
    }
}
