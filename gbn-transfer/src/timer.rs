//! Single-shot retransmission timer.
//!
//! [`RetransmitTimer`] wraps one `tokio::time::Sleep` that is reset instead
//! of recreated, so there is never more than one countdown per session.  The
//! engine awaits [`RetransmitTimer::expired`] inside the same `select!` as
//! the socket read; whichever finishes first wins and the other future is
//! dropped.
//!
//! An expiration is delivered exactly once: after `expired()` resolves the
//! timer is disarmed until the next [`arm`](RetransmitTimer::arm).

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Instant, Sleep};

/// A cancellable fixed-duration countdown.
#[derive(Debug)]
pub struct RetransmitTimer {
    timeout: Duration,
    sleep: Pin<Box<Sleep>>,
    armed: bool,
}

impl RetransmitTimer {
    /// Create a disarmed timer with the given fixed duration.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            sleep: Box::pin(tokio::time::sleep(timeout)),
            armed: false,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Start the countdown, replacing any countdown already running.
    pub fn arm(&mut self) {
        self.sleep.as_mut().reset(Instant::now() + self.timeout);
        self.armed = true;
    }

    /// Stop the countdown.  No effect if it already fired or was never armed.
    pub fn cancel(&mut self) {
        self.armed = false;
    }

    /// Resolve when the armed countdown elapses.
    ///
    /// Pends forever while disarmed.  Cancel-safe: dropping the returned
    /// future before it resolves leaves the countdown running.
    pub async fn expired(&mut self) {
        if !self.armed {
            std::future::pending::<()>().await;
        }
        (&mut self.sleep).await;
        self.armed = false;
    }
}
