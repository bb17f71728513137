//! Go-Back-N send window bookkeeping.
//!
//! [`WindowState`] tracks only two frontiers: `base`, the lowest chunk not
//! yet acknowledged, and `highest_sent`, the highest chunk ever transmitted.
//! Individual ACKs are never recorded; a cumulative ACK simply moves `base`.
//!
//! # Sequence-number layout
//!
//! ```text
//!   base       highest_sent    base + N - 1
//!    │              │               │
//! ───┼──────────────┼───────────────┼──────────▶ chunk index
//!    │◀─ in flight ▶│◀─ unsent ───▶ │
//! ```
//!
//! This module only manages state; all I/O is the caller's responsibility.

use std::ops::{Range, RangeInclusive};

/// Window frontiers for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowState {
    base: u32,
    /// `None` until the first round is sent.
    highest_sent: Option<u32>,
    window_size: u32,
    packet_count: u32,
}

impl WindowState {
    /// Create a window over `packet_count` chunks with window size N.
    pub fn new(window_size: usize, packet_count: u32) -> Self {
        assert!(window_size >= 1, "window_size must be at least 1");
        Self {
            base: 0,
            highest_sent: None,
            window_size: u32::try_from(window_size).unwrap_or(u32::MAX),
            packet_count,
        }
    }

    /// Lowest sequence number not yet acknowledged.
    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn highest_sent(&self) -> Option<u32> {
        self.highest_sent
    }

    /// First sequence number that has never been transmitted.
    fn next_unsent(&self) -> u32 {
        self.highest_sent.map_or(0, |h| h + 1)
    }

    /// Sequence numbers eligible for transmission this round:
    /// `[base, min(base + N - 1, packet_count - 1)]`.
    ///
    /// Returns `None` once every chunk has been acknowledged.
    pub fn pending_range(&self) -> Option<RangeInclusive<u32>> {
        if self.is_exhausted() {
            return None;
        }
        let end = self
            .base
            .saturating_add(self.window_size - 1)
            .min(self.packet_count - 1);
        Some(self.base..=end)
    }

    /// Members of [`pending_range`](Self::pending_range) not sent before.
    pub fn unsent(&self) -> Range<u32> {
        match self.pending_range() {
            Some(range) => self.next_unsent().max(*range.start())..*range.end() + 1,
            None => 0..0,
        }
    }

    /// Record that a round up to and including `end` has been sent.
    pub fn mark_sent(&mut self, end: u32) {
        debug_assert!(
            end < self.base.saturating_add(self.window_size),
            "mark_sent({end}) past the window edge (base={}, N={})",
            self.base,
            self.window_size
        );
        self.highest_sent = Some(self.highest_sent.map_or(end, |h| h.max(end)));
    }

    /// Process a cumulative ACK covering everything through `ack_num`.
    ///
    /// Moves `base` to `ack_num + 1` and returns `true` only when
    /// `base ≤ ack_num ≤ highest_sent`.  ACKs behind the frontier are stale;
    /// ACKs for data never sent are bogus.  Both leave the window unchanged.
    pub fn advance_on_ack(&mut self, ack_num: u32) -> bool {
        if ack_num < self.base {
            return false;
        }
        match self.highest_sent {
            Some(h) if ack_num <= h => {
                self.base = ack_num + 1;
                true
            }
            _ => false,
        }
    }

    /// `true` when every sent packet of the current round is acknowledged.
    pub fn round_complete(&self) -> bool {
        self.base == self.next_unsent()
    }

    /// `true` once the entire stream is acknowledged.
    pub fn is_exhausted(&self) -> bool {
        self.base == self.packet_count
    }

    /// Sent but unacknowledged sequence numbers, `[base, highest_sent]`
    /// as a half-open range.
    ///
    /// This is exactly the set resent on timeout.
    pub fn in_flight(&self) -> Range<u32> {
        self.base..self.next_unsent().max(self.base)
    }
}
