//! Session configuration and the parameters derived from it.
//!
//! [`TransferConfig`] holds what the caller chooses (peer, chunk size, window
//! size) alongside the protocol constants.  [`SessionParams`] is computed
//! once per payload and answers "how many packets, and which bytes go in
//! each one".

use std::net::SocketAddr;
use std::ops::Range;
use std::time::Duration;

use crate::error::ConfigError;
use crate::packet::MAX_PAYLOAD;

/// Time to wait for acknowledgement progress before resending the window.
pub const RETRANSMIT_TIMEOUT: Duration = Duration::from_secs(3);

/// Consecutive timeouts tolerated before the session is abandoned.
pub const MAX_TRIES: u32 = 10;

/// Number of TEARDOWN messages emitted at the end of a session.
pub const TEARDOWN_COUNT: usize = 10;

/// Caller-supplied settings for one transfer session.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Address of the acknowledging receiver.
    pub peer: SocketAddr,
    /// Payload bytes per DATA packet, `1 ≤ chunk_size < 512`.
    pub chunk_size: usize,
    /// Go-Back-N window size N.
    pub window_size: usize,
    pub retransmit_timeout: Duration,
    pub max_tries: u32,
    pub teardown_count: usize,
}

impl TransferConfig {
    /// Validate `chunk_size` and `window_size` and fill in the protocol
    /// constants.
    pub fn new(
        peer: SocketAddr,
        chunk_size: usize,
        window_size: usize,
    ) -> Result<Self, ConfigError> {
        check_sizes(chunk_size, window_size)?;
        Ok(Self {
            peer,
            chunk_size,
            window_size,
            retransmit_timeout: RETRANSMIT_TIMEOUT,
            max_tries: MAX_TRIES,
            teardown_count: TEARDOWN_COUNT,
        })
    }

    /// Override the retransmit timeout.
    ///
    /// The value stays fixed for the whole session.
    pub fn with_retransmit_timeout(mut self, timeout: Duration) -> Self {
        self.retransmit_timeout = timeout;
        self
    }
}

/// Per-payload constants: how the stream is cut into packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionParams {
    pub total_bytes: usize,
    pub chunk_size: usize,
    /// `ceil(total_bytes / chunk_size)`.
    pub packet_count: u32,
    pub window_size: usize,
}

impl SessionParams {
    pub fn new(
        total_bytes: usize,
        chunk_size: usize,
        window_size: usize,
    ) -> Result<Self, ConfigError> {
        check_sizes(chunk_size, window_size)?;
        let packet_count = u32::try_from(total_bytes.div_ceil(chunk_size))
            .map_err(|_| ConfigError::PayloadTooLarge(total_bytes))?;
        Ok(Self {
            total_bytes,
            chunk_size,
            packet_count,
            window_size,
        })
    }

    /// Byte range of the payload carried by packet `seq`.
    ///
    /// Every packet but the last spans exactly `chunk_size` bytes; the last
    /// one carries the remainder.
    pub fn chunk_range(&self, seq: u32) -> Range<usize> {
        let start = seq as usize * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total_bytes);
        start..end
    }

    pub fn chunk_len(&self, seq: u32) -> usize {
        self.chunk_range(seq).len()
    }
}

fn check_sizes(chunk_size: usize, window_size: usize) -> Result<(), ConfigError> {
    if chunk_size == 0 || chunk_size >= MAX_PAYLOAD {
        return Err(ConfigError::InvalidChunkSize {
            got: chunk_size,
            max: MAX_PAYLOAD - 1,
        });
    }
    if window_size == 0 {
        return Err(ConfigError::InvalidWindowSize);
    }
    Ok(())
}
