//! Error types shared across the crate.

use thiserror::Error;

/// Rejected session configuration.  Raised before any datagram is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("chunk size must be between 1 and {max} bytes, got {got}")]
    InvalidChunkSize { got: usize, max: usize },
    #[error("window size must be at least 1")]
    InvalidWindowSize,
    #[error("payload of {0} bytes needs more packets than the sequence space holds")]
    PayloadTooLarge(usize),
}

/// Fatal conditions that abort a transfer session.
///
/// Packet-level anomalies (malformed datagrams, stale ACKs) never show up
/// here; the engine absorbs them.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("send wrote {sent} of {expected} bytes")]
    ShortWrite { expected: usize, sent: usize },

    #[error("no response after {tries} consecutive timeouts")]
    NoResponse { tries: u32 },

    /// The receiver went idle before any TEARDOWN arrived.
    #[error("session ended without teardown after {bytes} bytes; stream may be truncated")]
    Incomplete { bytes: usize },
}
