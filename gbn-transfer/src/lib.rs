//! `gbn-transfer` — reliable, ordered stream delivery over UDP with Go-Back-N.
//!
//! # Architecture
//!
//! ```text
//!  ┌────────────────┐   DATA (window of N)   ┌──────────────┐
//!  │ TransferEngine │───────────────────────▶│ Acknowledger │
//!  └───────┬────────┘                        └──────┬───────┘
//!          │          cumulative ACKs               │
//!          │◀───────────────────────────────────────┘
//!          │
//!  ┌───────▼───────────────────────────┐
//!  │ WindowState + RetransmitTimer     │
//!  │ (owned by the engine, one session)│
//!  └───────┬───────────────────────────┘
//!          │ raw datagrams
//!  ┌───────▼───┐
//!  │ Transport │  (UDP socket, or an in-memory / lossy simulator)
//!  └───────────┘
//! ```
//!
//! Each module has a single responsibility:
//! - [`packet`]     — wire format (serialise / deserialise)
//! - [`config`]     — session configuration and chunking parameters
//! - [`window`]     — Go-Back-N window frontiers (`base`, `highest_sent`)
//! - [`timer`]      — single-shot retransmission timer
//! - [`state`]      — engine finite-state-machine types
//! - [`engine`]     — the sending state machine
//! - [`teardown`]   — end-of-session TEARDOWN burst
//! - [`receiver`]   — the acknowledging peer
//! - [`socket`]     — datagram transport trait and UDP implementation
//! - [`simulator`]  — in-memory and lossy transports for testing
//! - [`error`]      — error types

pub mod config;
pub mod engine;
pub mod error;
pub mod packet;
pub mod receiver;
pub mod simulator;
pub mod socket;
pub mod state;
pub mod teardown;
pub mod timer;
pub mod window;

pub use config::{SessionParams, TransferConfig};
pub use engine::{TransferEngine, TransferReport};
pub use error::{ConfigError, TransferError};
pub use packet::{Packet, PacketError, PacketType};
pub use socket::{Transport, UdpTransport};
