//! Go-Back-N receive side: the acknowledging peer.
//!
//! [`Acknowledger`] implements the receiver half of the protocol:
//!
//! - Only the **next expected** chunk is accepted (seq == `expected`).
//! - Out-of-order and duplicate chunks are **silently discarded**.
//! - Every DATA packet, accepted or not, is answered with a **cumulative
//!   ACK** naming the highest contiguously received chunk.  Before the first
//!   chunk arrives there is nothing to acknowledge and no ACK is sent.
//! - The first TEARDOWN ends the session.
//!
//! [`serve`] drives an [`Acknowledger`] over any [`Transport`].

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::TransferError;
use crate::packet::{Packet, PacketType, MAX_DATAGRAM};
use crate::socket::Transport;

/// What the caller should do after feeding one packet to the acknowledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Send a cumulative ACK with this sequence number.
    Ack(u32),
    /// Nothing to send.
    Silent,
    /// The sender ended the session.
    Finished,
}

/// Receive-side state for one session.
#[derive(Debug, Default)]
pub struct Acknowledger {
    /// Next chunk index that will be accepted.
    expected: u32,
    /// Reassembled stream.
    data: Vec<u8>,
    accepted: u64,
    discarded: u64,
    finished: bool,
}

impl Acknowledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one decoded packet.
    pub fn on_packet(&mut self, pkt: &Packet) -> Reply {
        match pkt.kind {
            PacketType::Data => {
                if pkt.seq == self.expected {
                    self.data.extend_from_slice(&pkt.payload);
                    self.expected += 1;
                    self.accepted += 1;
                } else {
                    self.discarded += 1;
                }
                self.ack_number().map_or(Reply::Silent, Reply::Ack)
            }
            PacketType::Teardown => {
                self.finished = true;
                Reply::Finished
            }
            PacketType::Ack => Reply::Silent,
        }
    }

    /// Highest contiguously received chunk, if any.
    pub fn ack_number(&self) -> Option<u32> {
        self.expected.checked_sub(1)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Outcome of a [`serve`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub data: Vec<u8>,
    pub packets_accepted: u64,
    pub packets_discarded: u64,
    pub acks_sent: u64,
    /// `false` when the session ended on the idle timeout instead of a
    /// TEARDOWN.
    pub clean_teardown: bool,
}

impl Received {
    /// Fail with [`TransferError::Incomplete`] unless the sender closed the
    /// session with a TEARDOWN.
    pub fn ensure_complete(&self) -> Result<(), TransferError> {
        if self.clean_teardown {
            Ok(())
        } else {
            Err(TransferError::Incomplete {
                bytes: self.data.len(),
            })
        }
    }
}

/// Acknowledge one incoming transfer until TEARDOWN.
///
/// Datagrams that fail to decode are dropped.  Once the first DATA packet has
/// arrived, `idle_timeout` (if given) bounds how long to wait for the next
/// datagram; expiry ends the session as if every TEARDOWN had been lost.
pub async fn serve<T: Transport>(
    transport: &T,
    idle_timeout: Option<Duration>,
) -> Result<Received, TransferError> {
    let mut ack = Acknowledger::new();
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut acks_sent = 0u64;
    let mut sender: Option<SocketAddr> = None;

    loop {
        let recv = transport.recv_from(&mut buf);
        let (n, from) = match (idle_timeout, sender) {
            (Some(idle), Some(_)) => match tokio::time::timeout(idle, recv).await {
                Ok(result) => result?,
                Err(_elapsed) => {
                    log::warn!("[gbn:rx] idle for {idle:?}; assuming teardown was lost");
                    break;
                }
            },
            _ => recv.await?,
        };

        let pkt = match Packet::decode(&buf[..n]) {
            Ok(pkt) => pkt,
            Err(e) => {
                log::debug!("[gbn:rx] ← {e}; dropped");
                continue;
            }
        };

        match sender {
            Some(addr) if addr != from => {
                log::debug!("[gbn:rx] ← datagram from {from} while serving {addr}; dropped");
                continue;
            }
            None => {
                log::info!("[gbn:rx] session from {from}");
                sender = Some(from);
            }
            Some(_) => {}
        }

        match ack.on_packet(&pkt) {
            Reply::Ack(seq) => {
                log::debug!("[gbn:rx] ← DATA seq={}; → ACK {seq}", pkt.seq);
                transport.send_to(&Packet::ack(seq).encode(), from).await?;
                acks_sent += 1;
            }
            Reply::Silent => log::debug!("[gbn:rx] ← {:?} seq={}; no reply", pkt.kind, pkt.seq),
            Reply::Finished => {
                log::info!("[gbn:rx] ← TEARDOWN; {} bytes received", ack.data().len());
                break;
            }
        }
    }

    Ok(Received {
        clean_teardown: ack.is_finished(),
        packets_accepted: ack.accepted,
        packets_discarded: ack.discarded,
        acks_sent,
        data: ack.into_data(),
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
