//! Go-Back-N transfer engine: the sending half of a session.
//!
//! # Architecture
//!
//! ```text
//!   payload (Vec<u8>)
//!        │ SessionParams::chunk_range
//!        ▼
//!  TransferEngine ──── Packet::encode ───▶ Transport::send_to
//!    ├── WindowState      (base / highest_sent)
//!    ├── RetransmitTimer  (single shot, 3 s)
//!    └── retries          (consecutive timeouts)
//!        ▲
//!        └──────── Packet::decode ◀─── Transport::recv_from
//! ```
//!
//! The engine sends in rounds.  A round is the pending range of the window;
//! the next round only starts once the whole previous one is acknowledged.
//! When the timer fires the entire in-flight range `[base, highest_sent]` is
//! sent again, not just the packet that was presumably lost.
//!
//! # Usage
//!
//! ```ignore
//! let transport = UdpTransport::bind_for(peer).await?;
//! let config = TransferConfig::new(peer, 256, 8)?;
//! let report = TransferEngine::new(transport, &config, data)?.run().await?;
//! ```
//!
//! [`TransferEngine::step`] performs a single state transition and is what
//! [`TransferEngine::run`] loops over; tests use it to observe intermediate
//! states.

use std::net::SocketAddr;

use crate::config::{SessionParams, TransferConfig};
use crate::error::TransferError;
use crate::packet::{Packet, PacketType, HEADER_LEN, MAX_DATAGRAM};
use crate::socket::Transport;
use crate::state::EngineState;
use crate::teardown;
use crate::timer::RetransmitTimer;
use crate::window::WindowState;

/// Counters collected over one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    /// Payload bytes acknowledged by the receiver.
    pub bytes_delivered: usize,
    /// Number of chunks the payload was split into.
    pub packet_count: u32,
    /// DATA packets sent for the first time.
    pub packets_sent: u64,
    /// DATA packets sent again after a timeout.
    pub packets_retransmitted: u64,
    /// Timer expirations over the whole session.
    pub timeouts: u64,
    /// ACKs that moved the window.
    pub acks_accepted: u64,
    /// ACKs that were stale, duplicate, or for unsent data.
    pub acks_ignored: u64,
    /// Datagrams discarded as noise (undecodable or not an ACK).
    pub noise: u64,
    pub teardown_sent: usize,
}

/// What a single inbound datagram did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Not an ACK; discarded.
    Noise,
    /// A valid ACK that did not move the window.
    Ignored,
    /// The window moved but the round is still open.
    Progress,
    /// The whole round is acknowledged; the next one may be sent.
    RoundComplete,
    /// The whole stream is acknowledged.
    StreamComplete,
}

/// Sending half of one Go-Back-N session.
pub struct TransferEngine<T> {
    transport: T,
    peer: SocketAddr,
    data: Vec<u8>,
    params: SessionParams,
    window: WindowState,
    timer: RetransmitTimer,
    /// Consecutive timeouts since the last forward progress of `base`.
    retries: u32,
    max_tries: u32,
    teardown_count: usize,
    state: EngineState,
    report: TransferReport,
}

impl<T: Transport> TransferEngine<T> {
    /// Prepare a session that will deliver `data` to `config.peer`.
    pub fn new(
        transport: T,
        config: &TransferConfig,
        data: Vec<u8>,
    ) -> Result<Self, TransferError> {
        let params = SessionParams::new(data.len(), config.chunk_size, config.window_size)?;
        log::debug!(
            "[gbn] session: {} bytes, {} packets of ≤{} bytes, window {}",
            params.total_bytes,
            params.packet_count,
            params.chunk_size,
            params.window_size
        );
        Ok(Self {
            transport,
            peer: config.peer,
            data,
            window: WindowState::new(params.window_size, params.packet_count),
            params,
            timer: RetransmitTimer::new(config.retransmit_timeout),
            retries: 0,
            max_tries: config.max_tries,
            teardown_count: config.teardown_count,
            state: EngineState::Filling,
            report: TransferReport {
                packet_count: params.packet_count,
                ..Default::default()
            },
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn window(&self) -> &WindowState {
        &self.window
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn report(&self) -> &TransferReport {
        &self.report
    }

    /// Drive the session to completion.
    ///
    /// Returns the session report once the teardown burst has been sent, or
    /// the first fatal error.
    pub async fn run(mut self) -> Result<TransferReport, TransferError> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        while self.step(&mut buf).await? != EngineState::Terminated {}
        log::info!(
            "[gbn] transfer complete: {} bytes in {} packets ({} retransmitted)",
            self.report.bytes_delivered,
            self.report.packet_count,
            self.report.packets_retransmitted
        );
        Ok(self.report)
    }

    /// Perform one state transition and return the new state.
    ///
    /// In `AwaitingAck` this blocks until a datagram arrives or the timer
    /// fires.  `buf` receives inbound datagrams and should hold at least
    /// [`MAX_DATAGRAM`] bytes.
    pub async fn step(&mut self, buf: &mut [u8]) -> Result<EngineState, TransferError> {
        match self.state {
            EngineState::Filling => self.send_round().await?,
            EngineState::AwaitingAck => {
                tokio::select! {
                    result = self.transport.recv_from(buf) => {
                        let (n, from) = result?;
                        self.on_datagram(&buf[..n], from);
                    }
                    _ = self.timer.expired() => {
                        self.on_timeout()?;
                    }
                }
            }
            EngineState::Retransmitting => self.retransmit().await?,
            EngineState::Done => {
                self.timer.cancel();
                self.report.bytes_delivered = self.params.total_bytes;
                self.state = EngineState::Teardown;
            }
            EngineState::Teardown => {
                self.report.teardown_sent =
                    teardown::send_burst(&self.transport, self.peer, self.teardown_count).await;
                self.state = EngineState::Terminated;
            }
            EngineState::Terminated => {}
        }
        Ok(self.state)
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// FILLING: send every not-yet-sent packet of the pending range.
    async fn send_round(&mut self) -> Result<(), TransferError> {
        let Some(range) = self.window.pending_range() else {
            self.state = EngineState::Done;
            return Ok(());
        };
        let end = *range.end();

        for seq in self.window.unsent() {
            self.send_chunk(seq).await?;
            self.report.packets_sent += 1;
        }
        self.window.mark_sent(end);
        self.timer.arm();
        self.state = EngineState::AwaitingAck;
        log::debug!("[gbn] → round [{}, {}]", range.start(), end);
        Ok(())
    }

    /// RETRANSMITTING: resend the whole in-flight window.
    async fn retransmit(&mut self) -> Result<(), TransferError> {
        let in_flight = self.window.in_flight();
        log::debug!(
            "[gbn] timeout — retransmitting [{}, {})",
            in_flight.start,
            in_flight.end
        );
        for seq in in_flight {
            self.send_chunk(seq).await?;
            self.report.packets_retransmitted += 1;
        }
        self.timer.arm();
        self.state = EngineState::AwaitingAck;
        Ok(())
    }

    /// AWAITING_ACK: apply one inbound datagram.
    ///
    /// The source address is not checked: a receiver bound to a wildcard
    /// address may answer from a different local IP than the one targeted.
    fn on_datagram(&mut self, bytes: &[u8], from: SocketAddr) -> AckOutcome {
        let pkt = match Packet::decode(bytes) {
            Ok(pkt) => pkt,
            Err(e) => {
                log::debug!("[gbn] ← {e} from {from}; dropped");
                self.report.noise += 1;
                return AckOutcome::Noise;
            }
        };
        if pkt.kind != PacketType::Ack {
            log::debug!("[gbn] ← unexpected {:?} packet; dropped", pkt.kind);
            self.report.noise += 1;
            return AckOutcome::Noise;
        }

        if !self.window.advance_on_ack(pkt.seq) {
            log::debug!(
                "[gbn] ← ACK {} ignored (base={}, highest_sent={:?})",
                pkt.seq,
                self.window.base(),
                self.window.highest_sent()
            );
            self.report.acks_ignored += 1;
            return AckOutcome::Ignored;
        }

        self.retries = 0;
        self.report.acks_accepted += 1;
        log::debug!("[gbn] ← ACK {} base={}", pkt.seq, self.window.base());

        if self.window.is_exhausted() {
            self.timer.cancel();
            self.state = EngineState::Done;
            AckOutcome::StreamComplete
        } else if self.window.round_complete() {
            self.timer.cancel();
            self.state = EngineState::Filling;
            AckOutcome::RoundComplete
        } else {
            self.timer.arm();
            AckOutcome::Progress
        }
    }

    /// AWAITING_ACK: the timer fired.
    fn on_timeout(&mut self) -> Result<(), TransferError> {
        self.retries += 1;
        self.report.timeouts += 1;
        if self.retries >= self.max_tries {
            log::error!("[gbn] no response after {} tries", self.retries);
            return Err(TransferError::NoResponse {
                tries: self.retries,
            });
        }
        log::warn!(
            "[gbn] timed out, {} more tries...",
            self.max_tries - self.retries
        );
        self.state = EngineState::Retransmitting;
        Ok(())
    }

    /// Frame chunk `seq` and hand it to the transport.
    async fn send_chunk(&mut self, seq: u32) -> Result<(), TransferError> {
        let range = self.params.chunk_range(seq);
        let bytes = Packet::data(seq, self.data[range].to_vec()).encode();
        let sent = self.transport.send_to(&bytes, self.peer).await?;
        if sent != bytes.len() {
            return Err(TransferError::ShortWrite {
                expected: bytes.len(),
                sent,
            });
        }
        log::trace!("[gbn] → DATA seq={seq} len={}", bytes.len() - HEADER_LEN);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io;
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::simulator::{memory_pair, MemoryTransport};

    const TIMEOUT: Duration = Duration::from_secs(3);

    fn sender_addr() -> SocketAddr {
        "10.0.0.1:4000".parse().unwrap()
    }

    fn receiver_addr() -> SocketAddr {
        "10.0.0.2:5000".parse().unwrap()
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    /// Engine over one end of a memory link; the other end plays the receiver.
    fn setup(
        total: usize,
        chunk: usize,
        window: usize,
    ) -> (TransferEngine<MemoryTransport>, MemoryTransport) {
        let (local, remote) = memory_pair(sender_addr(), receiver_addr());
        let config = TransferConfig::new(receiver_addr(), chunk, window).unwrap();
        let engine = TransferEngine::new(local, &config, payload(total)).unwrap();
        (engine, remote)
    }

    /// Everything the engine has sent so far, decoded.
    fn drain(peer: &MemoryTransport) -> Vec<Packet> {
        std::iter::from_fn(|| peer.try_recv())
            .map(|(bytes, _)| Packet::decode(&bytes).unwrap())
            .collect()
    }

    fn seqs(pkts: &[Packet]) -> Vec<u32> {
        pkts.iter().map(|p| p.seq).collect()
    }

    async fn ack(peer: &MemoryTransport, seq: u32) {
        peer.send_to(&Packet::ack(seq).encode(), sender_addr())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn ten_bytes_two_rounds_then_teardown() {
        let (mut engine, peer) = setup(10, 3, 2);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let data = payload(10);

        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::AwaitingAck);
        let round1 = drain(&peer);
        assert_eq!(seqs(&round1), vec![0, 1]);
        assert_eq!(round1[0].payload, data[0..3]);
        assert_eq!(round1[1].payload, data[3..6]);

        ack(&peer, 1).await;
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::Filling);
        assert_eq!(engine.window().base(), 2);

        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::AwaitingAck);
        let round2 = drain(&peer);
        assert_eq!(seqs(&round2), vec![2, 3]);
        assert_eq!(round2[0].payload, data[6..9]);
        assert_eq!(round2[1].payload, data[9..10]);

        ack(&peer, 3).await;
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::Done);
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::Teardown);
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::Terminated);

        let teardown = drain(&peer);
        assert_eq!(teardown.len(), 10);
        assert!(teardown.iter().all(|p| p.kind == PacketType::Teardown));
        assert_eq!(engine.report().bytes_delivered, 10);
        assert_eq!(engine.report().packets_retransmitted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn lost_first_ack_resends_round_verbatim() {
        let (mut engine, peer) = setup(10, 3, 2);
        let mut buf = vec![0u8; MAX_DATAGRAM];

        engine.step(&mut buf).await.unwrap();
        let first: Vec<Vec<u8>> = std::iter::from_fn(|| peer.try_recv()).map(|d| d.0).collect();
        assert_eq!(first.len(), 2);

        let start = Instant::now();
        assert_eq!(
            engine.step(&mut buf).await.unwrap(),
            EngineState::Retransmitting
        );
        assert_eq!(start.elapsed(), TIMEOUT);
        assert_eq!(engine.retries(), 1);
        assert_eq!(engine.window().base(), 0);

        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::AwaitingAck);
        let resent: Vec<Vec<u8>> = std::iter::from_fn(|| peer.try_recv()).map(|d| d.0).collect();
        assert_eq!(resent, first);
    }

    #[tokio::test(start_paused = true)]
    async fn ten_timeouts_is_no_response() {
        let (local, peer) = memory_pair(sender_addr(), receiver_addr());
        let config = TransferConfig::new(receiver_addr(), 3, 2).unwrap();
        let engine = TransferEngine::new(&local, &config, payload(10)).unwrap();

        let start = Instant::now();
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, TransferError::NoResponse { tries: 10 }));
        assert_eq!(start.elapsed(), TIMEOUT * 10);

        // One initial round plus nine full-window retransmissions.
        let sent = drain(&peer);
        assert_eq!(sent.len(), 2 + 9 * 2);
        assert!(sent.iter().all(|p| p.kind == PacketType::Data));
    }

    #[tokio::test(start_paused = true)]
    async fn ack_equal_to_base_advances_one_and_rearms() {
        let (mut engine, peer) = setup(4, 1, 4);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();
        drain(&peer);

        tokio::time::advance(Duration::from_secs(2)).await;
        ack(&peer, 0).await;
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::AwaitingAck);
        assert_eq!(engine.window().base(), 1);

        // The timer restarted at the ACK: it fires 3 s later, not 1 s later.
        let start = Instant::now();
        assert_eq!(
            engine.step(&mut buf).await.unwrap(),
            EngineState::Retransmitting
        );
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn ack_below_base_is_ignored() {
        let (mut engine, peer) = setup(4, 1, 4);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();

        ack(&peer, 1).await;
        engine.step(&mut buf).await.unwrap();
        assert_eq!(engine.window().base(), 2);

        // base - 1 and older are stale.
        for stale in [1, 0] {
            let outcome = engine.on_datagram(&Packet::ack(stale).encode(), receiver_addr());
            assert_eq!(outcome, AckOutcome::Ignored);
        }
        assert_eq!(engine.window().base(), 2);
        assert_eq!(engine.report().acks_ignored, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_progress_retransmits_rest_of_window() {
        let (mut engine, peer) = setup(8, 1, 4);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();
        assert_eq!(seqs(&drain(&peer)), vec![0, 1, 2, 3]);

        ack(&peer, 1).await;
        engine.step(&mut buf).await.unwrap();
        assert_eq!(engine.window().base(), 2);

        assert_eq!(
            engine.step(&mut buf).await.unwrap(),
            EngineState::Retransmitting
        );
        engine.step(&mut buf).await.unwrap();
        // Exactly [base, highest_sent]; nothing new beyond the round.
        assert_eq!(seqs(&drain(&peer)), vec![2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_datagram_does_not_reset_timer() {
        let (mut engine, peer) = setup(10, 3, 2);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let start = Instant::now();
        engine.step(&mut buf).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        peer.send_to(&[1, 2, 3, 4, 5], sender_addr()).await.unwrap();
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::AwaitingAck);
        assert_eq!(engine.report().noise, 1);

        assert_eq!(
            engine.step(&mut buf).await.unwrap(),
            EngineState::Retransmitting
        );
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn non_ack_datagram_is_noise() {
        let (mut engine, _peer) = setup(10, 3, 2);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();

        assert_eq!(
            engine.on_datagram(&Packet::data(1, vec![1]).encode(), receiver_addr()),
            AckOutcome::Noise
        );
        assert_eq!(engine.window().base(), 0);
        assert_eq!(engine.report().noise, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ack_from_other_source_address_is_accepted() {
        let (mut engine, _peer) = setup(10, 3, 2);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();

        // Same receiver, answering from another local IP.
        let other_ip: SocketAddr = "10.0.0.3:5000".parse().unwrap();
        assert_eq!(
            engine.on_datagram(&Packet::ack(1).encode(), other_ip),
            AckOutcome::RoundComplete
        );
        assert_eq!(engine.window().base(), 2);
        assert_eq!(engine.state(), EngineState::Filling);
        assert_eq!(engine.report().noise, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ack_beyond_highest_sent_is_ignored_without_rearm() {
        let (mut engine, peer) = setup(8, 1, 4);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let start = Instant::now();
        engine.step(&mut buf).await.unwrap();
        assert_eq!(seqs(&drain(&peer)), vec![0, 1, 2, 3]);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(
            engine.on_datagram(&Packet::ack(5).encode(), receiver_addr()),
            AckOutcome::Ignored
        );
        assert_eq!(engine.window().base(), 0);
        assert_eq!(engine.report().acks_ignored, 1);

        // Still the original deadline.
        assert_eq!(
            engine.step(&mut buf).await.unwrap(),
            EngineState::Retransmitting
        );
        assert_eq!(start.elapsed(), TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn large_window_single_cycle() {
        let (mut engine, peer) = setup(20, 4, 16);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();
        assert_eq!(seqs(&drain(&peer)), vec![0, 1, 2, 3, 4]);

        ack(&peer, 4).await;
        assert_eq!(engine.step(&mut buf).await.unwrap(), EngineState::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_resets_retry_counter() {
        let (mut engine, peer) = setup(4, 1, 2);
        let mut buf = vec![0u8; MAX_DATAGRAM];
        engine.step(&mut buf).await.unwrap();

        for _ in 0..9 {
            assert_eq!(
                engine.step(&mut buf).await.unwrap(),
                EngineState::Retransmitting
            );
            engine.step(&mut buf).await.unwrap();
        }
        assert_eq!(engine.retries(), 9);

        ack(&peer, 0).await;
        engine.step(&mut buf).await.unwrap();
        assert_eq!(engine.retries(), 0);

        assert_eq!(
            engine.step(&mut buf).await.unwrap(),
            EngineState::Retransmitting
        );
        assert_eq!(engine.retries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_payload_goes_straight_to_teardown() {
        let (local, peer) = memory_pair(sender_addr(), receiver_addr());
        let config = TransferConfig::new(receiver_addr(), 8, 2).unwrap();
        let report = TransferEngine::new(&local, &config, Vec::new())
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(report.packets_sent, 0);
        assert_eq!(report.teardown_sent, 10);
        assert_eq!(drain(&peer).len(), 10);
    }

    /// Transport that always reports one byte fewer than requested.
    struct ShortTransport;

    impl Transport for ShortTransport {
        async fn send_to(&self, buf: &[u8], _dest: SocketAddr) -> io::Result<usize> {
            Ok(buf.len() - 1)
        }

        async fn recv_from(&self, _buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            std::future::pending().await
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok(sender_addr())
        }
    }

    #[tokio::test]
    async fn short_write_is_fatal() {
        let config = TransferConfig::new(receiver_addr(), 3, 2).unwrap();
        let mut engine = TransferEngine::new(ShortTransport, &config, payload(10)).unwrap();
        let mut buf = vec![0u8; MAX_DATAGRAM];
        let err = engine.step(&mut buf).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::ShortWrite {
                expected: 15,
                sent: 14
            }
        ));
    }
}
