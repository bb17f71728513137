//! Network simulation for deterministic testing.
//!
//! Real networks drop and duplicate datagrams.  To exercise the
//! retransmission paths without depending on actual network conditions this
//! module provides two [`Transport`] implementations:
//!
//! - [`MemoryTransport`] — one end of an in-process, lossless datagram link
//!   built by [`memory_pair`].  Lets tests script the remote peer byte by
//!   byte, and works under `tokio::time::pause`.
//! - [`LossyTransport`] — wraps any transport and applies a fault model:
//!
//! | Fault            | Description                                      |
//! |------------------|--------------------------------------------------|
//! | Outbound loss    | Drop a sent datagram with probability `loss_rate`.|
//! | Inbound loss     | Drop a received datagram with the same rate.     |
//! | Duplication      | Send a datagram twice with `duplicate_rate`.     |
//!
//! Randomness comes from a seeded [`StdRng`], so a failing run can be
//! reproduced from its seed.  The receiver CLI uses [`LossyTransport`] to
//! emulate a lossy link on demand.

use std::io;
use std::net::SocketAddr;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;

use crate::socket::Transport;

type Datagram = (Vec<u8>, SocketAddr);

// ---------------------------------------------------------------------------
// MemoryTransport
// ---------------------------------------------------------------------------

/// One end of an in-memory datagram link.
#[derive(Debug)]
pub struct MemoryTransport {
    local: SocketAddr,
    tx: mpsc::UnboundedSender<Datagram>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Datagram>>,
}

/// Build two connected endpoints with the given addresses.
///
/// Whatever one side sends arrives at the other regardless of the `dest`
/// argument; the link has exactly two ends.
pub fn memory_pair(a: SocketAddr, b: SocketAddr) -> (MemoryTransport, MemoryTransport) {
    let (a_tx, b_rx) = mpsc::unbounded_channel();
    let (b_tx, a_rx) = mpsc::unbounded_channel();
    (
        MemoryTransport {
            local: a,
            tx: a_tx,
            rx: tokio::sync::Mutex::new(a_rx),
        },
        MemoryTransport {
            local: b,
            tx: b_tx,
            rx: tokio::sync::Mutex::new(b_rx),
        },
    )
}

impl MemoryTransport {
    /// Take the next queued datagram without waiting.
    pub fn try_recv(&self) -> Option<(Vec<u8>, SocketAddr)> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

impl Transport for MemoryTransport {
    async fn send_to(&self, buf: &[u8], _dest: SocketAddr) -> io::Result<usize> {
        self.tx
            .send((buf.to_vec(), self.local))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer endpoint dropped"))?;
        Ok(buf.len())
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some((bytes, from)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Ok((n, from))
            }
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "peer endpoint dropped",
            )),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}

// ---------------------------------------------------------------------------
// LossyTransport
// ---------------------------------------------------------------------------

/// Configuration for the fault-injection model.
///
/// All probabilities are in the range `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that an outbound datagram is sent twice.
    pub duplicate_rate: f64,
    /// Seed for the fault RNG.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // No faults by default — the simulator is a transparent pass-through.
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

/// A fault-injecting wrapper around another transport.
#[derive(Debug)]
pub struct LossyTransport<T> {
    inner: T,
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
}

impl<T: Transport> LossyTransport<T> {
    pub fn new(inner: T, config: SimulatorConfig) -> Self {
        let rng = Mutex::new(StdRng::seed_from_u64(config.seed));
        Self { inner, config, rng }
    }

    fn roll(&self, probability: f64) -> bool {
        if probability <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.random_bool(probability.min(1.0))
    }
}

impl<T: Transport> Transport for LossyTransport<T> {
    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        if self.roll(self.config.loss_rate) {
            log::trace!("[sim] dropped outbound datagram ({} bytes)", buf.len());
            // A lost datagram still looks fully sent to the caller.
            return Ok(buf.len());
        }
        let n = self.inner.send_to(buf, dest).await?;
        if self.roll(self.config.duplicate_rate) {
            log::trace!("[sim] duplicated outbound datagram");
            self.inner.send_to(buf, dest).await?;
        }
        Ok(n)
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        loop {
            let (n, from) = self.inner.recv_from(buf).await?;
            if self.roll(self.config.loss_rate) {
                log::trace!("[sim] dropped inbound datagram from {from}");
                continue;
            }
            return Ok((n, from));
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
