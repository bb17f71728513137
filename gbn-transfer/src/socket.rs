//! Datagram transport abstraction.
//!
//! The engine and the receiver only need two operations from the network:
//! "send these bytes to that address" and "give me the next datagram".
//! [`Transport`] names that seam; [`UdpTransport`] is the real implementation
//! over `tokio::net::UdpSocket`, and [`crate::simulator`] provides in-memory
//! and lossy ones for tests.
//!
//! Deadlines are not part of the trait.  Callers race `recv_from` against
//! their own timer, so implementations must be cancel-safe.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;

/// An unreliable, message-oriented channel.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Send `buf` as one datagram.  Returns the number of bytes the transport
    /// accepted, which may be less than `buf.len()`.
    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize>;

    /// Wait for the next datagram, copy at most `buf.len()` bytes of it into
    /// `buf`, and return the copied length and the sender address.
    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

impl<T: Transport> Transport for &T {
    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        (**self).send_to(buf, dest).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        (**self).recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        (**self).local_addr()
    }
}

/// UDP socket transport.
#[derive(Debug)]
pub struct UdpTransport {
    inner: UdpSocket,
}

impl UdpTransport {
    /// Bind a new socket to `local_addr`.
    ///
    /// Passing `0.0.0.0:0` lets the OS choose an ephemeral port.
    pub async fn bind(local_addr: SocketAddr) -> io::Result<Self> {
        let inner = UdpSocket::bind(local_addr).await?;
        log::debug!("[gbn] bound UDP socket on {}", inner.local_addr()?);
        Ok(Self { inner })
    }

    /// Bind an ephemeral port on the unspecified address of `peer`'s family.
    pub async fn bind_for(peer: SocketAddr) -> io::Result<Self> {
        let local: SocketAddr = if peer.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        Self::bind(local).await
    }
}

impl Transport for UdpTransport {
    async fn send_to(&self, buf: &[u8], dest: SocketAddr) -> io::Result<usize> {
        self.inner.send_to(buf, dest).await
    }

    async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
