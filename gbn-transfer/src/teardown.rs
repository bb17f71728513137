//! Session termination burst.
//!
//! Once the whole stream is acknowledged the sender announces the end of the
//! session by firing a fixed number of TEARDOWN packets at the receiver.
//! Nothing is expected back and nothing is retried; losing some of them is
//! fine as long as one gets through.

use std::net::SocketAddr;

use crate::packet::Packet;
use crate::socket::Transport;

/// Send `count` TEARDOWN packets to `dest`.
///
/// Send failures are logged and otherwise ignored.  Returns how many packets
/// the transport accepted in full.
pub async fn send_burst<T: Transport>(transport: &T, dest: SocketAddr, count: usize) -> usize {
    let bytes = Packet::teardown().encode();
    let mut delivered = 0;

    for i in 0..count {
        match transport.send_to(&bytes, dest).await {
            Ok(n) if n == bytes.len() => delivered += 1,
            Ok(n) => log::debug!("[gbn] teardown {i}: short write ({n} bytes)"),
            Err(e) => log::debug!("[gbn] teardown {i}: {e}"),
        }
    }

    log::debug!("[gbn] → TEARDOWN x{delivered}");
    delivered
}
