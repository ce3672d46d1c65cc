//! Datagram delivery for RTP and RTCP.
//!
//! Delivery is best effort: one `send_to` per packet, no retry, no
//! congestion control. The media source resolves track bindings to socket
//! addresses before calling [`DatagramSink::send_to`].
//!
//! - [`udp`]: a bound UDP socket, the production sink.
//! - [`memory`]: records every datagram, for tests and loopback tooling.

pub mod memory;
pub mod udp;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

pub use memory::RecordingSink;
pub use udp::UdpTransport;

/// Unreliable datagram sender.
pub trait DatagramSink: Send + Sync {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize>;
}

impl<T: DatagramSink + ?Sized> DatagramSink for Arc<T> {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize> {
        (**self).send_to(payload, addr)
    }
}
