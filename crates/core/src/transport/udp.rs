use std::io;
use std::net::{SocketAddr, UdpSocket};

use super::DatagramSink;
use crate::error::Result;

/// UDP transport for outbound RTP and RTCP delivery.
///
/// Binds a single socket and sends to whatever address the track binding
/// resolved. It knows nothing about tracks or sessions.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind an ephemeral UDP socket.
    pub fn bind() -> Result<Self> {
        Self::bind_to("0.0.0.0:0")
    }

    /// Bind to an explicit local address (e.g. the advertised server port).
    pub fn bind_to(addr: &str) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        tracing::debug!(local = ?socket.local_addr().ok(), "UDP transport bound");
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramSink for UdpTransport {
    fn send_to(&self, payload: &[u8], addr: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(payload, addr)
    }
}
