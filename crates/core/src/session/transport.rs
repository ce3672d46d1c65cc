use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use crate::error::{Result, SourceError};
use crate::transport::DatagramSink;

/// Destination of one packet stream: a resolved address and the socket used to reach it.
#[derive(Clone)]
pub struct Endpoint {
    pub addr: SocketAddr,
    pub socket: Arc<dyn DatagramSink>,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("addr", &self.addr).finish()
    }
}

impl Endpoint {
    /// Best-effort send. Failures are logged and otherwise ignored.
    pub fn send(&self, payload: &[u8]) {
        if let Err(e) = self.socket.send_to(payload, self.addr) {
            tracing::warn!(addr = %self.addr, error = %e, "datagram send failed");
        }
    }
}

/// RTP and RTCP destinations of a track, set by
/// [`MediaSource::bind_track_transport`](super::MediaSource::bind_track_transport).
///
/// ## Example binding
///
/// ```text
/// Transport: RTP/AVP;unicast;client_port=8000-8001
///   track1 -> rtp 192.0.2.7:8000, rtcp 192.0.2.7:8001
/// ```
#[derive(Debug, Clone)]
pub struct TrackTransport {
    pub rtp: Endpoint,
    pub rtcp: Endpoint,
}

impl TrackTransport {
    /// Resolve `address` for both ports, sharing one socket.
    pub fn resolve(
        address: &str,
        rtp_port: u16,
        rtcp_port: u16,
        socket: Arc<dyn DatagramSink>,
    ) -> Result<Self> {
        let rtp = resolve(address, rtp_port)?;
        let rtcp = resolve(address, rtcp_port)?;
        Ok(Self {
            rtp: Endpoint {
                addr: rtp,
                socket: socket.clone(),
            },
            rtcp: Endpoint { addr: rtcp, socket },
        })
    }
}

/// Resolve `address:port` to the first socket address it names.
pub fn resolve(address: &str, port: u16) -> Result<SocketAddr> {
    let unresolved = || SourceError::AddressResolution {
        address: address.to_string(),
        port,
    };
    (address, port)
        .to_socket_addrs()
        .map_err(|e| {
            tracing::debug!(address, port, error = %e, "address lookup failed");
            unresolved()
        })?
        .next()
        .ok_or_else(unresolved)
}

/// Stream index named by a track control label.
///
/// Accepts the bare label advertised in `a=control` or a full control URL
/// ending in it.
///
/// ```
/// use media_source::session::transport::track_index;
///
/// assert_eq!(track_index("track1"), Some(1));
/// assert_eq!(track_index("rtsp://host/movie.mp4/track0"), Some(0));
/// assert_eq!(track_index("audio"), None);
/// ```
pub fn track_index(label: &str) -> Option<usize> {
    let last = label.trim().trim_end_matches('/').rsplit('/').next()?;
    last.strip_prefix("track")?.parse().ok()
}
