//! Text surfaces a source exposes to an RTSP server.
//!
//! - [`sdp`]: per-track media descriptions (RFC 8866 §5.14) and a full
//!   session description wrapping them, served by DESCRIBE.
//! - [`rtp_info`]: the `RTP-Info` header value (RFC 2326 §12.33) returned
//!   by PLAY.

pub mod rtp_info;
pub mod sdp;

pub use rtp_info::RtpInfo;
pub use sdp::{SessionOrigin, TrackDescription, session_description};
