//! RTCP sender reporting (RFC 3550 §6).
//!
//! Two layers:
//!
//! - An [`RtcpReporter`] owns the per-track statistics, encodes sender
//!   reports and BYE packets, and computes the reporting interval.
//!   [`report::RtcpSession`] is the built-in implementation.
//! - The [`scheduler::RtcpScheduler`] decides *when* to ask the reporter for
//!   a packet, coupled to actual RTP transmissions.

pub mod report;
pub mod scheduler;

pub use report::{RtcpSession, RtcpSessionFactory};
pub use scheduler::RtcpScheduler;

use crate::error::Result;

/// Construction parameters handed to an [`RtcpFactory`].
#[derive(Debug, Clone)]
pub struct RtcpParams {
    pub ssrc: u32,
    pub clock_rate: u32,
    /// Session bandwidth in bits per second.
    pub bandwidth: u32,
    /// SDES CNAME item.
    pub cname: String,
    /// SDES NAME item (typically the file name).
    pub name: String,
}

/// Per-track RTCP state.
pub trait RtcpReporter: Send {
    /// Account for one RTP packet handed to the transport at `now_ms`.
    fn on_send(&mut self, packet: &[u8], now_ms: u64);

    /// Encode a sender report compound packet.
    fn sender_report(&mut self, now_ms: u64) -> Result<Vec<u8>>;

    /// Encode a BYE packet.
    fn bye(&mut self) -> Result<Vec<u8>>;

    /// Minimum time until the next report, in milliseconds.
    fn report_interval_ms(&mut self) -> u64;
}

/// Creates reporters for tracks at enumeration time.
pub trait RtcpFactory: Send {
    fn create(&self, params: &RtcpParams) -> Box<dyn RtcpReporter>;
}
