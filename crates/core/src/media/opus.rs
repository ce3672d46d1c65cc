//! Opus over RTP (RFC 7587): one Opus packet per RTP packet, 48 kHz clock.

use super::Payloader;
use super::rtp::RtpHeader;

pub const OPUS_CLOCK_RATE: u32 = 48000;

/// Format parameters for the SDP `a=fmtp` attribute.
pub fn fmtp(channels: u16) -> String {
    format!("sprop-stereo={}", u8::from(channels > 1))
}

#[derive(Debug)]
pub struct OpusPayloader {
    header: RtpHeader,
}

impl OpusPayloader {
    pub fn new(header: RtpHeader) -> Self {
        Self { header }
    }
}

impl Payloader for OpusPayloader {
    fn encode(&mut self, access_unit: &[u8], timestamp: u32) -> Vec<Vec<u8>> {
        self.header.set_timestamp(timestamp);
        if access_unit.is_empty() {
            return Vec::new();
        }
        vec![self.header.packet(false, &[access_unit])]
    }

    fn sequence_state(&self) -> (u16, u32) {
        (self.header.sequence(), self.header.timestamp())
    }
}
