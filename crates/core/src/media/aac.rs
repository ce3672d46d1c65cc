//! AAC over RTP in `MPEG4-GENERIC` AAC-hbr mode (RFC 3640 §3.3.6).
//!
//! Each packet carries one access unit behind an AU header section:
//!
//! ```text
//! AU-headers-length(16) = 16 bits
//! AU-size(13) | AU-Index(3)
//! AU data
//! ```

use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::Payloader;
use super::rtp::RtpHeader;

/// Largest access unit expressible in a 13-bit AU-size field.
pub const MAX_AU_SIZE: usize = (1 << 13) - 1;

/// Format parameters for the SDP `a=fmtp` attribute.
///
/// `config` is the AudioSpecificConfig from the container, base64 encoded.
pub fn fmtp(audio_specific_config: &[u8]) -> String {
    format!(
        "streamType=5;profile-level-id=1;mode=AAC-hbr;sizelength=13;indexlength=3;indexdeltalength=3;config={}",
        BASE64_STANDARD.encode(audio_specific_config)
    )
}

#[derive(Debug)]
pub struct AacPayloader {
    header: RtpHeader,
}

impl AacPayloader {
    pub fn new(header: RtpHeader) -> Self {
        Self { header }
    }
}

impl Payloader for AacPayloader {
    fn encode(&mut self, access_unit: &[u8], timestamp: u32) -> Vec<Vec<u8>> {
        self.header.set_timestamp(timestamp);

        if access_unit.is_empty() {
            return Vec::new();
        }
        if access_unit.len() > MAX_AU_SIZE {
            tracing::debug!(size = access_unit.len(), "AAC access unit exceeds 13-bit AU-size");
            return Vec::new();
        }

        let size = access_unit.len() as u16;
        let au_header = [0x00, 0x10, (size >> 5) as u8, ((size & 0x1f) << 3) as u8];
        vec![self.header.packet(true, &[&au_header[..], access_unit])]
    }

    fn sequence_state(&self) -> (u16, u32) {
        (self.header.sequence(), self.header.timestamp())
    }

    fn max_unit_size(&self) -> Option<usize> {
        Some(MAX_AU_SIZE)
    }
}
