//! H.265 (HEVC) decoder configuration and RTP payloader (RFC 7798).
//!
//! Differences from H.264 (RFC 6184):
//!
//! - **2-byte NAL unit header**. The NAL type is in bits 1..6 of the first byte.
//! - **Fragmentation units** (§4.4.3): a 2-byte payload header with type 49,
//!   followed by a 1-byte FU header `[S|E|FuType(6)]`.
//! - **SDP attributes** (§7.1): parameter sets travel as `sprop-vps`,
//!   `sprop-sps` and `sprop-pps`.

use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::Payloader;
use super::h264::{Reader, extract_nal_units};
use super::rtp::RtpHeader;

pub const NAL_TYPE_VPS: u8 = 32;
pub const NAL_TYPE_SPS: u8 = 33;
pub const NAL_TYPE_PPS: u8 = 34;

const FU_TYPE: u8 = 49;

/// Fixed part of `hvcC` before the NAL unit arrays.
const HVCC_HEADER_LEN: usize = 22;

/// H.265 decoder configuration record (`hvcC`, ISO/IEC 14496-15 §8.3.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HevcDecoderConfig {
    pub length_size: usize,
    pub vps: Vec<Vec<u8>>,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl HevcDecoderConfig {
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < HVCC_HEADER_LEN + 1 {
            return Err("hvcC too short".into());
        }
        if data[0] != 1 {
            return Err(format!("unsupported hvcC version {}", data[0]));
        }

        let mut config = Self {
            length_size: ((data[HVCC_HEADER_LEN - 1] & 0x03) + 1) as usize,
            vps: Vec::new(),
            sps: Vec::new(),
            pps: Vec::new(),
        };

        let mut reader = Reader::new(&data[HVCC_HEADER_LEN..]);
        let num_arrays = reader.u8().ok_or("hvcC truncated at array count")?;
        for _ in 0..num_arrays {
            let nal_type = reader.u8().ok_or("hvcC truncated at array header")? & 0x3f;
            let count = reader.u16().ok_or("hvcC truncated at NAL count")? as usize;
            let sets = reader
                .parameter_sets(count)
                .ok_or("hvcC truncated in NAL array")?;
            match nal_type {
                NAL_TYPE_VPS => config.vps.extend(sets),
                NAL_TYPE_SPS => config.sps.extend(sets),
                NAL_TYPE_PPS => config.pps.extend(sets),
                _ => {}
            }
        }

        if config.vps.is_empty() || config.sps.is_empty() || config.pps.is_empty() {
            return Err("hvcC lacks VPS, SPS or PPS".into());
        }
        Ok(config)
    }

    /// Format parameters for the SDP `a=fmtp` attribute.
    pub fn fmtp(&self) -> String {
        let join = |sets: &[Vec<u8>]| {
            sets.iter()
                .map(|ps| BASE64_STANDARD.encode(ps))
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "sprop-vps={};sprop-sps={};sprop-pps={}",
            join(&self.vps),
            join(&self.sps),
            join(&self.pps)
        )
    }
}

/// H.265 RTP payloader: single NAL unit packets, FU fragmentation above the MTU.
#[derive(Debug)]
pub struct H265Payloader {
    header: RtpHeader,
    mtu: usize,
}

impl H265Payloader {
    pub fn new(header: RtpHeader, mtu: usize) -> Self {
        Self { header, mtu }
    }

    fn packetize_nal(&mut self, nal_unit: &[u8], is_last_nal: bool) -> Vec<Vec<u8>> {
        if nal_unit.len() < 2 {
            return Vec::new();
        }
        if nal_unit.len() <= self.mtu {
            return vec![self.header.packet(is_last_nal, &[nal_unit])];
        }

        let nal_type = (nal_unit[0] >> 1) & 0x3f;
        // Payload header keeps F, LayerId and TID; only the type changes.
        let payload_header = [(nal_unit[0] & 0x81) | (FU_TYPE << 1), nal_unit[1]];
        // 2-byte payload header + 1-byte FU header
        let max_fragment = self.mtu.saturating_sub(3).max(1);

        let mut packets = Vec::new();
        let mut chunks = nal_unit[2..].chunks(max_fragment).peekable();
        let mut first = true;
        while let Some(chunk) = chunks.next() {
            let last_fragment = chunks.peek().is_none();
            let mut fu_header = nal_type;
            if first {
                fu_header |= 0x80;
            }
            if last_fragment {
                fu_header |= 0x40;
            }
            packets.push(self.header.packet(
                is_last_nal && last_fragment,
                &[&payload_header[..], &[fu_header][..], chunk],
            ));
            first = false;
        }
        packets
    }
}

impl Payloader for H265Payloader {
    fn encode(&mut self, access_unit: &[u8], timestamp: u32) -> Vec<Vec<u8>> {
        self.header.set_timestamp(timestamp);

        let nal_units = extract_nal_units(access_unit);
        let mut packets = Vec::new();
        for (i, nal) in nal_units.iter().enumerate() {
            packets.append(&mut self.packetize_nal(nal, i + 1 == nal_units.len()));
        }

        tracing::trace!(
            nal_count = nal_units.len(),
            rtp_packets = packets.len(),
            ts = timestamp,
            "H.265 access unit packetized"
        );
        packets
    }

    fn sequence_state(&self) -> (u16, u32) {
        (self.header.sequence(), self.header.timestamp())
    }
}
