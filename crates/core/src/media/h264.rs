use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::Payloader;
use super::rtp::RtpHeader;

pub const NAL_TYPE_IDR: u8 = 5;
pub const NAL_TYPE_SEI: u8 = 6;
pub const NAL_TYPE_SPS: u8 = 7;
pub const NAL_TYPE_PPS: u8 = 8;
pub const NAL_TYPE_AUD: u8 = 9;

/// H.264 decoder configuration record (`avcC`, ISO/IEC 14496-15 §5.3.3).
///
/// ```text
/// version(1) profile(1) compatibility(1) level(1)
/// 0xFC | lengthSizeMinusOne(1)
/// 0xE0 | numSps(1)  { len(2) sps }*
/// numPps(1)         { len(2) pps }*
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcDecoderConfig {
    pub profile: u8,
    pub compatibility: u8,
    pub level: u8,
    /// Size in bytes of the NAL length prefix used in stored samples.
    pub length_size: usize,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvcDecoderConfig {
    pub fn parse(data: &[u8]) -> Result<Self, String> {
        if data.len() < 7 {
            return Err("avcC too short".into());
        }
        if data[0] != 1 {
            return Err(format!("unsupported avcC version {}", data[0]));
        }

        let mut reader = Reader::new(&data[5..]);
        let num_sps = reader.u8().ok_or("avcC truncated at SPS count")? & 0x1f;
        let sps = reader
            .parameter_sets(num_sps as usize)
            .ok_or("avcC truncated in SPS")?;
        let num_pps = reader.u8().ok_or("avcC truncated at PPS count")?;
        let pps = reader
            .parameter_sets(num_pps as usize)
            .ok_or("avcC truncated in PPS")?;

        if sps.is_empty() && pps.is_empty() {
            return Err("avcC carries no parameter sets".into());
        }

        Ok(Self {
            profile: data[1],
            compatibility: data[2],
            level: data[3],
            length_size: ((data[4] & 0x03) + 1) as usize,
            sps,
            pps,
        })
    }

    /// Build a record with 4-byte length prefixes from raw SPS/PPS NAL units.
    ///
    /// Profile, compatibility and level are taken from SPS bytes 1..4.
    pub fn from_parameter_sets(sps: Vec<u8>, pps: Vec<u8>) -> Result<Self, String> {
        if sps.len() < 4 {
            return Err("SPS too short for profile-level-id".into());
        }
        Ok(Self {
            profile: sps[1],
            compatibility: sps[2],
            level: sps[3],
            length_size: 4,
            sps: vec![sps],
            pps: vec![pps],
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![
            1,
            self.profile,
            self.compatibility,
            self.level,
            0xfc | (self.length_size.saturating_sub(1) as u8 & 0x03),
            0xe0 | (self.sps.len() as u8 & 0x1f),
        ];
        for sps in &self.sps {
            out.extend_from_slice(&(sps.len() as u16).to_be_bytes());
            out.extend_from_slice(sps);
        }
        out.push(self.pps.len() as u8);
        for pps in &self.pps {
            out.extend_from_slice(&(pps.len() as u16).to_be_bytes());
            out.extend_from_slice(pps);
        }
        out
    }

    /// `profile-level-id` (RFC 6184 §8.1): profile_idc, constraint flags, level_idc.
    pub fn profile_level_id(&self) -> String {
        format!(
            "{:02X}{:02X}{:02X}",
            self.profile, self.compatibility, self.level
        )
    }

    /// `sprop-parameter-sets`: base64 SPS list followed by base64 PPS list.
    pub fn sprop_parameter_sets(&self) -> String {
        self.sps
            .iter()
            .chain(self.pps.iter())
            .map(|ps| BASE64_STANDARD.encode(ps))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Format parameters for the SDP `a=fmtp` attribute (without the `a=fmtp:<pt> ` prefix).
    pub fn fmtp(&self) -> String {
        format!(
            "profile-level-id={};packetization-mode=1;sprop-parameter-sets={}",
            self.profile_level_id(),
            self.sprop_parameter_sets()
        )
    }
}

/// Cursor over big-endian configuration records.
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    pub(crate) fn u16(&mut self) -> Option<u16> {
        let bytes = self.bytes(2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    /// `count` entries of `len(2) data`.
    pub(crate) fn parameter_sets(&mut self, count: usize) -> Option<Vec<Vec<u8>>> {
        (0..count)
            .map(|_| {
                let len = self.u16()? as usize;
                self.bytes(len).map(<[u8]>::to_vec)
            })
            .collect()
    }
}

/// Extract NAL units from an Annex B bitstream.
///
/// Scans for start codes (both 4-byte `00 00 00 01` and 3-byte
/// `00 00 01`) and returns the NAL data between them, excluding
/// the start codes themselves.
///
/// The start code length is tracked per-NAL to ensure boundaries
/// between adjacent NALs are computed correctly when mixed 3-byte
/// and 4-byte start codes appear.
pub fn extract_nal_units(data: &[u8]) -> Vec<&[u8]> {
    let mut i = 0usize;

    // (nal_data_start_index, start_code_length)
    let mut start_entries: Vec<(usize, usize)> = Vec::new();

    while i < data.len() {
        if i + 3 < data.len() && data[i..i + 4] == [0, 0, 0, 1] {
            start_entries.push((i + 4, 4));
            i += 4;
        } else if i + 2 < data.len() && data[i..i + 3] == [0, 0, 1] {
            start_entries.push((i + 3, 3));
            i += 3;
        } else {
            i += 1;
        }
    }

    let mut nal_units = Vec::with_capacity(start_entries.len());
    for (idx, &(start, _)) in start_entries.iter().enumerate() {
        let end = match start_entries.get(idx + 1) {
            Some(&(next_start, next_sc_len)) => next_start - next_sc_len,
            None => data.len(),
        };

        if start < end {
            nal_units.push(&data[start..end]);
        }
    }

    nal_units
}

/// H.264 RTP payloader (RFC 6184).
///
/// Accepts Annex B access units and supports two packetization modes:
///
/// - **Single NAL Unit** (§5.6): NALs that fit within the MTU are sent
///   as-is in a single RTP packet (12-byte header + NAL bytes).
///
/// - **FU-A Fragmentation** (§5.8): NALs exceeding the MTU are split
///   across multiple RTP packets. Each fragment carries a 2-byte FU
///   header (FU indicator + FU header) before the NAL payload:
///
///   ```text
///   FU indicator:  [F|NRI|Type=28]     (1 byte)
///   FU header:     [S|E|R|NAL_Type]    (1 byte)
///   Fragment data: [...]               (up to MTU - 2 bytes)
///   ```
///
/// Per RFC 6184 §5.1, the marker bit is set on the last RTP packet
/// of an access unit.
#[derive(Debug)]
pub struct H264Payloader {
    header: RtpHeader,
    mtu: usize,
}

impl H264Payloader {
    pub fn new(header: RtpHeader, mtu: usize) -> Self {
        Self { header, mtu }
    }

    fn packetize_nal(&mut self, nal_unit: &[u8], is_last_nal: bool) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();

        if nal_unit.is_empty() {
            return packets;
        }

        if nal_unit.len() <= self.mtu {
            packets.push(self.header.packet(is_last_nal, &[nal_unit]));
        } else {
            let nal_header = nal_unit[0];
            let nal_type = nal_header & 0x1f;
            let nri = nal_header & 0x60;

            let fu_indicator = nri | 28;
            let payload = &nal_unit[1..];

            // 2 bytes for FU indicator + FU header
            let max_fragment = self.mtu.saturating_sub(2).max(1);
            let mut chunks = payload.chunks(max_fragment).peekable();
            let mut first = true;

            while let Some(chunk) = chunks.next() {
                let last_fragment = chunks.peek().is_none();

                let start_bit = if first { 0x80 } else { 0x00 };
                let end_bit = if last_fragment { 0x40 } else { 0x00 };
                let fu_header = start_bit | end_bit | nal_type;

                let marker = is_last_nal && last_fragment;
                packets.push(
                    self.header
                        .packet(marker, &[&[fu_indicator, fu_header][..], chunk]),
                );
                first = false;
            }

            tracing::trace!(
                nal_type,
                nal_size = nal_unit.len(),
                fragments = packets.len(),
                "FU-A fragmented NAL unit"
            );
        }

        packets
    }
}

impl Payloader for H264Payloader {
    fn encode(&mut self, access_unit: &[u8], timestamp: u32) -> Vec<Vec<u8>> {
        self.header.set_timestamp(timestamp);

        let nal_units = extract_nal_units(access_unit);
        let mut packets = Vec::new();
        for (i, nal) in nal_units.iter().enumerate() {
            let is_last = i + 1 == nal_units.len();
            packets.append(&mut self.packetize_nal(nal, is_last));
        }

        tracing::trace!(
            nal_count = nal_units.len(),
            rtp_packets = packets.len(),
            frame_bytes = access_unit.len(),
            seq = self.header.sequence(),
            ts = timestamp,
            "H.264 access unit packetized"
        );

        packets
    }

    fn sequence_state(&self) -> (u16, u32) {
        (self.header.sequence(), self.header.timestamp())
    }
}
