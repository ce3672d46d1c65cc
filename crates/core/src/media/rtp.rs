use rand::Rng;

/// Generic RTP fixed header builder (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Shared by all codec payloaders. It manages:
/// - **Sequence number**: 16-bit, wrapping, incremented on every packet.
/// - **Timestamp**: set by the caller once per access unit. The media source
///   computes it from presentation time, so the header never advances it.
/// - **SSRC**: fixed for the lifetime of the track.
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpHeader {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    sequence: u16,
    timestamp: u32,
}

pub const RTP_HEADER_LEN: usize = 12;

/// Pick a random SSRC.
///
/// Per RFC 3550 §8.1, the SSRC should be chosen randomly to minimize
/// the probability of collisions between independent sessions.
pub fn random_ssrc() -> u32 {
    rand::rng().random::<u32>()
}

impl RtpHeader {
    pub fn new(pt: u8, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP header state created"
        );
        Self {
            pt,
            ssrc,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Start numbering at `sequence` and stamping at `timestamp`.
    pub fn starting_at(mut self, sequence: u16, timestamp: u32) -> Self {
        self.sequence = sequence;
        self.timestamp = timestamp;
        self
    }

    /// Sequence number the next [`write`](Self::write) call will use.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Timestamp of the current access unit.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    /// Stamp subsequent packets with `timestamp`.
    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
    }

    /// Serialize a 12-byte RTP fixed header and advance the sequence number.
    ///
    /// The `marker` bit (RFC 3550 §5.1) signals the last packet of an access unit.
    pub fn write(&mut self, marker: bool) -> [u8; RTP_HEADER_LEN] {
        let first_byte: u8 = 2 << 6;
        let second_byte: u8 = ((marker as u8) << 7) | self.pt;

        let mut header = [0u8; RTP_HEADER_LEN];
        header[0] = first_byte;
        header[1] = second_byte;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Header followed by `payload` as one packet.
    pub fn packet(&mut self, marker: bool, payload: &[&[u8]]) -> Vec<u8> {
        let len = payload.iter().map(|p| p.len()).sum::<usize>();
        let mut packet = Vec::with_capacity(RTP_HEADER_LEN + len);
        packet.extend_from_slice(&self.write(marker));
        for part in payload {
            packet.extend_from_slice(part);
        }
        packet
    }
}
