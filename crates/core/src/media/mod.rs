//! Codecs, bitstream reformatting and RTP payloaders.
//!
//! A stored access unit goes through two steps before it reaches the wire:
//!
//! 1. [`bitstream::to_transport`] rewrites the storage framing into the
//!    framing the payloader expects (length prefixes become start codes for
//!    NAL-unit codecs, everything else passes through).
//! 2. A [`Payloader`] splits the unit into RTP packets stamped with the
//!    timestamp computed by the session.
//!
//! ## Supported codecs
//!
//! | Container codec | Transport | RFC | PT | Clock |
//! |-----------------|-----------|-----|----|-------|
//! | H.264 | `H264` ([`h264`]) | [RFC 6184](https://tools.ietf.org/html/rfc6184) | 96 | 90000 |
//! | H.265 | `H265` ([`h265`]) | [RFC 7798](https://tools.ietf.org/html/rfc7798) | 96 | 90000 |
//! | AAC | `MPEG4-GENERIC` ([`aac`]) | [RFC 3640](https://tools.ietf.org/html/rfc3640) | 97 | sample rate |
//! | Opus | `opus` ([`opus`]) | [RFC 7587](https://tools.ietf.org/html/rfc7587) | 98 | 48000 |

pub mod aac;
pub mod bitstream;
pub mod h264;
pub mod h265;
pub mod opus;
pub mod rtp;

use std::fmt;

/// Codec identifier as reported by the demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecId {
    H264,
    Hevc,
    Aac,
    Opus,
    Mpeg4Video,
    Other(String),
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "h264"),
            Self::Hevc => write!(f, "hevc"),
            Self::Aac => write!(f, "aac"),
            Self::Opus => write!(f, "opus"),
            Self::Mpeg4Video => write!(f, "mpeg4"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Codec as carried over RTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCodec {
    H264,
    H265,
    Mpeg4Generic,
    Opus,
}

impl TransportCodec {
    /// Map a container codec to its transport codec, if one is supported.
    pub fn from_codec(codec: &CodecId) -> Option<Self> {
        match codec {
            CodecId::H264 => Some(Self::H264),
            CodecId::Hevc => Some(Self::H265),
            CodecId::Aac => Some(Self::Mpeg4Generic),
            CodecId::Opus => Some(Self::Opus),
            CodecId::Mpeg4Video | CodecId::Other(_) => None,
        }
    }

    /// Encoding name for the SDP `a=rtpmap` attribute.
    pub fn encoding_name(self) -> &'static str {
        match self {
            Self::H264 => "H264",
            Self::H265 => "H265",
            Self::Mpeg4Generic => "MPEG4-GENERIC",
            Self::Opus => "opus",
        }
    }

    /// Dynamic RTP payload type (RFC 3551 §6) negotiated for this codec.
    pub fn payload_type(self) -> u8 {
        match self {
            Self::H264 | Self::H265 => 96,
            Self::Mpeg4Generic => 97,
            Self::Opus => 98,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, Self::H264 | Self::H265)
    }

    /// Whether stored access units are 4-byte length-prefixed NAL records.
    pub fn is_length_prefixed(self) -> bool {
        self.is_video()
    }
}

/// Construction parameters handed to a [`PayloaderFactory`].
#[derive(Debug, Clone)]
pub struct PayloadParams {
    pub codec: TransportCodec,
    pub payload_type: u8,
    pub ssrc: u32,
    pub initial_sequence: u16,
    pub initial_timestamp: u32,
    /// Largest RTP payload (excluding the 12-byte header) a packet may carry.
    pub mtu: usize,
}

/// Codec-specific RTP payloader.
///
/// Turns one access unit, already in transport framing, into complete RTP
/// packets: 12-byte header (RFC 3550 §5.1) followed by the codec payload.
/// Every returned packet is owned by the caller.
pub trait Payloader: Send {
    /// Packetize `access_unit`, stamping every packet with `timestamp`.
    fn encode(&mut self, access_unit: &[u8], timestamp: u32) -> Vec<Vec<u8>>;

    /// Next sequence number and last RTP timestamp (for the `RTP-Info` header).
    fn sequence_state(&self) -> (u16, u32);

    /// Largest access unit the payload format can carry, if bounded.
    fn max_unit_size(&self) -> Option<usize> {
        None
    }
}

/// Creates payloaders for tracks at enumeration time.
pub trait PayloaderFactory: Send {
    fn create(&self, params: &PayloadParams) -> Box<dyn Payloader>;
}

/// Factory for the built-in payloaders of this module.
#[derive(Debug, Default, Clone, Copy)]
pub struct RtpPayloaderFactory;

impl PayloaderFactory for RtpPayloaderFactory {
    fn create(&self, params: &PayloadParams) -> Box<dyn Payloader> {
        let header = rtp::RtpHeader::new(params.payload_type, params.ssrc)
            .starting_at(params.initial_sequence, params.initial_timestamp);
        match params.codec {
            TransportCodec::H264 => Box::new(h264::H264Payloader::new(header, params.mtu)),
            TransportCodec::H265 => Box::new(h265::H265Payloader::new(header, params.mtu)),
            TransportCodec::Mpeg4Generic => Box::new(aac::AacPayloader::new(header)),
            TransportCodec::Opus => Box::new(opus::OpusPayloader::new(header)),
        }
    }
}
