//! SDP (Session Description Protocol) generation (RFC 8866).
//!
//! Every playable track contributes one media description:
//!
//! ```text
//! m=video 0 RTP/AVP 96                          ← media, port 0, payload type
//! a=rtpmap:96 H264/90000                        ← encoding/clock[/channels]
//! a=fmtp:96 profile-level-id=...                ← codec parameters
//! a=control:track0                              ← per-track control label
//! ```
//!
//! [`session_description`] wraps the concatenated media descriptions in the
//! session-level lines an RTSP server returns from DESCRIBE.

use crate::demux::{StreamInfo, StreamKind};
use crate::error::{Result, SourceError};
use crate::media::h264::AvcDecoderConfig;
use crate::media::h265::HevcDecoderConfig;
use crate::media::opus::OPUS_CLOCK_RATE;
use crate::media::{TransportCodec, aac, opus};

/// Stored NAL units must use 4-byte length prefixes.
const SUPPORTED_LENGTH_SIZE: usize = 4;

const VIDEO_CLOCK_RATE: u32 = 90000;

/// Transport description of one playable stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackDescription {
    pub stream_index: usize,
    pub codec: TransportCodec,
    pub payload_type: u8,
    pub clock_rate: u32,
    /// Channel count appended to `a=rtpmap` for audio.
    pub channels: Option<u16>,
    pub fmtp: String,
}

impl TrackDescription {
    /// Map a demuxed stream to its transport description.
    ///
    /// Fails with [`SourceError::UnsupportedCodec`] when the codec has no
    /// transport mapping, and [`SourceError::InvalidDecoderConfig`] when
    /// its out-of-band configuration cannot be used.
    pub fn from_stream(info: &StreamInfo) -> Result<Self> {
        let stream = info.index;
        let unsupported = || SourceError::UnsupportedCodec {
            stream,
            codec: info.codec.clone(),
        };
        let invalid = |reason: String| SourceError::InvalidDecoderConfig { stream, reason };

        let codec = TransportCodec::from_codec(&info.codec).ok_or_else(unsupported)?;
        let (clock_rate, channels, fmtp) = match (codec, &info.kind) {
            (TransportCodec::H264, StreamKind::Video { .. }) => {
                let config = AvcDecoderConfig::parse(&info.extradata).map_err(invalid)?;
                check_length_size(config.length_size).map_err(invalid)?;
                (VIDEO_CLOCK_RATE, None, config.fmtp())
            }
            (TransportCodec::H265, StreamKind::Video { .. }) => {
                let config = HevcDecoderConfig::parse(&info.extradata).map_err(invalid)?;
                check_length_size(config.length_size).map_err(invalid)?;
                (VIDEO_CLOCK_RATE, None, config.fmtp())
            }
            (
                TransportCodec::Mpeg4Generic,
                StreamKind::Audio {
                    channels,
                    sample_rate,
                    ..
                },
            ) => {
                if info.extradata.is_empty() {
                    return Err(invalid("missing AudioSpecificConfig".into()));
                }
                if *sample_rate == 0 {
                    return Err(invalid("zero sample rate".into()));
                }
                (*sample_rate, Some(*channels), aac::fmtp(&info.extradata))
            }
            // RFC 7587 §7: always opus/48000/2, stereo signalled in fmtp.
            (TransportCodec::Opus, StreamKind::Audio { channels, .. }) => {
                (OPUS_CLOCK_RATE, Some(2), opus::fmtp(*channels))
            }
            _ => return Err(unsupported()),
        };

        Ok(Self {
            stream_index: stream,
            codec,
            payload_type: codec.payload_type(),
            clock_rate,
            channels,
            fmtp,
        })
    }

    /// Control label advertised in `a=control` and accepted by transport binding.
    pub fn control(&self) -> String {
        format!("track{}", self.stream_index)
    }

    /// The media description block, each line CRLF terminated.
    pub fn media_description(&self) -> String {
        let media = if self.codec.is_video() {
            "video"
        } else {
            "audio"
        };
        let pt = self.payload_type;

        let mut rtpmap = format!("{}/{}", self.codec.encoding_name(), self.clock_rate);
        if let Some(channels) = self.channels {
            rtpmap.push_str(&format!("/{channels}"));
        }

        let lines = [
            format!("m={media} 0 RTP/AVP {pt}"),
            format!("a=rtpmap:{pt} {rtpmap}"),
            format!("a=fmtp:{pt} {}", self.fmtp),
            format!("a=control:{}", self.control()),
        ];
        lines.iter().map(|line| format!("{line}\r\n")).collect()
    }
}

fn check_length_size(length_size: usize) -> std::result::Result<(), String> {
    if length_size == SUPPORTED_LENGTH_SIZE {
        Ok(())
    } else {
        Err(format!("unsupported NAL length size {length_size}"))
    }
}

/// Session-level fields of a full session description.
#[derive(Debug, Clone)]
pub struct SessionOrigin {
    /// Address advertised in `o=` and `c=`.
    pub address: String,
    /// `o=<username> ...`
    pub username: String,
    pub session_id: String,
    pub session_version: String,
    /// `s=`
    pub session_name: String,
}

impl Default for SessionOrigin {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            username: "-".to_string(),
            session_id: "0".to_string(),
            session_version: "0".to_string(),
            session_name: "Stream".to_string(),
        }
    }
}

/// Full SDP body: session-level lines, `a=range` for the media duration,
/// then the per-track `media` descriptions unchanged.
pub fn session_description(origin: &SessionOrigin, duration_ms: u64, media: &str) -> String {
    let mut sdp: Vec<String> = vec![
        "v=0".to_string(),
        format!(
            "o={} {} {} IN IP4 {}",
            origin.username, origin.session_id, origin.session_version, origin.address
        ),
        format!("s={}", origin.session_name),
        format!("c=IN IP4 {}", origin.address),
        "t=0 0".to_string(),
        "a=tool:rtsp-media-source".to_string(),
        "a=sendonly".to_string(),
    ];
    if duration_ms > 0 {
        sdp.push(format!(
            "a=range:npt=0-{}.{:03}",
            duration_ms / 1000,
            duration_ms % 1000
        ));
    }

    let mut body = sdp.join("\r\n");
    body.push_str("\r\n");
    body.push_str(media);
    tracing::debug!("SDP: {}", body);
    body
}
