//! Error types for the media source library.

use std::fmt;

use crate::media::CodecId;

/// Errors that can occur while opening, describing or driving a media source.
///
/// Variants fall into the categories reported by [`SourceError::category`]:
///
/// - **Configuration**: [`UnsupportedCodec`](Self::UnsupportedCodec),
///   [`InvalidDecoderConfig`](Self::InvalidDecoderConfig),
///   [`NotInitialized`](Self::NotInitialized), [`NoTracks`](Self::NoTracks).
/// - **I/O**: [`Io`](Self::Io), [`Demux`](Self::Demux),
///   [`SeekOutOfRange`](Self::SeekOutOfRange).
/// - **Protocol**: [`UnknownTrack`](Self::UnknownTrack),
///   [`AddressResolution`](Self::AddressResolution), [`Rtcp`](Self::Rtcp).
/// - **Resource exhaustion**: [`FrameTooLarge`](Self::FrameTooLarge),
///   [`UnitTooLarge`](Self::UnitTooLarge),
///   [`MalformedAccessUnit`](Self::MalformedAccessUnit).
/// - **State**: [`InvalidState`](Self::InvalidState), [`InvalidSpeed`](Self::InvalidSpeed).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Underlying file or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The demuxer failed to read or seek for a reason other than plain I/O.
    #[error("demux error: {0}")]
    Demux(String),

    /// [`crate::init`] was not called before the first source was created.
    #[error("library not initialized, call media_source::init() first")]
    NotInitialized,

    /// The container codec of a stream has no transport mapping.
    #[error("stream {stream}: unsupported codec {codec}")]
    UnsupportedCodec { stream: usize, codec: CodecId },

    /// Out-of-band decoder configuration (avcC, hvcC, AudioSpecificConfig) is unusable.
    #[error("stream {stream}: invalid decoder configuration: {reason}")]
    InvalidDecoderConfig { stream: usize, reason: String },

    /// Every stream of the file failed configuration.
    #[error("no playable tracks in {0}")]
    NoTracks(String),

    /// Seek target lies beyond the end of the media.
    #[error("seek target {target_ms} ms beyond duration {duration_ms} ms")]
    SeekOutOfRange { target_ms: u64, duration_ms: u64 },

    /// Track identifier did not resolve to a configured track.
    #[error("unknown track: {0}")]
    UnknownTrack(String),

    /// Destination address could not be resolved to a socket address.
    #[error("cannot resolve {address}:{port}")]
    AddressResolution { address: String, port: u16 },

    /// An RTP packet produced for an access unit does not fit the track's scratch buffer.
    #[error("track {track}: {size} byte packet exceeds {capacity} byte buffer, unit dropped")]
    FrameTooLarge {
        track: usize,
        size: usize,
        capacity: usize,
    },

    /// The payload format cannot carry an access unit this large (e.g. the
    /// 13-bit AAC AU-size field).
    #[error("track {track}: {size} byte access unit exceeds the {limit} byte payload limit, unit dropped")]
    UnitTooLarge {
        track: usize,
        size: usize,
        limit: usize,
    },

    /// Length-prefixed access unit whose records overrun its own length.
    #[error("track {track}: malformed access unit at offset {offset}")]
    MalformedAccessUnit { track: usize, offset: usize },

    /// An RTCP packet could not be encoded.
    #[error("RTCP encoding failed: {0}")]
    Rtcp(String),

    /// Operation not allowed in the current session state.
    #[error("operation {operation} not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::session::SessionState,
    },

    /// Playback speed must be finite and positive.
    #[error("invalid playback speed: {0}")]
    InvalidSpeed(f64),
}

/// Broad failure class of a [`SourceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Io,
    Protocol,
    ResourceExhaustion,
    State,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Io => write!(f, "io"),
            Self::Protocol => write!(f, "protocol"),
            Self::ResourceExhaustion => write!(f, "resource exhaustion"),
            Self::State => write!(f, "state"),
        }
    }
}

impl SourceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedCodec { .. }
            | Self::InvalidDecoderConfig { .. }
            | Self::NotInitialized
            | Self::NoTracks(_) => ErrorCategory::Configuration,
            Self::Io(_) | Self::Demux(_) | Self::SeekOutOfRange { .. } => ErrorCategory::Io,
            Self::UnknownTrack(_) | Self::AddressResolution { .. } | Self::Rtcp(_) => {
                ErrorCategory::Protocol
            }
            Self::FrameTooLarge { .. }
            | Self::UnitTooLarge { .. }
            | Self::MalformedAccessUnit { .. } => ErrorCategory::ResourceExhaustion,
            Self::InvalidState { .. } | Self::InvalidSpeed(_) => ErrorCategory::State,
        }
    }

    /// Whether playback can continue by calling [`play`](crate::MediaSource::play) again.
    ///
    /// The offending access unit has already been discarded.
    pub fn is_recoverable(&self) -> bool {
        self.category() == ErrorCategory::ResourceExhaustion
    }
}

/// Convenience alias for `Result<T, SourceError>`.
pub type Result<T> = std::result::Result<T, SourceError>;
