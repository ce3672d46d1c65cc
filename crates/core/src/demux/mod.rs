//! Container demultiplexing seam.
//!
//! The media source never parses containers itself. A [`Demuxer`] reports
//! the streams of a file once, then yields packets in file order with
//! timestamps already normalized to milliseconds.
//!
//! [`annexb`] provides a demuxer for raw H.264 elementary stream files.

pub mod annexb;

use std::path::Path;

use crate::error::Result;
use crate::media::CodecId;

/// Media type and shape of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamKind {
    Video {
        width: u32,
        height: u32,
    },
    Audio {
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    },
}

/// One stream of the opened file.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    /// Stream index, also the index carried by every [`DemuxPacket`].
    pub index: usize,
    pub kind: StreamKind,
    pub codec: CodecId,
    /// Out-of-band decoder configuration (avcC, hvcC, AudioSpecificConfig).
    pub extradata: Vec<u8>,
}

/// One demuxed access unit in storage framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemuxPacket {
    pub stream_index: usize,
    /// Presentation timestamp in milliseconds.
    pub pts_ms: i64,
    /// Decode timestamp in milliseconds.
    pub dts_ms: i64,
    pub data: Vec<u8>,
}

impl DemuxPacket {
    /// Build a packet where either timestamp may be missing; the missing one
    /// falls back to the other, and both missing means zero.
    pub fn with_timestamps(
        stream_index: usize,
        pts_ms: Option<i64>,
        dts_ms: Option<i64>,
        data: Vec<u8>,
    ) -> Self {
        let pts = pts_ms.or(dts_ms).unwrap_or(0);
        let dts = dts_ms.or(pts_ms).unwrap_or(0);
        Self {
            stream_index,
            pts_ms: pts,
            dts_ms: dts,
            data,
        }
    }
}

/// Reads packets from an opened media file.
pub trait Demuxer: Send {
    /// Streams found at open time. Never changes afterwards.
    fn streams(&self) -> &[StreamInfo];

    /// Next packet in file order, or `None` at end of stream.
    fn read_next(&mut self) -> Result<Option<DemuxPacket>>;

    /// Reposition so the next packet read is at or before `position_ms`.
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Total media duration in milliseconds.
    fn duration_ms(&self) -> u64;
}

/// A demuxer that can open a file by path.
pub trait OpenDemuxer: Demuxer + Sized + 'static {
    fn open(path: &Path) -> Result<Self>;
}
