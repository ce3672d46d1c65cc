//! Demuxer for raw H.264 Annex B elementary stream files (`.h264`, `.264`).
//!
//! Raw streams carry no timing, so access units are stamped at a fixed frame
//! rate. Units are re-framed into 4-byte length-prefixed records, the same
//! storage framing an MP4 demuxer would deliver, and the first SPS/PPS pair
//! becomes the `avcC` decoder configuration of the single video stream.

use std::path::Path;

use super::{DemuxPacket, Demuxer, OpenDemuxer, StreamInfo, StreamKind};
use crate::error::{Result, SourceError};
use crate::media::CodecId;
use crate::media::h264::{
    AvcDecoderConfig, NAL_TYPE_AUD, NAL_TYPE_IDR, NAL_TYPE_PPS, NAL_TYPE_SEI, NAL_TYPE_SPS,
    extract_nal_units,
};

pub const DEFAULT_FPS: u32 = 25;

#[derive(Debug)]
struct AccessUnit {
    data: Vec<u8>,
    keyframe: bool,
}

#[derive(Debug)]
pub struct AnnexBDemuxer {
    streams: Vec<StreamInfo>,
    units: Vec<AccessUnit>,
    fps: u32,
    next: usize,
}

fn is_vcl(nal_type: u8) -> bool {
    (1..=NAL_TYPE_IDR).contains(&nal_type)
}

/// A slice whose `first_mb_in_slice` is zero starts a new picture.
///
/// `first_mb_in_slice` is the first ue(v) after the NAL header; a value of
/// zero is coded as a single `1` bit.
fn starts_picture(nal: &[u8]) -> bool {
    nal.get(1).is_some_and(|b| b & 0x80 != 0)
}

impl AnnexBDemuxer {
    pub fn open_with_fps(path: &Path, fps: u32) -> Result<Self> {
        let data = std::fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), fps, "raw H.264 file read");
        Self::from_bytes(&data, fps)
    }

    pub fn from_bytes(data: &[u8], fps: u32) -> Result<Self> {
        if fps == 0 {
            return Err(SourceError::Demux("frame rate must be positive".into()));
        }

        let mut sps = None;
        let mut pps = None;
        let mut units: Vec<AccessUnit> = Vec::new();
        let mut current: Option<AccessUnit> = None;
        let mut has_vcl = false;

        for nal in extract_nal_units(data) {
            let nal_type = nal[0] & 0x1f;
            match nal_type {
                NAL_TYPE_SPS if sps.is_none() => sps = Some(nal.to_vec()),
                NAL_TYPE_PPS if pps.is_none() => pps = Some(nal.to_vec()),
                _ => {}
            }

            let boundary = has_vcl
                && (matches!(
                    nal_type,
                    NAL_TYPE_AUD | NAL_TYPE_SPS | NAL_TYPE_PPS | NAL_TYPE_SEI
                ) || (is_vcl(nal_type) && starts_picture(nal)));
            if boundary {
                units.extend(current.take());
                has_vcl = false;
            }

            let unit = current.get_or_insert_with(|| AccessUnit {
                data: Vec::new(),
                keyframe: false,
            });
            unit.data.extend_from_slice(&(nal.len() as u32).to_be_bytes());
            unit.data.extend_from_slice(nal);
            unit.keyframe |= nal_type == NAL_TYPE_IDR;
            has_vcl |= is_vcl(nal_type);
        }
        if has_vcl {
            units.extend(current.take());
        }

        let (Some(sps), Some(pps)) = (sps, pps) else {
            return Err(SourceError::Demux("no SPS/PPS in H.264 stream".into()));
        };
        if units.is_empty() {
            return Err(SourceError::Demux("no pictures in H.264 stream".into()));
        }

        let config = AvcDecoderConfig::from_parameter_sets(sps, pps).map_err(SourceError::Demux)?;
        tracing::debug!(
            access_units = units.len(),
            keyframes = units.iter().filter(|u| u.keyframe).count(),
            "raw H.264 stream indexed"
        );

        Ok(Self {
            streams: vec![StreamInfo {
                index: 0,
                kind: StreamKind::Video {
                    width: 0,
                    height: 0,
                },
                codec: CodecId::H264,
                extradata: config.to_bytes(),
            }],
            units,
            fps,
            next: 0,
        })
    }

    fn timestamp_ms(&self, index: usize) -> i64 {
        (index as u64 * 1000 / self.fps as u64) as i64
    }
}

impl Demuxer for AnnexBDemuxer {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn read_next(&mut self) -> Result<Option<DemuxPacket>> {
        let Some(unit) = self.units.get(self.next) else {
            return Ok(None);
        };
        let ts = self.timestamp_ms(self.next);
        let packet = DemuxPacket {
            stream_index: 0,
            pts_ms: ts,
            dts_ms: ts,
            data: unit.data.clone(),
        };
        self.next += 1;
        Ok(Some(packet))
    }

    /// Positions on the last keyframe at or before `position_ms`.
    fn seek(&mut self, position_ms: u64) -> Result<()> {
        let duration_ms = self.duration_ms();
        if position_ms > duration_ms {
            return Err(SourceError::SeekOutOfRange {
                target_ms: position_ms,
                duration_ms,
            });
        }
        let target = ((position_ms * self.fps as u64 / 1000) as usize).min(self.units.len() - 1);
        self.next = (0..=target)
            .rev()
            .find(|&i| self.units[i].keyframe)
            .unwrap_or(0);
        tracing::debug!(position_ms, unit = self.next, "raw H.264 stream repositioned");
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.units.len() as u64 * 1000 / self.fps as u64
    }
}

impl OpenDemuxer for AnnexBDemuxer {
    fn open(path: &Path) -> Result<Self> {
        Self::open_with_fps(path, DEFAULT_FPS)
    }
}
