use rand::Rng;

use super::SourceConfig;
use super::timestamp::{TimestampTracker, to_clock_rate};
use super::transport::TrackTransport;
use crate::demux::DemuxPacket;
use crate::error::{Result, SourceError};
use crate::media::bitstream;
use crate::media::rtp::random_ssrc;
use crate::media::{PayloadParams, Payloader, PayloaderFactory, TransportCodec};
use crate::protocol::{RtpInfo, TrackDescription};
use crate::rtcp::{RtcpFactory, RtcpParams, RtcpReporter, RtcpScheduler};

/// One playable stream: payloader, RTCP state, timeline and destination.
///
/// Tracks are created once when the source is opened and never added or
/// removed afterwards.
pub struct Track {
    description: TrackDescription,
    ssrc: u32,
    /// Random origin of the RTP timestamp space.
    rtp_offset: u32,
    bandwidth: u32,
    packet_capacity: usize,
    timestamps: TimestampTracker,
    payloader: Box<dyn Payloader>,
    rtcp: Box<dyn RtcpReporter>,
    scheduler: RtcpScheduler,
    transport: Option<TrackTransport>,
}

impl Track {
    pub(crate) fn new(
        description: TrackDescription,
        config: &SourceConfig,
        name: &str,
        payloaders: &dyn PayloaderFactory,
        rtcp: &dyn RtcpFactory,
    ) -> Self {
        let mut rng = rand::rng();
        let ssrc = random_ssrc();
        let rtp_offset: u32 = rng.random();
        let initial_sequence: u16 = rng.random();
        let bandwidth = if description.codec.is_video() {
            config.video_bandwidth
        } else {
            config.audio_bandwidth
        };

        let payloader = payloaders.create(&PayloadParams {
            codec: description.codec,
            payload_type: description.payload_type,
            ssrc,
            initial_sequence,
            initial_timestamp: rtp_offset,
            mtu: config.mtu,
        });
        let rtcp = rtcp.create(&RtcpParams {
            ssrc,
            clock_rate: description.clock_rate,
            bandwidth,
            cname: config.sdes_cname.clone(),
            name: name.to_string(),
        });

        tracing::debug!(
            track = description.stream_index,
            codec = description.codec.encoding_name(),
            pt = description.payload_type,
            clock_rate = description.clock_rate,
            ssrc = format_args!("{:#010X}", ssrc),
            "track configured"
        );

        Self {
            description,
            ssrc,
            rtp_offset,
            bandwidth,
            packet_capacity: config.packet_capacity,
            timestamps: TimestampTracker::new(),
            payloader,
            rtcp,
            scheduler: RtcpScheduler::new(),
            transport: None,
        }
    }

    /// Stream index this track carries.
    pub fn index(&self) -> usize {
        self.description.stream_index
    }

    pub fn control(&self) -> String {
        self.description.control()
    }

    pub fn codec(&self) -> TransportCodec {
        self.description.codec
    }

    pub fn payload_type(&self) -> u8 {
        self.description.payload_type
    }

    pub fn clock_rate(&self) -> u32 {
        self.description.clock_rate
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Session bandwidth in bits per second used for RTCP scheduling.
    pub fn bandwidth(&self) -> u32 {
        self.bandwidth
    }

    pub fn description(&self) -> &TrackDescription {
        &self.description
    }

    /// Output timeline origin of the current segment, in milliseconds.
    pub fn timestamp_base_ms(&self) -> u64 {
        self.timestamps.base_ms()
    }

    pub fn transport(&self) -> Option<&TrackTransport> {
        self.transport.as_ref()
    }

    pub fn bye_sent(&self) -> bool {
        self.scheduler.bye_sent()
    }

    pub(crate) fn bind(&mut self, transport: TrackTransport) {
        tracing::info!(
            track = self.index(),
            rtp = %transport.rtp.addr,
            rtcp = %transport.rtcp.addr,
            "track transport bound"
        );
        self.transport = Some(transport);
    }

    /// Offset RTP timestamp for `media_ms` on the output timeline.
    fn rtp_timestamp(&self, media_ms: u64) -> u32 {
        let ticks = to_clock_rate(media_ms, self.description.clock_rate);
        self.rtp_offset.wrapping_add(ticks as u32)
    }

    /// `RTP-Info` entry: next sequence number and the RTP time of the segment origin.
    pub fn rtp_info(&self) -> RtpInfo {
        let (seq, _) = self.payloader.sequence_state();
        RtpInfo {
            control: self.control(),
            seq,
            rtptime: self.rtp_timestamp(self.timestamps.base_ms()),
        }
    }

    pub(crate) fn close_segment(&mut self) {
        self.timestamps.close_segment();
    }

    /// Packetize one access unit and hand every packet to the transport.
    ///
    /// Each RTP packet is first accounted by the reporter; a sender report
    /// that falls due goes out ahead of it. Returns the number of RTP
    /// packets sent, zero when the track is not bound.
    ///
    /// A unit the payload format cannot carry, or whose packets overflow
    /// the scratch buffer, is dropped and reported as an error.
    pub(crate) fn send_unit(&mut self, packet: &DemuxPacket, now_ms: u64) -> Result<usize> {
        let track = self.index();
        let unit = bitstream::to_transport(self.description.codec, track, &packet.data)?;
        if let Some(limit) = self.payloader.max_unit_size() {
            if unit.len() > limit {
                return Err(SourceError::UnitTooLarge {
                    track,
                    size: unit.len(),
                    limit,
                });
            }
        }
        let media_ms = self.timestamps.stamp(packet.pts_ms);
        let timestamp = self.rtp_timestamp(media_ms);
        let packets = self.payloader.encode(&unit, timestamp);

        if let Some(size) = packets
            .iter()
            .map(Vec::len)
            .find(|&len| len > self.packet_capacity)
        {
            return Err(SourceError::FrameTooLarge {
                track,
                size,
                capacity: self.packet_capacity,
            });
        }

        let Some(transport) = &self.transport else {
            tracing::trace!(track, pts_ms = packet.pts_ms, "track not bound, unit skipped");
            return Ok(0);
        };

        for rtp in &packets {
            self.rtcp.on_send(rtp, now_ms);
            if let Some(report) = self.scheduler.poll_report(self.rtcp.as_mut(), now_ms) {
                transport.rtcp.send(&report);
            }
            transport.rtp.send(rtp);
        }

        tracing::trace!(
            track,
            pts_ms = packet.pts_ms,
            rtp_ts = timestamp,
            packets = packets.len(),
            "access unit sent"
        );
        Ok(packets.len())
    }

    /// Send this track's BYE, at most once per lifetime.
    pub(crate) fn finish(&mut self) {
        let Some(bye) = self.scheduler.poll_bye(self.rtcp.as_mut()) else {
            return;
        };
        match &self.transport {
            Some(transport) => {
                transport.rtcp.send(&bye);
                tracing::debug!(track = self.index(), "RTCP BYE sent");
            }
            None => tracing::debug!(track = self.index(), "track not bound, BYE skipped"),
        }
    }
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("description", &self.description)
            .field("ssrc", &self.ssrc)
            .field("timestamps", &self.timestamps)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}
