use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use rand::Rng;
use ::rtcp::goodbye::Goodbye;
use ::rtcp::packet::Packet;
use ::rtcp::sender_report::SenderReport;
use ::rtcp::source_description::{
    SdesType, SourceDescription, SourceDescriptionChunk, SourceDescriptionItem,
};

use super::{RtcpFactory, RtcpParams, RtcpReporter};
use crate::error::{Result, SourceError};
use crate::media::rtp::RTP_HEADER_LEN;

/// Seconds between 1900-01-01 (NTP epoch) and 1970-01-01.
const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

/// Longest text an SDES item can carry.
const MAX_SDES_TEXT: usize = 255;

/// RFC 3550 §6.2 minimum interval, halved before the first report.
const MIN_INTERVAL_MS: f64 = 5000.0;
/// e - 3/2, compensation for the timer reconsideration algorithm (§A.7).
const COMPENSATION: f64 = 1.218_281_828_459_045;

/// Built-in RTCP reporter for a sending track.
///
/// Keeps packet and octet counters; the packets themselves are built with
/// the `rtcp` crate. Sender reports are sent as an SR + SDES compound
/// (RFC 3550 §6.1) carrying the CNAME and NAME items.
#[derive(Debug)]
pub struct RtcpSession {
    params: RtcpParams,
    packet_count: u32,
    octet_count: u32,
    last_rtp_timestamp: u32,
    last_rtp_ms: Option<u64>,
    avg_rtcp_size: f64,
    initial: bool,
}

impl RtcpSession {
    pub fn new(params: RtcpParams) -> Self {
        Self {
            params,
            packet_count: 0,
            octet_count: 0,
            last_rtp_timestamp: 0,
            last_rtp_ms: None,
            avg_rtcp_size: 0.0,
            initial: true,
        }
    }

    pub fn packet_count(&self) -> u32 {
        self.packet_count
    }

    pub fn octet_count(&self) -> u32 {
        self.octet_count
    }

    /// RTP timestamp corresponding to `now_ms`, extrapolated from the last sent packet.
    fn rtp_timestamp_at(&self, now_ms: u64) -> u32 {
        match self.last_rtp_ms {
            Some(sent_ms) => {
                let elapsed = now_ms.saturating_sub(sent_ms);
                let ticks = elapsed * self.params.clock_rate as u64 / 1000;
                self.last_rtp_timestamp.wrapping_add(ticks as u32)
            }
            None => self.last_rtp_timestamp,
        }
    }

    fn sdes(&self) -> SourceDescription {
        let item = |sdes_type, text: &str| SourceDescriptionItem {
            sdes_type,
            text: Bytes::copy_from_slice(&text.as_bytes()[..text.len().min(MAX_SDES_TEXT)]),
        };
        SourceDescription {
            chunks: vec![SourceDescriptionChunk {
                source: self.params.ssrc,
                items: vec![
                    item(SdesType::SdesCname, &self.params.cname),
                    item(SdesType::SdesName, &self.params.name),
                ],
            }],
        }
    }

    fn track_size(&mut self, size: usize) {
        self.avg_rtcp_size = if self.avg_rtcp_size == 0.0 {
            size as f64
        } else {
            size as f64 / 16.0 + self.avg_rtcp_size * 15.0 / 16.0
        };
    }
}

/// Serialize `packets` back to back into one datagram.
fn marshal(packets: &[Box<dyn Packet + Send + Sync>]) -> Result<Vec<u8>> {
    ::rtcp::packet::marshal(packets)
        .map(|bytes| bytes.to_vec())
        .map_err(|e| SourceError::Rtcp(e.to_string()))
}

/// Current wall time as a 64-bit NTP timestamp (32.32 fixed point).
fn ntp_now() -> u64 {
    let since_unix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let seconds = (since_unix.as_secs() + NTP_UNIX_OFFSET) & 0xffff_ffff;
    let fraction = ((since_unix.subsec_nanos() as u64) << 32) / 1_000_000_000;
    seconds << 32 | fraction
}

impl RtcpReporter for RtcpSession {
    fn on_send(&mut self, packet: &[u8], now_ms: u64) {
        if packet.len() < RTP_HEADER_LEN {
            return;
        }
        self.packet_count = self.packet_count.wrapping_add(1);
        self.octet_count = self
            .octet_count
            .wrapping_add((packet.len() - RTP_HEADER_LEN) as u32);
        self.last_rtp_timestamp = u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]);
        self.last_rtp_ms = Some(now_ms);
    }

    fn sender_report(&mut self, now_ms: u64) -> Result<Vec<u8>> {
        let report = SenderReport {
            ssrc: self.params.ssrc,
            ntp_time: ntp_now(),
            rtp_time: self.rtp_timestamp_at(now_ms),
            packet_count: self.packet_count,
            octet_count: self.octet_count,
            ..Default::default()
        };
        let compound: [Box<dyn Packet + Send + Sync>; 2] = [Box::new(report), Box::new(self.sdes())];
        let packet = marshal(&compound)?;

        self.track_size(packet.len());
        tracing::trace!(
            ssrc = format_args!("{:#010X}", self.params.ssrc),
            packets = self.packet_count,
            octets = self.octet_count,
            "RTCP sender report built"
        );
        Ok(packet)
    }

    fn bye(&mut self) -> Result<Vec<u8>> {
        let bye: [Box<dyn Packet + Send + Sync>; 1] = [Box::new(Goodbye {
            sources: vec![self.params.ssrc],
            reason: Bytes::new(),
        })];
        marshal(&bye)
    }

    /// RFC 3550 §6.3.1 for a unicast session with one sender and one receiver.
    fn report_interval_ms(&mut self) -> u64 {
        let rtcp_bandwidth = self.params.bandwidth as f64 / 8.0 * 0.05;
        let members = 2.0;
        let deterministic = if rtcp_bandwidth > 0.0 {
            self.avg_rtcp_size * members / rtcp_bandwidth * 1000.0
        } else {
            0.0
        };
        let minimum = if self.initial {
            MIN_INTERVAL_MS / 2.0
        } else {
            MIN_INTERVAL_MS
        };
        self.initial = false;

        let jitter = rand::rng().random_range(0.5..1.5);
        (deterministic.max(minimum) * jitter / COMPENSATION) as u64
    }
}

/// Factory for [`RtcpSession`] reporters.
#[derive(Debug, Default, Clone, Copy)]
pub struct RtcpSessionFactory;

impl RtcpFactory for RtcpSessionFactory {
    fn create(&self, params: &RtcpParams) -> Box<dyn RtcpReporter> {
        Box::new(RtcpSession::new(params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> RtcpSession {
        RtcpSession::new(RtcpParams {
            ssrc: 0x11223344,
            clock_rate: 90000,
            bandwidth: 4 * 1024 * 1024,
            cname: "RTSPServer".into(),
            name: "movie.h264".into(),
        })
    }

    fn rtp_packet(ts: u32, payload: usize) -> Vec<u8> {
        let mut pkt = vec![0x80, 96, 0, 1];
        pkt.extend_from_slice(&ts.to_be_bytes());
        pkt.extend_from_slice(&0x11223344u32.to_be_bytes());
        pkt.extend(vec![0; payload]);
        pkt
    }

    #[test]
    fn counters_skip_short_packets() {
        let mut s = session();
        s.on_send(&rtp_packet(0, 100), 0);
        s.on_send(&[0x80, 96, 0, 1], 0);
        assert_eq!(s.packet_count(), 1);
        assert_eq!(s.octet_count(), 100);
    }

    #[test]
    fn sender_report_layout() {
        let mut s = session();
        s.on_send(&rtp_packet(9000, 100), 1000);
        s.on_send(&rtp_packet(9000, 50), 1000);
        let report = s.sender_report(1100).unwrap();

        assert_eq!(report[0], 0x80);
        assert_eq!(report[1], 200);
        assert_eq!(u16::from_be_bytes([report[2], report[3]]), 6);
        assert_eq!(&report[4..8], &0x11223344u32.to_be_bytes());
        // 100 ms later at 90 kHz
        assert_eq!(&report[16..20], &(9000u32 + 9000).to_be_bytes());
        assert_eq!(&report[20..24], &2u32.to_be_bytes());
        assert_eq!(&report[24..28], &150u32.to_be_bytes());

        let sdes = &report[28..];
        assert_eq!(sdes[1], 202);
        assert_eq!(sdes.len() % 4, 0);
        let words = u16::from_be_bytes([sdes[2], sdes[3]]) as usize;
        assert_eq!(sdes.len(), 4 + words * 4);
        assert_eq!(&sdes[4..8], &0x11223344u32.to_be_bytes());
        assert_eq!(sdes[8], 1);
        assert_eq!(sdes[9], 10);
        assert_eq!(&sdes[10..20], b"RTSPServer");
        assert_eq!(sdes[20], 2);
        assert_eq!(&sdes[22..32], b"movie.h264");
    }

    #[test]
    fn long_sdes_name_is_truncated() {
        let mut s = RtcpSession::new(RtcpParams {
            name: "x".repeat(400),
            ..session().params
        });
        let report = s.sender_report(0).unwrap();
        let sdes = &report[28..];
        assert_eq!(sdes[20], 2);
        assert_eq!(sdes[21] as usize, MAX_SDES_TEXT);
    }

    #[test]
    fn bye_layout() {
        let bye = session().bye().unwrap();
        assert_eq!(bye, vec![0x81, 203, 0, 1, 0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn interval_respects_minimum_window() {
        let mut s = session();
        let first = s.report_interval_ms();
        assert!((1000..=3100).contains(&first), "initial interval {first}");
        for _ in 0..20 {
            let next = s.report_interval_ms();
            assert!((2000..=6200).contains(&next), "interval {next}");
        }
    }
}
