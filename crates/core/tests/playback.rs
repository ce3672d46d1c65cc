//! End-to-end playback: a scripted demuxer, a manual clock and a recording
//! sink stand in for the file, the wall clock and the network.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use media_source::demux::{DemuxPacket, Demuxer, OpenDemuxer, StreamInfo, StreamKind};
use media_source::media::CodecId;
use media_source::media::h264::AvcDecoderConfig;
use media_source::rtcp::{RtcpFactory, RtcpParams, RtcpReporter};
use media_source::transport::RecordingSink;
use media_source::{
    ErrorCategory, ManualClock, MediaSource, PlayOutcome, SessionState, SourceConfig, SourceError,
};

const SPS: [u8; 5] = [0x67, 0x42, 0xc0, 0x1e, 0xda];
const PPS: [u8; 4] = [0x68, 0xce, 0x38, 0x80];

const SR: [u8; 4] = [0x80, 200, 0, 0];
const BYE: [u8; 4] = [0x81, 203, 0, 0];

struct ScriptedDemuxer {
    streams: Vec<StreamInfo>,
    packets: Vec<DemuxPacket>,
    next: usize,
    duration_ms: u64,
    fail_seek: bool,
}

impl ScriptedDemuxer {
    fn new(streams: Vec<StreamInfo>, packets: Vec<DemuxPacket>) -> Self {
        let duration_ms = packets.iter().map(|p| p.pts_ms).max().unwrap_or(0) as u64 + 40;
        Self {
            streams,
            packets,
            next: 0,
            duration_ms,
            fail_seek: false,
        }
    }
}

impl Demuxer for ScriptedDemuxer {
    fn streams(&self) -> &[StreamInfo] {
        &self.streams
    }

    fn read_next(&mut self) -> media_source::Result<Option<DemuxPacket>> {
        let packet = self.packets.get(self.next).cloned();
        self.next += 1;
        Ok(packet)
    }

    fn seek(&mut self, position_ms: u64) -> media_source::Result<()> {
        if self.fail_seek {
            return Err(SourceError::Demux("index unreadable".into()));
        }
        self.next = self
            .packets
            .iter()
            .position(|p| p.pts_ms >= position_ms as i64)
            .unwrap_or(self.packets.len());
        Ok(())
    }

    fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

impl OpenDemuxer for ScriptedDemuxer {
    fn open(path: &Path) -> media_source::Result<Self> {
        Err(SourceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            path.display().to_string(),
        )))
    }
}

/// Reports every 5 s, encodes SR and BYE as fixed markers.
struct FixedRtcp;

struct FixedReporter;

impl RtcpReporter for FixedReporter {
    fn on_send(&mut self, _packet: &[u8], _now_ms: u64) {}

    fn sender_report(&mut self, _now_ms: u64) -> media_source::Result<Vec<u8>> {
        Ok(SR.to_vec())
    }

    fn bye(&mut self) -> media_source::Result<Vec<u8>> {
        Ok(BYE.to_vec())
    }

    fn report_interval_ms(&mut self) -> u64 {
        5000
    }
}

impl RtcpFactory for FixedRtcp {
    fn create(&self, _params: &RtcpParams) -> Box<dyn RtcpReporter> {
        Box::new(FixedReporter)
    }
}

fn h264_stream(index: usize) -> StreamInfo {
    let config = AvcDecoderConfig::from_parameter_sets(SPS.to_vec(), PPS.to_vec()).unwrap();
    StreamInfo {
        index,
        kind: StreamKind::Video {
            width: 640,
            height: 360,
        },
        codec: CodecId::H264,
        extradata: config.to_bytes(),
    }
}

fn aac_stream(index: usize) -> StreamInfo {
    StreamInfo {
        index,
        kind: StreamKind::Audio {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
        },
        codec: CodecId::Aac,
        extradata: vec![0x12, 0x10],
    }
}

fn unsupported_stream(index: usize, codec: CodecId) -> StreamInfo {
    StreamInfo {
        index,
        kind: StreamKind::Video {
            width: 640,
            height: 360,
        },
        codec,
        extradata: Vec::new(),
    }
}

/// One length-prefixed non-IDR slice of `len` bytes.
fn slice(len: usize) -> Vec<u8> {
    let mut nal = vec![0x41; len];
    nal[1] = 0x9a;
    let mut out = (len as u32).to_be_bytes().to_vec();
    out.extend_from_slice(&nal);
    out
}

fn video_packet(pts_ms: i64) -> DemuxPacket {
    DemuxPacket::with_timestamps(0, Some(pts_ms), None, slice(8))
}

/// `count` video units, 40 ms apart starting at 0.
fn video_units(count: usize) -> Vec<DemuxPacket> {
    (0..count).map(|i| video_packet(i as i64 * 40)).collect()
}

struct Harness {
    source: MediaSource,
    clock: ManualClock,
    sink: Arc<RecordingSink>,
}

const RTP: &str = "127.0.0.1:9000";
const RTCP: &str = "127.0.0.1:9001";

fn rtp_addr() -> SocketAddr {
    RTP.parse().unwrap()
}

fn rtcp_addr() -> SocketAddr {
    RTCP.parse().unwrap()
}

fn harness_with(demuxer: ScriptedDemuxer, config: SourceConfig) -> Harness {
    media_source::init();
    let clock = ManualClock::new(0);
    let sink = Arc::new(RecordingSink::new());
    let source = MediaSource::builder()
        .config(config)
        .clock(Arc::new(clock.clone()))
        .transport(sink.clone())
        .rtcp(FixedRtcp)
        .build("movie.mp4", Box::new(demuxer))
        .unwrap();
    Harness {
        source,
        clock,
        sink,
    }
}

/// Single bound H.264 track.
fn video_harness(units: usize) -> Harness {
    let mut h = harness_with(
        ScriptedDemuxer::new(vec![h264_stream(0)], video_units(units)),
        SourceConfig::default(),
    );
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();
    h
}

fn rtp_timestamp(packet: &[u8]) -> u32 {
    u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]])
}

fn rtp_sequence(packet: &[u8]) -> u16 {
    u16::from_be_bytes([packet[2], packet[3]])
}

/// RTP timestamps relative to the first packet sent.
fn relative_timestamps(packets: &[Vec<u8>]) -> Vec<u32> {
    let origin = rtp_timestamp(&packets[0]);
    packets
        .iter()
        .map(|p| rtp_timestamp(p).wrapping_sub(origin))
        .collect()
}

// --- Describe ---

#[test]
fn describes_supported_tracks_and_reports_skipped_ones() {
    let demuxer = ScriptedDemuxer::new(
        vec![
            h264_stream(0),
            unsupported_stream(1, CodecId::Mpeg4Video),
            aac_stream(2),
        ],
        video_units(3),
    );
    let h = harness_with(demuxer, SourceConfig::default());

    let sdp = h.source.capability_description();
    assert!(sdp.starts_with("m=video 0 RTP/AVP 96\r\n"));
    assert!(sdp.contains("a=rtpmap:96 H264/90000\r\n"));
    assert!(sdp.contains("a=control:track0\r\n"));
    assert!(sdp.contains("m=audio 0 RTP/AVP 97\r\n"));
    assert!(sdp.contains("a=rtpmap:97 MPEG4-GENERIC/44100/2\r\n"));
    assert!(sdp.contains("a=control:track2\r\n"));
    assert!(!sdp.contains("track1"));
    assert!(sdp.find("track0").unwrap() < sdp.find("track2").unwrap());

    assert_eq!(h.source.tracks().len(), 2);
    assert_eq!(h.source.skipped_streams().len(), 1);
    assert!(matches!(
        h.source.skipped_streams()[0],
        SourceError::UnsupportedCodec { stream: 1, .. }
    ));
    assert_eq!(h.source.state(), SessionState::Idle);
}

#[test]
fn no_playable_stream_fails_to_build() {
    media_source::init();
    let demuxer = ScriptedDemuxer::new(
        vec![unsupported_stream(0, CodecId::Other("vp9".into()))],
        Vec::new(),
    );
    let err = MediaSource::builder()
        .transport(Arc::new(RecordingSink::new()))
        .build("clip.webm", Box::new(demuxer))
        .unwrap_err();
    assert!(matches!(err, SourceError::NoTracks(_)));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[test]
fn open_failure_propagates() {
    media_source::init();
    let err = MediaSource::open::<ScriptedDemuxer>("/nonexistent/movie.mp4").unwrap_err();
    assert!(matches!(err, SourceError::Io(_)));
}

#[test]
fn tracks_take_codec_clock_and_bandwidth() {
    let demuxer = ScriptedDemuxer::new(vec![h264_stream(0), aac_stream(1)], Vec::new());
    let h = harness_with(demuxer, SourceConfig::default());
    let tracks = h.source.tracks();
    assert_eq!(tracks[0].clock_rate(), 90000);
    assert_eq!(tracks[1].clock_rate(), 44100);
    assert_eq!(tracks[0].bandwidth(), 4 * 1024 * 1024);
    assert_eq!(tracks[1].bandwidth(), 128 * 1024);
    assert_eq!(tracks[1].control(), "track1");
}

// --- Pacing ---

#[test]
fn sends_one_unit_per_frame_interval() {
    let mut h = video_harness(10);

    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(h.source.state(), SessionState::Playing);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Waiting);

    h.clock.advance(39);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Waiting);
    h.clock.advance(1);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));

    let packets = h.sink.sent_to(rtp_addr());
    assert_eq!(packets.len(), 3);
    assert_eq!(relative_timestamps(&packets), vec![0, 3600, 7200]);

    let seqs: Vec<u16> = packets.iter().map(|p| rtp_sequence(p)).collect();
    assert_eq!(seqs[1], seqs[0].wrapping_add(1));
    assert_eq!(seqs[2], seqs[0].wrapping_add(2));
}

#[test]
fn late_call_sends_every_due_unit_in_one_burst() {
    let mut h = video_harness(6);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(120);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(3));
    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600, 7200, 10800]
    );
}

#[test]
fn burst_is_capped() {
    let config = SourceConfig {
        max_burst: 2,
        ..Default::default()
    };
    let mut h = harness_with(
        ScriptedDemuxer::new(vec![h264_stream(0)], video_units(8)),
        config,
    );
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(200);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(2));
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(2));
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Waiting);
}

#[test]
fn speed_scales_pacing_but_not_timestamps() {
    let mut h = video_harness(5);
    h.source.set_speed(2.0).unwrap();
    assert_eq!(h.source.speed(), 2.0);

    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(20);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(20);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));

    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600, 7200]
    );
}

#[test]
fn invalid_speed_is_rejected() {
    let mut h = video_harness(2);
    for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let err = h.source.set_speed(speed).unwrap_err();
        assert!(matches!(err, SourceError::InvalidSpeed(_)));
        assert_eq!(err.category(), ErrorCategory::State);
    }
    assert_eq!(h.source.speed(), 1.0);
}

#[test]
fn packets_of_untracked_streams_are_discarded() {
    let packets = vec![
        video_packet(0),
        DemuxPacket::with_timestamps(1, Some(0), Some(0), vec![1, 2, 3]),
        video_packet(40),
    ];
    let mut h = harness_with(
        ScriptedDemuxer::new(
            vec![h264_stream(0), unsupported_stream(1, CodecId::Mpeg4Video)],
            packets,
        ),
        SourceConfig::default(),
    );
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(h.sink.sent_to(rtp_addr()).len(), 2);
}

#[test]
fn audio_timestamps_use_sample_rate() {
    let packets = vec![
        DemuxPacket::with_timestamps(0, Some(0), None, vec![0x21; 10]),
        DemuxPacket::with_timestamps(0, Some(23), None, vec![0x21; 12]),
    ];
    let mut h = harness_with(
        ScriptedDemuxer::new(vec![aac_stream(0)], packets),
        SourceConfig::default(),
    );
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    h.source.play().unwrap();
    h.clock.advance(23);
    h.source.play().unwrap();

    let packets = h.sink.sent_to(rtp_addr());
    assert_eq!(relative_timestamps(&packets), vec![0, 1014]);
    assert_eq!(packets[0][1], 0x80 | 97);
    assert_eq!(&packets[0][12..14], &[0x00, 0x10]);
    assert_eq!(packets[0].len(), 12 + 4 + 10);
}

// --- Pause / seek ---

#[test]
fn pause_then_play_resumes_without_burst() {
    let mut h = video_harness(6);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));

    h.source.pause().unwrap();
    assert_eq!(h.source.state(), SessionState::Paused);
    h.source.pause().unwrap();
    assert_eq!(h.source.state(), SessionState::Paused);

    h.clock.advance(10_000);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(h.source.state(), SessionState::Playing);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Waiting);
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));

    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600, 7200]
    );
}

#[test]
fn pause_keeps_pulled_unit_and_sends_it_first_on_resume() {
    let mut h = video_harness(3);
    // Unit 0 goes out; unit 1 (pts 40) is pulled and held.
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(20);
    h.source.pause().unwrap();

    h.clock.advance(5_000);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600]
    );

    // Paced from the resume instant, not from the original timeline.
    h.clock.advance(39);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Waiting);
    h.clock.advance(1);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600, 7200]
    );
}

#[test]
fn pause_before_play_is_noop() {
    let mut h = video_harness(2);
    h.source.pause().unwrap();
    assert_eq!(h.source.state(), SessionState::Idle);
}

#[test]
fn seek_back_keeps_timestamps_increasing() {
    let mut h = video_harness(10);
    let before_play = h.source.play_info("rtsp://host/movie.mp4");

    for _ in 0..3 {
        assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
        h.clock.advance(40);
    }
    h.source.seek(0).unwrap();
    assert_eq!(h.source.tracks()[0].timestamp_base_ms(), 81);

    let info = h.source.play_info("rtsp://host/movie.mp4");
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));

    let packets = h.sink.sent_to(rtp_addr());
    assert_eq!(relative_timestamps(&packets), vec![0, 3600, 7200, 7290]);

    let resumed = &packets[3];
    assert_eq!(
        info,
        format!(
            "url=rtsp://host/movie.mp4/track0;seq={};rtptime={}",
            rtp_sequence(resumed),
            rtp_timestamp(resumed)
        )
    );
    assert_eq!(
        before_play,
        format!(
            "url=rtsp://host/movie.mp4/track0;seq={};rtptime={}",
            rtp_sequence(&packets[0]),
            rtp_timestamp(&packets[0])
        )
    );
}

#[test]
fn seek_forward_continues_timeline() {
    let mut h = video_harness(20);
    h.source.play().unwrap();
    h.clock.advance(40);
    h.source.play().unwrap();

    h.source.seek(400).unwrap();
    h.clock.advance(5000);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));

    // Segment 0..=40 closed at base 41; the jump in presentation time is not visible.
    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600, 3690, 7290]
    );
}

#[test]
fn seek_past_duration_changes_nothing() {
    let mut h = video_harness(10);
    h.source.play().unwrap();

    let err = h.source.seek(10_000).unwrap_err();
    assert!(matches!(
        err,
        SourceError::SeekOutOfRange {
            target_ms: 10_000,
            duration_ms: 400
        }
    ));
    assert_eq!(h.source.tracks()[0].timestamp_base_ms(), 0);

    // The unit pulled before the failed seek is still paced from the old anchor.
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(
        relative_timestamps(&h.sink.sent_to(rtp_addr())),
        vec![0, 3600]
    );
}

#[test]
fn demuxer_seek_failure_is_returned() {
    let mut demuxer = ScriptedDemuxer::new(vec![h264_stream(0)], video_units(10));
    demuxer.fail_seek = true;
    let mut h = harness_with(demuxer, SourceConfig::default());
    h.source.play().unwrap();

    let err = h.source.seek(200).unwrap_err();
    assert!(matches!(err, SourceError::Demux(_)));
    assert_eq!(err.category(), ErrorCategory::Io);
}

// --- RTCP ---

#[test]
fn sender_report_goes_out_before_rtp_and_every_interval() {
    let mut h = harness_with(
        ScriptedDemuxer::new(vec![h264_stream(0)], video_units(300)),
        SourceConfig::default(),
    );
    // RTP and RTCP on one port so the interleaving is visible.
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9000)
        .unwrap();

    for _ in 0..300 {
        assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
        h.clock.advance(40);
    }

    let datagrams = h.sink.sent_to(rtp_addr());
    let reports: Vec<usize> = datagrams
        .iter()
        .enumerate()
        .filter(|(_, d)| d.as_slice() == &SR[..])
        .map(|(i, _)| i)
        .collect();
    // t = 0, 5000, 10000; each ahead of the RTP packet that triggered it
    assert_eq!(reports, vec![0, 126, 252]);
    assert_eq!(datagrams.last().unwrap().as_slice(), &BYE[..]);
    assert_eq!(datagrams.len(), 300 + 3 + 1);
}

#[test]
fn bye_is_sent_once_at_end_of_stream() {
    let mut h = video_harness(3);
    for _ in 0..3 {
        h.source.play().unwrap();
        h.clock.advance(40);
    }
    assert_eq!(h.source.state(), SessionState::Ended);
    assert!(h.source.tracks()[0].bye_sent());

    let rtcp = h.sink.sent_to(rtcp_addr());
    assert_eq!(rtcp, vec![SR.to_vec(), BYE.to_vec()]);

    let sent = h.sink.len();
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Ended);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Ended);
    assert_eq!(h.sink.len(), sent);

    let err = h.source.seek(0).unwrap_err();
    assert!(matches!(
        err,
        SourceError::InvalidState {
            operation: "seek",
            state: SessionState::Ended
        }
    ));
    h.source.close();
}

#[test]
fn empty_stream_ends_immediately() {
    let mut h = video_harness(0);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Ended);
    assert_eq!(h.sink.sent_to(rtcp_addr()), vec![BYE.to_vec()]);
}

#[test]
fn built_in_reporter_sends_sender_report_and_bye() {
    media_source::init();
    let clock = ManualClock::new(0);
    let sink = Arc::new(RecordingSink::new());
    let mut source = MediaSource::builder()
        .clock(Arc::new(clock.clone()))
        .transport(sink.clone())
        .build(
            "movie.mp4",
            Box::new(ScriptedDemuxer::new(vec![h264_stream(0)], video_units(2))),
        )
        .unwrap();
    source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    source.play().unwrap();
    clock.advance(40);
    source.play().unwrap();

    let rtcp = sink.sent_to(rtcp_addr());
    assert_eq!(rtcp.len(), 2);
    assert_eq!(rtcp[0][1], 200);
    assert_eq!(&rtcp[0][4..8], &source.tracks()[0].ssrc().to_be_bytes());
    assert_eq!(rtcp[1][1], 203);
}

// --- Transport binding ---

#[test]
fn unbound_track_sends_nothing() {
    let mut h = harness_with(
        ScriptedDemuxer::new(vec![h264_stream(0)], video_units(3)),
        SourceConfig::default(),
    );
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert!(h.sink.is_empty());
    assert!(h.source.tracks()[0].transport().is_none());
}

#[test]
fn binding_unknown_track_fails() {
    let mut h = video_harness(1);
    for label in ["track7", "video", ""] {
        let err = h
            .source
            .bind_track_transport(label, "127.0.0.1", 9000, 9001)
            .unwrap_err();
        assert!(matches!(err, SourceError::UnknownTrack(_)));
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }
}

#[test]
fn binding_unresolvable_address_fails() {
    let mut h = video_harness(1);
    let err = h
        .source
        .bind_track_transport("track0", "no-such-host.invalid", 9000, 9001)
        .unwrap_err();
    assert!(matches!(err, SourceError::AddressResolution { port: 9000, .. }));
}

#[test]
fn binding_accepts_control_url_and_rebinding_replaces() {
    let mut h = video_harness(3);
    h.source
        .bind_track_transport("rtsp://host/movie.mp4/track0", "127.0.0.1", 7000, 7001)
        .unwrap();
    h.source.play().unwrap();
    assert!(h.sink.sent_to(rtp_addr()).is_empty());
    assert_eq!(h.sink.sent_to("127.0.0.1:7000".parse().unwrap()).len(), 1);
}

// --- Error recovery ---

#[test]
fn oversized_unit_is_dropped_and_playback_continues() {
    let packets = vec![
        video_packet(0),
        DemuxPacket::with_timestamps(0, Some(40), None, slice(500)),
        video_packet(80),
    ];
    let config = SourceConfig {
        packet_capacity: 100,
        ..Default::default()
    };
    let mut h = harness_with(ScriptedDemuxer::new(vec![h264_stream(0)], packets), config);
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    h.clock.advance(40);
    let err = h.source.play().unwrap_err();
    assert!(matches!(
        err,
        SourceError::FrameTooLarge {
            track: 0,
            size: 512,
            capacity: 100
        }
    ));
    assert!(err.is_recoverable());

    assert_eq!(h.source.play().unwrap(), PlayOutcome::Waiting);
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    assert_eq!(h.sink.sent_to(rtp_addr()).len(), 2);
}

#[test]
fn oversized_audio_unit_is_reported_not_counted() {
    let packets = vec![
        DemuxPacket::with_timestamps(0, Some(0), None, vec![0x21; 9000]),
        DemuxPacket::with_timestamps(0, Some(23), None, vec![0x21; 10]),
    ];
    let config = SourceConfig {
        packet_capacity: 20_000,
        ..Default::default()
    };
    let mut h = harness_with(ScriptedDemuxer::new(vec![aac_stream(0)], packets), config);
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    let err = h.source.play().unwrap_err();
    assert!(matches!(
        err,
        SourceError::UnitTooLarge {
            track: 0,
            size: 9000,
            limit: 8191
        }
    ));
    assert_eq!(err.category(), ErrorCategory::ResourceExhaustion);
    assert!(err.is_recoverable());
    assert!(h.sink.is_empty());

    h.clock.advance(23);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
    let rtp = h.sink.sent_to(rtp_addr());
    assert_eq!(rtp.len(), 1);
    assert_eq!(rtp[0].len(), 12 + 4 + 10);
}

#[test]
fn malformed_unit_is_recoverable() {
    let mut bad = slice(8);
    bad[3] = 200;
    let packets = vec![
        DemuxPacket::with_timestamps(0, Some(0), None, bad),
        video_packet(40),
    ];
    let mut h = harness_with(
        ScriptedDemuxer::new(vec![h264_stream(0)], packets),
        SourceConfig::default(),
    );
    h.source
        .bind_track_transport("track0", "127.0.0.1", 9000, 9001)
        .unwrap();

    let err = h.source.play().unwrap_err();
    assert!(matches!(
        err,
        SourceError::MalformedAccessUnit { track: 0, offset: 0 }
    ));
    assert!(err.is_recoverable());
    h.clock.advance(40);
    assert_eq!(h.source.play().unwrap(), PlayOutcome::Sent(1));
}
