//! Playback of one opened media file as a set of RTP tracks.
//!
//! A [`MediaSource`] owns the demuxer and one [`Track`] per playable
//! stream. The caller drives it by calling [`MediaSource::play`]
//! repeatedly; each call sends whatever the pacing clock says is due and
//! returns without blocking.
//!
//! ## Lifecycle
//!
//! ```text
//! open/build      -> Idle
//! play            -> Playing   (from Idle or Paused)
//! pause           -> Paused    (from Playing)
//! seek            -> unchanged (segments closed, pacing re-anchored)
//! end of stream   -> Ended     (BYE sent once per track)
//! close           -> (dropped)
//! ```

pub mod pacing;
pub mod state;
pub mod timestamp;
pub mod track;
pub mod transport;

use std::path::Path;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::demux::{DemuxPacket, Demuxer, OpenDemuxer};
use crate::error::{Result, SourceError};
use crate::media::{PayloaderFactory, RtpPayloaderFactory};
use crate::protocol::{RtpInfo, TrackDescription, rtp_info};
use crate::rtcp::{RtcpFactory, RtcpSessionFactory};
use crate::transport::{DatagramSink, UdpTransport};

pub use pacing::PacingEngine;
pub use state::SessionState;
pub use timestamp::TimestampTracker;
pub use track::Track;
pub use transport::{Endpoint, TrackTransport};

/// Tunables of a media source.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Most access units pulled by one [`MediaSource::play`] call.
    pub max_burst: usize,
    /// Largest RTP payload a payloader may produce, excluding the RTP header.
    pub mtu: usize,
    /// Per-track packet buffer. A unit producing a larger packet is dropped.
    pub packet_capacity: usize,
    /// Session bandwidth of video tracks in bits per second.
    pub video_bandwidth: u32,
    /// Session bandwidth of audio tracks in bits per second.
    pub audio_bandwidth: u32,
    /// SDES CNAME carried in sender reports.
    pub sdes_cname: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            max_burst: 64,
            mtu: 1400,
            packet_capacity: 1500,
            video_bandwidth: 4 * 1024 * 1024,
            audio_bandwidth: 128 * 1024,
            sdes_cname: "RTSPServer".to_string(),
        }
    }
}

/// Result of one [`MediaSource::play`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// This many access units were sent.
    Sent(usize),
    /// Nothing was due yet.
    Waiting,
    /// The source reached end of stream; nothing more will be sent.
    Ended,
}

/// Configures and opens a [`MediaSource`].
///
/// Every collaborator has a default: the system clock, an ephemeral UDP
/// socket, the built-in payloaders and the built-in RTCP reporter.
pub struct MediaSourceBuilder {
    config: SourceConfig,
    clock: Option<Arc<dyn Clock>>,
    sink: Option<Arc<dyn DatagramSink>>,
    payloaders: Box<dyn PayloaderFactory>,
    rtcp: Box<dyn RtcpFactory>,
}

impl Default for MediaSourceBuilder {
    fn default() -> Self {
        Self {
            config: SourceConfig::default(),
            clock: None,
            sink: None,
            payloaders: Box::new(RtpPayloaderFactory),
            rtcp: Box::new(RtcpSessionFactory),
        }
    }
}

impl MediaSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SourceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Socket every track sends through once bound.
    pub fn transport(mut self, sink: Arc<dyn DatagramSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn payloaders(mut self, factory: impl PayloaderFactory + 'static) -> Self {
        self.payloaders = Box::new(factory);
        self
    }

    pub fn rtcp(mut self, factory: impl RtcpFactory + 'static) -> Self {
        self.rtcp = Box::new(factory);
        self
    }

    /// Open `path` with demuxer `D`. The file name becomes the SDES NAME.
    pub fn open<D: OpenDemuxer>(self, path: impl AsRef<Path>) -> Result<MediaSource> {
        let path = path.as_ref();
        if !crate::is_initialized() {
            return Err(SourceError::NotInitialized);
        }
        let demuxer = D::open(path)?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.build(&name, Box::new(demuxer))
    }

    /// Build a source over an already opened demuxer.
    ///
    /// Streams whose codec or decoder configuration is unusable are left
    /// out and reported by [`MediaSource::skipped_streams`]; if none
    /// remain the build fails with [`SourceError::NoTracks`].
    pub fn build(self, name: &str, demuxer: Box<dyn Demuxer>) -> Result<MediaSource> {
        if !crate::is_initialized() {
            return Err(SourceError::NotInitialized);
        }

        let mut tracks = Vec::new();
        let mut skipped = Vec::new();
        let mut description = String::new();
        for info in demuxer.streams() {
            match TrackDescription::from_stream(info) {
                Ok(desc) => {
                    description.push_str(&desc.media_description());
                    tracks.push(Track::new(
                        desc,
                        &self.config,
                        name,
                        self.payloaders.as_ref(),
                        self.rtcp.as_ref(),
                    ));
                }
                Err(e) => {
                    tracing::warn!(stream = info.index, error = %e, "stream skipped");
                    skipped.push(e);
                }
            }
        }
        if tracks.is_empty() {
            return Err(SourceError::NoTracks(name.to_string()));
        }

        let sink: Arc<dyn DatagramSink> = match self.sink {
            Some(sink) => sink,
            None => Arc::new(UdpTransport::bind()?),
        };
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(SystemClock::new()),
        };

        tracing::info!(
            name,
            tracks = tracks.len(),
            skipped = skipped.len(),
            duration_ms = demuxer.duration_ms(),
            "media source opened"
        );

        Ok(MediaSource {
            name: name.to_string(),
            demuxer,
            tracks,
            skipped,
            description,
            state: SessionState::Idle,
            pacing: PacingEngine::new(),
            pending: None,
            clock,
            sink,
            config: self.config,
        })
    }
}

/// A file streamed as paced RTP with RTCP sender reports.
pub struct MediaSource {
    name: String,
    demuxer: Box<dyn Demuxer>,
    tracks: Vec<Track>,
    skipped: Vec<SourceError>,
    description: String,
    state: SessionState,
    pacing: PacingEngine,
    /// Unit pulled from the demuxer but not yet due.
    pending: Option<DemuxPacket>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DatagramSink>,
    config: SourceConfig,
}

impl MediaSource {
    pub fn builder() -> MediaSourceBuilder {
        MediaSourceBuilder::new()
    }

    /// Open `path` with all defaults.
    pub fn open<D: OpenDemuxer>(path: impl AsRef<Path>) -> Result<Self> {
        MediaSourceBuilder::new().open::<D>(path)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Configuration errors of streams that did not become tracks.
    pub fn skipped_streams(&self) -> &[SourceError] {
        &self.skipped
    }

    pub fn speed(&self) -> f64 {
        self.pacing.speed()
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            tracing::debug!(name = %self.name, old_state = %self.state, new_state = %state, "state transition");
            self.state = state;
        }
    }

    fn track_slot(&self, stream_index: usize) -> Option<usize> {
        self.tracks.iter().position(|t| t.index() == stream_index)
    }

    /// Send every access unit that is due, up to `max_burst` units.
    ///
    /// A unit that is not yet due is kept and tested again on the next
    /// call. Units of streams without a track are discarded. At end of
    /// stream every track sends its BYE and the source becomes
    /// [`SessionState::Ended`].
    ///
    /// A recoverable error (see [`SourceError::is_recoverable`]) drops the
    /// offending unit; calling `play` again continues with the next one.
    /// Units already sent earlier in the same call are not counted in the
    /// error; the warning logged for the dropped unit carries that count.
    pub fn play(&mut self) -> Result<PlayOutcome> {
        if self.state == SessionState::Ended {
            return Ok(PlayOutcome::Ended);
        }

        let mut sent = 0;
        for _ in 0..self.config.max_burst.max(1) {
            let packet = match self.pending.take() {
                Some(packet) => packet,
                None => match self.demuxer.read_next()? {
                    Some(packet) => packet,
                    None => {
                        self.finish();
                        return Ok(if sent > 0 {
                            PlayOutcome::Sent(sent)
                        } else {
                            PlayOutcome::Ended
                        });
                    }
                },
            };
            self.set_state(SessionState::Playing);

            let Some(slot) = self.track_slot(packet.stream_index) else {
                tracing::trace!(stream = packet.stream_index, "no track for stream, packet discarded");
                continue;
            };

            let now_ms = self.clock.now_ms();
            if !self.pacing.is_due(now_ms, &packet) {
                self.pending = Some(packet);
                break;
            }

            if let Err(e) = self.tracks[slot].send_unit(&packet, now_ms) {
                tracing::warn!(
                    track = packet.stream_index,
                    pts_ms = packet.pts_ms,
                    sent,
                    error = %e,
                    "access unit dropped"
                );
                return Err(e);
            }
            sent += 1;
        }

        Ok(if sent > 0 {
            PlayOutcome::Sent(sent)
        } else {
            PlayOutcome::Waiting
        })
    }

    fn finish(&mut self) {
        for track in &mut self.tracks {
            track.finish();
        }
        self.set_state(SessionState::Ended);
        tracing::info!(name = %self.name, "end of stream");
    }

    /// Suspend delivery. The next [`play`](Self::play) re-anchors pacing,
    /// so the pause does not turn into a burst on resume.
    ///
    /// A unit that was pulled but not yet due is kept, not cleared: it is
    /// the next unit of the stream, so dropping it would leave a hole that
    /// breaks decoding until the next keyframe. On resume it opens the new
    /// pacing segment and goes out at once. Only [`seek`](Self::seek)
    /// discards it.
    ///
    /// Outside [`SessionState::Playing`] this does nothing.
    pub fn pause(&mut self) -> Result<()> {
        if self.state == SessionState::Playing {
            self.pacing.reset();
            self.set_state(SessionState::Paused);
        }
        Ok(())
    }

    /// Reposition to `target_ms`.
    ///
    /// Every track closes its timestamp segment first, so output
    /// timestamps continue monotonically across the jump. A target past
    /// the duration is rejected before anything changes.
    pub fn seek(&mut self, target_ms: u64) -> Result<()> {
        if self.state == SessionState::Ended {
            return Err(SourceError::InvalidState {
                operation: "seek",
                state: self.state,
            });
        }
        let duration_ms = self.demuxer.duration_ms();
        if target_ms > duration_ms {
            return Err(SourceError::SeekOutOfRange {
                target_ms,
                duration_ms,
            });
        }

        for track in &mut self.tracks {
            track.close_segment();
        }
        self.pending = None;
        self.pacing.reset();
        self.demuxer.seek(target_ms)?;
        tracing::debug!(name = %self.name, target_ms, "seeked");
        Ok(())
    }

    /// Change the playback rate multiplier and re-anchor pacing.
    pub fn set_speed(&mut self, speed: f64) -> Result<()> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(SourceError::InvalidSpeed(speed));
        }
        self.pacing.set_speed(speed);
        tracing::debug!(name = %self.name, speed, "speed changed");
        Ok(())
    }

    pub fn duration_ms(&self) -> u64 {
        self.demuxer.duration_ms()
    }

    /// Concatenated SDP media descriptions of all tracks, in stream order.
    pub fn capability_description(&self) -> &str {
        &self.description
    }

    /// `RTP-Info` header value for a PLAY response on `base_uri`.
    pub fn play_info(&self, base_uri: &str) -> String {
        let entries: Vec<RtpInfo> = self.tracks.iter().map(Track::rtp_info).collect();
        rtp_info::header_value(base_uri, &entries)
    }

    /// Point the track named by `label` (e.g. `track0`) at
    /// `address:rtp_port` / `address:rtcp_port`.
    ///
    /// Rebinding replaces the previous destination.
    pub fn bind_track_transport(
        &mut self,
        label: &str,
        address: &str,
        rtp_port: u16,
        rtcp_port: u16,
    ) -> Result<()> {
        let unknown = || SourceError::UnknownTrack(label.to_string());
        let index = transport::track_index(label).ok_or_else(unknown)?;
        let slot = self.track_slot(index).ok_or_else(unknown)?;
        let binding = TrackTransport::resolve(address, rtp_port, rtcp_port, self.sink.clone())?;
        self.tracks[slot].bind(binding);
        Ok(())
    }

    /// Release the demuxer and every track.
    ///
    /// No BYE is sent here; a track that reached end of stream already sent its own.
    pub fn close(self) {
        tracing::info!(name = %self.name, state = %self.state, "media source closed");
    }
}

impl std::fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSource")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("tracks", &self.tracks)
            .field("pending", &self.pending.as_ref().map(|p| p.pts_ms))
            .finish_non_exhaustive()
    }
}
