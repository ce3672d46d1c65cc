use crate::demux::DemuxPacket;

/// Wall-clock pacing of demuxed packets.
///
/// A segment is anchored by its first packet: the wall-clock time it was
/// tested and its decode timestamp become the origin. A packet is due once
///
/// ```text
/// (now - anchor) * speed + baseline >= pts
/// ```
#[derive(Debug, Clone)]
pub struct PacingEngine {
    anchor_ms: Option<u64>,
    baseline_ms: i64,
    speed: f64,
}

impl Default for PacingEngine {
    fn default() -> Self {
        Self {
            anchor_ms: None,
            baseline_ms: 0,
            speed: 1.0,
        }
    }
}

impl PacingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `packet` should leave now. Anchors the segment if needed.
    pub fn is_due(&mut self, now_ms: u64, packet: &DemuxPacket) -> bool {
        let anchor = match self.anchor_ms {
            Some(anchor) if anchor <= now_ms => anchor,
            _ => {
                self.anchor_ms = Some(now_ms);
                self.baseline_ms = packet.dts_ms;
                tracing::trace!(now_ms, baseline_ms = packet.dts_ms, "pacing anchored");
                now_ms
            }
        };
        let elapsed = ((now_ms - anchor) as f64 * self.speed).floor() as i64;
        elapsed.saturating_add(self.baseline_ms) >= packet.pts_ms
    }

    /// Forget the anchor; the next packet tested starts a new pacing segment.
    pub fn reset(&mut self) {
        self.anchor_ms = None;
        self.baseline_ms = 0;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Change the multiplier and re-anchor so elapsed time is not rescaled retroactively.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
        self.reset();
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor_ms.is_some()
    }
}
