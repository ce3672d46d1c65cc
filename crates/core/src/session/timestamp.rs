/// Per-track output timeline that survives seeks.
///
/// Output time for a unit is `base + (pts - segment_first)`, in
/// milliseconds. Closing a segment moves `base` past everything emitted in
/// it, so the next segment continues where the previous one stopped even
/// when presentation time jumps backwards or resets.
#[derive(Debug, Default, Clone)]
pub struct TimestampTracker {
    base_ms: u64,
    first_ms: Option<i64>,
    last_ms: i64,
}

impl TimestampTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output time in milliseconds for a unit presented at `pts_ms`.
    ///
    /// The first unit after a segment boundary becomes the segment origin.
    pub fn stamp(&mut self, pts_ms: i64) -> u64 {
        let first = match self.first_ms {
            Some(first) => {
                self.last_ms = self.last_ms.max(pts_ms);
                first
            }
            None => {
                self.first_ms = Some(pts_ms);
                self.last_ms = pts_ms;
                pts_ms
            }
        };
        let offset = pts_ms.saturating_sub(first);
        if offset >= 0 {
            self.base_ms.saturating_add(offset as u64)
        } else {
            self.base_ms.saturating_sub(offset.unsigned_abs())
        }
    }

    /// End the current segment: `base += last - first + 1`.
    ///
    /// A segment that emitted nothing leaves `base` untouched, so closing
    /// twice in a row is harmless.
    pub fn close_segment(&mut self) {
        if let Some(first) = self.first_ms.take() {
            let span = self.last_ms.saturating_sub(first).max(0) as u64 + 1;
            self.base_ms = self.base_ms.saturating_add(span);
        }
    }

    pub fn base_ms(&self) -> u64 {
        self.base_ms
    }

    /// Whether a unit was stamped since the last segment boundary.
    pub fn in_segment(&self) -> bool {
        self.first_ms.is_some()
    }
}

/// Rescale milliseconds to a media clock (`ms * rate / 1000`).
pub fn to_clock_rate(ms: u64, clock_rate: u32) -> u64 {
    ms * clock_rate as u64 / 1000
}
