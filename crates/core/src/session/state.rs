use std::fmt;

/// Playback state of a media source.
///
/// ```text
/// Idle ──play──▶ Playing ◀──play── Paused
///                   │                 ▲
///                   └──────pause──────┘
/// Playing ──end of stream──▶ Ended (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Opened, nothing sent yet.
    #[default]
    Idle = 0,
    /// Packets are paced out on every `play()` call.
    Playing = 1,
    /// Delivery suspended; the next `play()` re-anchors the pacing clock.
    Paused = 2,
    /// The demuxer reported end of stream and every track sent its BYE.
    Ended = 3,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Playing => write!(f, "playing"),
            Self::Paused => write!(f, "paused"),
            Self::Ended => write!(f, "ended"),
        }
    }
}
