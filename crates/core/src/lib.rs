//! Stream a media file as paced RTP/RTCP for an RTSP server.
//!
//! ```no_run
//! use media_source::demux::annexb::AnnexBDemuxer;
//! use media_source::{MediaSource, PlayOutcome};
//!
//! media_source::init();
//! let mut source = MediaSource::open::<AnnexBDemuxer>("movie.h264")?;
//! println!("{}", source.capability_description());
//! source.bind_track_transport("track0", "127.0.0.1", 5004, 5005)?;
//! while source.play()? != PlayOutcome::Ended {
//!     std::thread::sleep(std::time::Duration::from_millis(10));
//! }
//! # Ok::<(), media_source::SourceError>(())
//! ```

pub mod clock;
pub mod demux;
pub mod error;
pub mod media;
pub mod protocol;
pub mod rtcp;
pub mod session;
pub mod transport;

use std::sync::Once;
use std::sync::atomic::{AtomicBool, Ordering};

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ErrorCategory, Result, SourceError};
pub use session::{MediaSource, MediaSourceBuilder, PlayOutcome, SessionState, SourceConfig};

static INIT: Once = Once::new();
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// One-time library setup. Call before opening the first source; repeated
/// calls are no-ops.
pub fn init() {
    INIT.call_once(|| {
        INITIALIZED.store(true, Ordering::Release);
        tracing::debug!(version = env!("CARGO_PKG_VERSION"), "media source library initialized");
    });
}

/// Whether [`init`] has run.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}
