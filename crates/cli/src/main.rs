use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use media_source::demux::annexb::AnnexBDemuxer;
use media_source::protocol::{SessionOrigin, session_description};
use media_source::transport::UdpTransport;
use media_source::{MediaSource, PlayOutcome, SourceConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rtsp-file-source",
    about = "Stream a raw H.264 file as paced RTP/RTCP to a UDP destination"
)]
struct Args {
    /// Raw H.264 Annex B file (.h264 / .264)
    file: PathBuf,

    /// Frame rate used to stamp access units
    #[arg(long, default_value_t = 25)]
    fps: u32,

    /// Destination host
    #[arg(long, short, default_value = "127.0.0.1")]
    dest: String,

    /// Destination RTP port
    #[arg(long, default_value_t = 5004)]
    rtp_port: u16,

    /// Destination RTCP port (defaults to RTP port + 1)
    #[arg(long)]
    rtcp_port: Option<u16>,

    /// Local bind address (host:port)
    #[arg(long, short, default_value = "0.0.0.0:0")]
    bind: String,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Start position in milliseconds
    #[arg(long)]
    seek: Option<u64>,

    /// Largest RTP payload in bytes
    #[arg(long, default_value_t = 1400)]
    mtu: usize,

    /// Milliseconds between play calls
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,
}

fn run(args: Args) -> media_source::Result<()> {
    media_source::init();

    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.file.display().to_string());
    let demuxer = AnnexBDemuxer::open_with_fps(&args.file, args.fps)?;
    let socket = UdpTransport::bind_to(&args.bind)?;
    let config = SourceConfig {
        mtu: args.mtu,
        packet_capacity: args.mtu + 100,
        ..Default::default()
    };

    let mut source = MediaSource::builder()
        .config(config)
        .transport(Arc::new(socket))
        .build(&name, Box::new(demuxer))?;

    let origin = SessionOrigin {
        address: args.dest.clone(),
        session_name: name.clone(),
        ..Default::default()
    };
    println!(
        "{}",
        session_description(&origin, source.duration_ms(), source.capability_description())
    );

    let rtcp_port = args.rtcp_port.unwrap_or(args.rtp_port.wrapping_add(1));
    for track in source.tracks().iter().map(|t| t.control()).collect::<Vec<_>>() {
        source.bind_track_transport(&track, &args.dest, args.rtp_port, rtcp_port)?;
    }
    source.set_speed(args.speed)?;
    if let Some(position) = args.seek {
        source.seek(position)?;
    }
    tracing::info!(
        "RTP-Info: {}",
        source.play_info(&format!("rtsp://{}/{}", args.dest, name))
    );

    let tick = Duration::from_millis(args.tick_ms.max(1));
    loop {
        match source.play() {
            Ok(PlayOutcome::Ended) => break,
            Ok(_) => {}
            Err(e) if e.is_recoverable() => tracing::warn!(error = %e, "continuing"),
            Err(e) => return Err(e),
        }
        thread::sleep(tick);
    }

    source.close();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("rtsp-file-source: {e} ({})", e.category());
        std::process::exit(1);
    }
}
