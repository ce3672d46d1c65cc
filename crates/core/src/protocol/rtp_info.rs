/// One entry of an `RTP-Info` header value (RFC 2326 §12.33).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpInfo {
    /// Control label, e.g. `track0`.
    pub control: String,
    /// Sequence number of the next packet the track will send.
    pub seq: u16,
    /// RTP timestamp the next packet of the current segment maps to.
    pub rtptime: u32,
}

impl RtpInfo {
    /// `url=<base>/<control>;seq=<seq>;rtptime=<rtptime>`
    pub fn render(&self, base_uri: &str) -> String {
        format!(
            "url={}/{};seq={};rtptime={}",
            base_uri.trim_end_matches('/'),
            self.control,
            self.seq,
            self.rtptime
        )
    }
}

/// Comma-joined header value covering every track.
pub fn header_value(base_uri: &str, entries: &[RtpInfo]) -> String {
    entries
        .iter()
        .map(|entry| entry.render(base_uri))
        .collect::<Vec<_>>()
        .join(",")
}
