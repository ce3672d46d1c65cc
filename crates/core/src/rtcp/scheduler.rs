use super::RtcpReporter;

/// Decides when a track emits sender reports and its single BYE.
///
/// A report is due on the first RTP transmission, then whenever a
/// transmission happens at or after `last report + interval`. The interval
/// is sampled once per report. After the BYE no further reports are
/// produced.
#[derive(Debug, Default)]
pub struct RtcpScheduler {
    last_report_ms: Option<u64>,
    next_report_ms: u64,
    bye_sent: bool,
}

impl RtcpScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every RTP packet about to be sent. Returns the sender
    /// report to send first, if one is due.
    ///
    /// A report that fails to encode is logged and skipped; the schedule
    /// still advances.
    pub fn poll_report(&mut self, reporter: &mut dyn RtcpReporter, now_ms: u64) -> Option<Vec<u8>> {
        if self.bye_sent {
            return None;
        }
        if self.last_report_ms.is_some() && now_ms < self.next_report_ms {
            return None;
        }

        let report = reporter.sender_report(now_ms);
        let interval = reporter.report_interval_ms();
        self.last_report_ms = Some(now_ms);
        self.next_report_ms = now_ms.saturating_add(interval);
        tracing::trace!(now_ms, next_ms = self.next_report_ms, "RTCP sender report due");
        report
            .inspect_err(|e| tracing::warn!(error = %e, "RTCP sender report not encoded"))
            .ok()
    }

    /// The BYE for this track, exactly once.
    pub fn poll_bye(&mut self, reporter: &mut dyn RtcpReporter) -> Option<Vec<u8>> {
        if self.bye_sent {
            return None;
        }
        self.bye_sent = true;
        reporter
            .bye()
            .inspect_err(|e| tracing::warn!(error = %e, "RTCP BYE not encoded"))
            .ok()
    }

    pub fn last_report_ms(&self) -> Option<u64> {
        self.last_report_ms
    }

    pub fn bye_sent(&self) -> bool {
        self.bye_sent
    }
}
