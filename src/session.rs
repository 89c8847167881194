// Capture session: the read loop from capture source to reports.
//
// Every frame is recorded; sampled frames are classified; summaries are
// emitted on the report interval. On every exit path the statistics are
// closed, the source is closed exactly once and the final report is written.

use std::io::Write;
use std::time::Duration;

use crate::capture::{CaptureEvent, CaptureSource};
use crate::error::CapstatError;
use crate::model::report::{Report, SampleReport, TotalsReport};
use crate::model::Classification;
use crate::output::{self, OutputFormat};
use crate::packet::{self, Frame};
use crate::shutdown::ShutdownToken;
use crate::stats::{CaptureStatistics, SampleDecision};

pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Longest wait for a frame before the shutdown token is checked again.
    pub poll_timeout: Duration,
    pub format: OutputFormat,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown token was set.
    Shutdown,
    /// The source ran out of frames.
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub reason: StopReason,
    pub report: TotalsReport,
}

/// Per-frame outcome, owned so the source can be used again.
struct FrameOutcome {
    decision: SampleDecision,
    sample: Option<SampleReport>,
}

/// One capture session over an owned source.
pub struct Session<S: CaptureSource> {
    source: S,
    stats: CaptureStatistics,
    shutdown: ShutdownToken,
    options: SessionOptions,
}

impl<S: CaptureSource> Session<S> {
    pub fn new(
        source: S,
        stats: CaptureStatistics,
        shutdown: ShutdownToken,
        options: SessionOptions,
    ) -> Self {
        Self {
            source,
            stats,
            shutdown,
            options,
        }
    }

    /// Run until shutdown, end of stream or a fatal error, writing reports to `out`.
    ///
    /// The final report is written even when the loop fails; the first error
    /// encountered is returned after teardown.
    pub fn run(mut self, out: &mut impl Write) -> Result<SessionSummary, CapstatError> {
        log::info!("capture session started on {}", self.source.name());

        let loop_result = self.capture_loop(out);

        self.stats.close();
        let dropped = self.source.drop_count();
        self.source.close();
        let report = self.stats.final_report(dropped)?;
        let written = output::write_report(&Report::Final(report), self.options.format, out);

        let reason = match loop_result {
            Ok(reason) => reason,
            Err(e) => {
                log::warn!("capture session on {} failed: {}", self.source.name(), e);
                return Err(e);
            }
        };
        written?;

        log::info!(
            "capture session on {} stopped ({:?}): {} packets, {} bytes, {} dropped",
            self.source.name(),
            reason,
            report.packets,
            report.bytes,
            report.dropped
        );
        Ok(SessionSummary { reason, report })
    }

    fn capture_loop(&mut self, out: &mut impl Write) -> Result<StopReason, CapstatError> {
        loop {
            if self.shutdown.is_requested() {
                return Ok(StopReason::Shutdown);
            }

            let outcome = match self.source.next_frame(self.options.poll_timeout)? {
                CaptureEvent::Frame(frame) => process_frame(&mut self.stats, &frame)?,
                CaptureEvent::Timeout => continue,
                CaptureEvent::EndOfStream => return Ok(StopReason::EndOfStream),
            };

            if let Some(sample) = outcome.sample {
                output::write_report(&Report::Sample(sample), self.options.format, out)?;
            }
            if outcome.decision.report_due {
                let summary = self.stats.summary(self.source.drop_count());
                output::write_report(&Report::Summary(summary), self.options.format, out)?;
            }
        }
    }
}

/// Record one frame and classify it when sampled.
///
/// Malformed and non-IP frames are counted but produce no sample.
fn process_frame(
    stats: &mut CaptureStatistics,
    frame: &Frame<'_>,
) -> Result<FrameOutcome, CapstatError> {
    let decision = stats.record(frame)?;
    if !decision.classify {
        return Ok(FrameOutcome {
            decision,
            sample: None,
        });
    }

    let packet_number = stats.snapshot().packets;
    let sample = match packet::classify(frame) {
        Ok(classification @ Classification::Ipv4 { .. }) => Some(SampleReport {
            packet_number,
            timestamp_us: frame.timestamp_us(),
            wire_len: frame.wire_len,
            classification,
        }),
        Ok(Classification::NotIp) => {
            log::debug!("packet #{packet_number}: non-IP frame, not reported");
            None
        }
        Err(e) => {
            log::debug!("packet #{packet_number}: skipped: {e}");
            None
        }
    };
    Ok(FrameOutcome { decision, sample })
}
