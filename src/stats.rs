// Rolling capture statistics and the sample/summary decision.

use crate::error::CapstatError;
use crate::model::report::TotalsReport;
use crate::packet::Frame;

pub const DEFAULT_SAMPLE_INTERVAL: u64 = 100;
pub const DEFAULT_REPORT_INTERVAL: u64 = 10_000;

/// How often frames are classified and summaries are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsConfig {
    sample_interval: u64,
    report_interval: u64,
}

impl StatsConfig {
    /// Both intervals count frames and must be at least 1.
    pub fn new(sample_interval: u64, report_interval: u64) -> Result<Self, CapstatError> {
        if sample_interval == 0 {
            return Err(CapstatError::InvalidConfig(
                "sample interval must be at least 1".to_string(),
            ));
        }
        if report_interval == 0 {
            return Err(CapstatError::InvalidConfig(
                "report interval must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            sample_interval,
            report_interval,
        })
    }

    pub fn sample_interval(&self) -> u64 {
        self.sample_interval
    }

    pub fn report_interval(&self) -> u64 {
        self.report_interval
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

/// What the caller should do with the frame that was just recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleDecision {
    /// Pass this frame to the classifier.
    pub classify: bool,
    /// A summary report is due after this frame.
    pub report_due: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub packets: u64,
    pub bytes: u64,
}

/// Packet and byte counters for one capture session.
///
/// Created at session start with zeroed counters. Every successful
/// [`record`](Self::record) adds one packet and the frame's wire length.
/// Once closed, `record` is rejected while `snapshot` keeps working.
#[derive(Debug)]
pub struct CaptureStatistics {
    config: StatsConfig,
    packets_seen: u64,
    bytes_seen: u64,
    state: SessionState,
    final_taken: bool,
}

impl CaptureStatistics {
    pub fn new(config: StatsConfig) -> Self {
        Self {
            config,
            packets_seen: 0,
            bytes_seen: 0,
            state: SessionState::Active,
            final_taken: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Count one delivered frame and decide whether to classify it and
    /// whether a summary is due.
    pub fn record(&mut self, frame: &Frame<'_>) -> Result<SampleDecision, CapstatError> {
        if self.state == SessionState::Closed {
            return Err(CapstatError::SessionClosed);
        }
        self.packets_seen += 1;
        self.bytes_seen += u64::from(frame.wire_len);

        Ok(SampleDecision {
            classify: self.packets_seen % self.config.sample_interval == 0,
            report_due: self.packets_seen % self.config.report_interval == 0,
        })
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets: self.packets_seen,
            bytes: self.bytes_seen,
        }
    }

    /// Totals for a periodic summary.
    pub fn summary(&self, dropped: u64) -> TotalsReport {
        let snap = self.snapshot();
        TotalsReport {
            packets: snap.packets,
            bytes: snap.bytes,
            dropped,
        }
    }

    /// Move to the closed state. Further `record` calls fail.
    pub fn close(&mut self) {
        if self.state == SessionState::Active {
            log::debug!(
                "statistics closed at {} packets, {} bytes",
                self.packets_seen,
                self.bytes_seen
            );
        }
        self.state = SessionState::Closed;
    }

    /// Close the session and return its final totals. Only the first call
    /// succeeds.
    pub fn final_report(&mut self, dropped: u64) -> Result<TotalsReport, CapstatError> {
        if self.final_taken {
            return Err(CapstatError::FinalReportTaken);
        }
        self.close();
        self.final_taken = true;
        Ok(self.summary(dropped))
    }
}
