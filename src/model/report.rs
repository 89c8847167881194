use serde::Serialize;

use crate::model::Classification;

/// One sampled frame that classified as IPv4.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct SampleReport {
    /// Position of the frame in the session, counting from 1.
    pub packet_number: u64,
    /// Capture timestamp in microseconds since epoch.
    pub timestamp_us: u64,
    /// Original wire length of the frame.
    pub wire_len: u32,
    pub classification: Classification,
}

/// Counter totals at a point in the session.
#[derive(Clone, Copy, Debug, Default, Serialize, PartialEq, Eq)]
pub struct TotalsReport {
    pub packets: u64,
    pub bytes: u64,
    /// Frames the capture layer reported as dropped.
    pub dropped: u64,
}

/// A report line emitted by a running session.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Report {
    Sample(SampleReport),
    Summary(TotalsReport),
    Final(TotalsReport),
}
