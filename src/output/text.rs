use std::io::Write;

use crate::error::CapstatError;
use crate::model::report::{Report, SampleReport, TotalsReport};

/// Write a report as plain text.
///
/// Samples are one line each; summaries and the final report are a framed
/// statistics block.
pub fn write_text(report: &Report, writer: &mut impl Write) -> Result<(), CapstatError> {
    write_text_inner(report, writer).map_err(CapstatError::Output)
}

fn write_text_inner(report: &Report, w: &mut impl Write) -> Result<(), std::io::Error> {
    match report {
        Report::Sample(sample) => write_sample(sample, w),
        Report::Summary(totals) => write_totals(totals, w),
        Report::Final(totals) => {
            writeln!(w)?;
            write_totals(totals, w)
        }
    }
}

fn write_sample(sample: &SampleReport, w: &mut impl Write) -> Result<(), std::io::Error> {
    writeln!(
        w,
        "Packet #{}: {}, size={} bytes",
        sample.packet_number, sample.classification, sample.wire_len
    )
}

fn write_totals(totals: &TotalsReport, w: &mut impl Write) -> Result<(), std::io::Error> {
    writeln!(w, "=== Statistics ===")?;
    writeln!(w, "Packets received: {}", totals.packets)?;
    writeln!(w, "Bytes received: {}", totals.bytes)?;
    writeln!(w, "Packets dropped: {}", totals.dropped)?;
    writeln!(w, "==================")
}
