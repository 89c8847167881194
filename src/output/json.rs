use std::io::Write;

use crate::error::CapstatError;
use crate::model::report::Report;

/// Write a report as a single JSON line.
pub fn write_json(report: &Report, writer: &mut impl Write) -> Result<(), CapstatError> {
    serde_json::to_writer(&mut *writer, report)
        .map_err(|e| CapstatError::Output(e.into()))?;
    writeln!(writer).map_err(CapstatError::Output)
}
