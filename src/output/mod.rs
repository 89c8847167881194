pub mod json;
pub mod text;

use std::io::Write;

use clap::ValueEnum;

use crate::error::CapstatError;
use crate::model::report::Report;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable lines and statistics blocks
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Write one report in the specified format and flush it.
pub fn write_report(
    report: &Report,
    format: OutputFormat,
    writer: &mut impl Write,
) -> Result<(), CapstatError> {
    match format {
        OutputFormat::Text => text::write_text(report, writer)?,
        OutputFormat::Json => json::write_json(report, writer)?,
    }
    writer.flush().map_err(CapstatError::Output)
}
