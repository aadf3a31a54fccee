use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::transcribe::TranscriptRecord;

pub mod formatters;

pub use formatters::*;

/// Render a transcript in the requested format
pub fn render(record: &TranscriptRecord, format: &OutputFormat, include_timestamps: bool) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(record, include_timestamps),
        OutputFormat::Json => format_as_json(record)?,
        OutputFormat::Markdown => format_as_markdown(record),
    })
}

/// Save transcript to file
pub async fn save_to_file(
    record: &TranscriptRecord,
    path: &Path,
    format: &OutputFormat,
    include_timestamps: bool,
) -> Result<()> {
    let content = render(record, format, include_timestamps)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print transcript to console
pub fn print_to_console(record: &TranscriptRecord, format: &OutputFormat, include_timestamps: bool) -> Result<()> {
    let content = render(record, format, include_timestamps)?;
    println!("{}", content);
    Ok(())
}
