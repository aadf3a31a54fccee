use anyhow::Result;

use crate::transcribe::TranscriptRecord;
use crate::utils::format_duration;

/// Plain transcript, or one `[M:SS] line` per segment when timestamps are requested
pub fn format_as_text(record: &TranscriptRecord, include_timestamps: bool) -> String {
    match (&record.segments, include_timestamps) {
        (Some(segments), true) => segments
            .iter()
            .map(|seg| format!("[{}] {}", format_duration(seg.offset_seconds as u64), seg.text))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => record.transcript.clone(),
    }
}

pub fn format_as_json(record: &TranscriptRecord) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Markdown document with a metadata header
pub fn format_as_markdown(record: &TranscriptRecord) -> String {
    format!(
        "# {}\n\n**Channel:** {}  \n**Duration:** {}  \n**Language:** {}  \n**Source:** {}  \n\n---\n\n{}\n",
        record.title, record.channel, record.duration, record.language, record.source, record.transcript
    )
}

/// All transcripts of a collection as one markdown document
pub fn format_batch_as_markdown(title: &str, records: &[TranscriptRecord]) -> String {
    let body = records
        .iter()
        .map(format_as_markdown)
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!("# {}\n\n{}", title, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::{Segment, TranscriptSource};

    fn record() -> TranscriptRecord {
        TranscriptRecord {
            title: "Talk".to_string(),
            channel: "Conf".to_string(),
            duration: "1:02:03".to_string(),
            language: "en".to_string(),
            transcript: "hello world".to_string(),
            segments: Some(vec![
                Segment {
                    offset_seconds: 0.0,
                    text: "hello".to_string(),
                },
                Segment {
                    offset_seconds: 75.4,
                    text: "world".to_string(),
                },
            ]),
            video_id: "dQw4w9WgXcQ".to_string(),
            source: TranscriptSource::Captions,
            processing_time_seconds: 1.25,
        }
    }

    #[test]
    fn text_with_and_without_timestamps() {
        assert_eq!(format_as_text(&record(), false), "hello world");
        assert_eq!(format_as_text(&record(), true), "[0:00] hello\n[1:15] world");

        let mut untimed = record();
        untimed.segments = None;
        assert_eq!(format_as_text(&untimed, true), "hello world");
    }

    #[test]
    fn markdown_has_header_and_body() {
        let md = format_as_markdown(&record());

        assert!(md.starts_with("# Talk\n"));
        assert!(md.contains("**Channel:** Conf"));
        assert!(md.contains("**Source:** captions"));
        assert!(md.ends_with("---\n\nhello world\n"));
    }

    #[test]
    fn batch_markdown_separates_records() {
        let md = format_batch_as_markdown("Course", &[record(), record()]);

        assert!(md.starts_with("# Course\n\n# Talk"));
        assert_eq!(md.matches("# Talk").count(), 2);
    }
}
