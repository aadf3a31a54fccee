//! Caption payload normalization.
//!
//! Both caption encodings the engine offers are reduced to the same shape: an ordered
//! list of unique plain-text lines, each optionally tagged with the offset it starts at.

use anyhow::Context;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;

pub mod acquirer;

pub use acquirer::{select_track, CaptionAcquirer, TrackKind};

use crate::transcribe::Segment;
use crate::{Result, TranscriberError};

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag pattern"));

/// Caption encodings the normalizer understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptionEncoding {
    /// WebVTT cue blocks with inline markup
    TimedTextMarkup,
    /// YouTube `json3` timed events
    TimedEvents,
}

impl CaptionEncoding {
    pub fn from_ext(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "vtt" => Some(CaptionEncoding::TimedTextMarkup),
            "json3" => Some(CaptionEncoding::TimedEvents),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionEncoding::TimedTextMarkup => "vtt",
            CaptionEncoding::TimedEvents => "json3",
        }
    }
}

/// One retained caption line
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLine {
    pub offset_seconds: Option<f64>,
    pub text: String,
}

/// Deduplicated caption lines in first-occurrence order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CaptionText {
    lines: Vec<CaptionLine>,
    seen: HashSet<String>,
}

impl CaptionText {
    fn push(&mut self, raw: &str, offset_seconds: Option<f64>) {
        let text = collapse_whitespace(raw);
        if text.is_empty() || self.seen.contains(&text) {
            return;
        }
        self.seen.insert(text.clone());
        self.lines.push(CaptionLine { offset_seconds, text });
    }

    fn finish(self) -> Result<Self> {
        if self.lines.is_empty() {
            return Err(TranscriberError::EmptyTranscript.into());
        }
        Ok(self)
    }

    pub fn lines(&self) -> &[CaptionLine] {
        &self.lines
    }

    /// Space-joined transcript text
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Timestamped lines, or `None` when the payload carried no timing
    pub fn segments(&self) -> Option<Vec<Segment>> {
        let segments: Vec<Segment> = self
            .lines
            .iter()
            .filter_map(|line| {
                line.offset_seconds.map(|offset_seconds| Segment {
                    offset_seconds,
                    text: line.text.clone(),
                })
            })
            .collect();

        (!segments.is_empty()).then_some(segments)
    }
}

/// Normalize a caption body in the given encoding.
///
/// Fails with [`TranscriberError::EmptyTranscript`] when no line survives.
pub fn normalize(encoding: CaptionEncoding, body: &str) -> Result<CaptionText> {
    match encoding {
        CaptionEncoding::TimedTextMarkup => normalize_vtt(body),
        CaptionEncoding::TimedEvents => normalize_timed_events(body),
    }
}

/// Normalize a WebVTT document.
///
/// Only cue payloads are kept. The file header, `NOTE`/`STYLE`/`REGION` blocks and
/// cue identifiers are dropped.
pub fn normalize_vtt(body: &str) -> Result<CaptionText> {
    let mut out = CaptionText::default();

    for (position, block) in vtt_blocks(body.trim_start_matches('\u{feff}')).iter().enumerate() {
        let first = block[0];
        if position == 0 && starts_block_with(first, "WEBVTT") {
            continue;
        }
        if ["NOTE", "STYLE", "REGION"].iter().any(|keyword| starts_block_with(first, keyword)) {
            continue;
        }

        // The timing line is first, or second after an identifier of any shape.
        let Some(timing) = block.iter().take(2).position(|line| line.contains("-->")) else {
            continue;
        };
        let cue_start = block[timing]
            .split_once("-->")
            .and_then(|(start, _)| parse_vtt_timestamp(start.trim()));

        for line in &block[timing + 1..] {
            let decoded = decode_entities(line);
            out.push(&MARKUP_TAG.replace_all(&decoded, ""), cue_start);
        }
    }

    out.finish()
}

/// Split a WebVTT document into blank-line separated blocks of trimmed lines
fn vtt_blocks(body: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in body.lines().map(str::trim) {
        if !line.is_empty() {
            current.push(line);
        } else if !current.is_empty() {
            blocks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// `keyword` alone or followed by whitespace, so `NOTEBOOK` is not a `NOTE` block
fn starts_block_with(line: &str, keyword: &str) -> bool {
    line.strip_prefix(keyword)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

#[derive(Debug, Deserialize)]
struct TimedEvents {
    #[serde(default)]
    events: Vec<TimedEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: Option<u64>,
    #[serde(default)]
    segs: Option<Vec<TimedSegment>>,
}

#[derive(Debug, Deserialize)]
struct TimedSegment {
    #[serde(default)]
    utf8: String,
}

/// Normalize a `json3` timed-events document
pub fn normalize_timed_events(body: &str) -> Result<CaptionText> {
    let document: TimedEvents = serde_json::from_str(body).context("Failed to parse json3 captions")?;
    let mut out = CaptionText::default();

    for event in document.events {
        let Some(segs) = event.segs else { continue };
        let text: String = segs.iter().map(|seg| seg.utf8.as_str()).collect();
        out.push(&text, event.start_ms.map(|ms| ms as f64 / 1000.0));
    }

    out.finish()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Parse `HH:MM:SS.mmm` or `MM:SS.mmm` into seconds
fn parse_vtt_timestamp(raw: &str) -> Option<f64> {
    let mut total = 0.0;
    for part in raw.split(':') {
        total = total * 60.0 + part.trim().parse::<f64>().ok()?;
    }
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VTT: &str = "WEBVTT\nKind: captions\nLanguage: en\n\n\
        1\n00:00:00.000 --> 00:00:02.500 align:start position:0%\n\
        Hello <c.colorE5E5E5>there</c>,   world\n\n\
        2\n00:00:02.500 --> 00:00:05.000\n\
        Hello there, world\n\
        <00:00:03.100><c>this is</c> new\n\n\
        3\n00:01:05.000 --> 00:01:07.000\n\
        Tom &amp; Jerry\n";

    #[test]
    fn vtt_strips_markup_and_dedups_in_first_occurrence_order() {
        let captions = normalize_vtt(VTT).unwrap();

        let texts: Vec<_> = captions.lines().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello there, world", "this is new", "Tom & Jerry"]);
        assert_eq!(captions.text(), "Hello there, world this is new Tom & Jerry");
        assert!(!captions.text().contains('<'));
    }

    #[test]
    fn vtt_keeps_cue_start_offsets() {
        let segments = normalize_vtt(VTT).unwrap().segments().unwrap();

        assert_eq!(segments[0].offset_seconds, 0.0);
        assert_eq!(segments[1].offset_seconds, 2.5);
        assert_eq!(segments[2].offset_seconds, 65.0);
    }

    #[test]
    fn dedup_is_document_wide_not_sliding() {
        let vtt = "WEBVTT\n\n00:00.000 --> 00:01.000\nA\n\n00:01.000 --> 00:02.000\nB\n\n00:02.000 --> 00:03.000\nA\n";
        assert_eq!(normalize_vtt(vtt).unwrap().text(), "A B");
    }

    #[test]
    fn header_only_vtt_is_empty_transcript() {
        let vtt = "WEBVTT\nKind: captions\nLanguage: en\n\n1\n00:00:00.000 --> 00:00:01.000\n\n";
        let err = normalize_vtt(vtt).unwrap_err();
        assert_eq!(TranscriberError::find(&err), Some(&TranscriberError::EmptyTranscript));
    }

    #[test]
    fn vtt_note_and_style_blocks_are_skipped() {
        let vtt = "WEBVTT\n\nNOTE this is a comment\nspanning lines\n\nSTYLE\n::cue { color: red }\n\n00:00.000 --> 00:01.000\nSpoken words\n";
        assert_eq!(normalize_vtt(vtt).unwrap().text(), "Spoken words");
    }

    #[test]
    fn all_caps_payload_lines_are_kept() {
        let vtt = "WEBVTT\n\n00:00.000 --> 00:01.000\nNOTEBOOK SALES ARE UP\nAND STYLE MATTERS\n\n00:01.000 --> 00:02.000\nREGIONAL NEWS\n\n00:02.000 --> 00:03.000\nNOTE\nWEBVTT FOREVER\n";
        assert_eq!(
            normalize_vtt(vtt).unwrap().text(),
            "NOTEBOOK SALES ARE UP AND STYLE MATTERS REGIONAL NEWS NOTE WEBVTT FOREVER"
        );
    }

    #[test]
    fn text_cue_identifiers_are_dropped() {
        let vtt = "WEBVTT\n\nintro\n00:00.000 --> 00:01.000\nHello\n\nscene-2\n00:01.000 --> 00:02.000\nWorld\n";
        let captions = normalize_vtt(vtt).unwrap();

        assert_eq!(captions.text(), "Hello World");
        assert_eq!(captions.segments().unwrap()[1].offset_seconds, 1.0);
    }

    #[test]
    fn escaped_markup_is_stripped_after_decoding() {
        let vtt = "WEBVTT\n\n00:00.000 --> 00:01.000\n&lt;i&gt;quiet&lt;/i&gt; please &amp; thanks\n";
        assert_eq!(normalize_vtt(vtt).unwrap().text(), "quiet please & thanks");
    }

    #[test]
    fn timed_events_concatenate_segments_with_offsets() {
        let json = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 1000, "id": 1, "wpWinPosId": 1},
                {"tStartMs": 1200, "dDurationMs": 2000, "segs": [{"utf8": "hello"}, {"utf8": " world", "tOffsetMs": 400}]},
                {"tStartMs": 3200, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 4000, "segs": [{"utf8": "hello  world"}]},
                {"tStartMs": 5500, "segs": [{"utf8": "second\nline"}]}
            ]
        }"#;

        let captions = normalize_timed_events(json).unwrap();
        assert_eq!(captions.text(), "hello world second line");

        let segments = captions.segments().unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].offset_seconds, 1.2);
        assert_eq!(segments[1].offset_seconds, 5.5);
    }

    #[test]
    fn timed_events_without_text_are_empty_transcript() {
        let err = normalize_timed_events(r#"{"events": [{"tStartMs": 0}]}"#).unwrap_err();
        assert_eq!(TranscriberError::find(&err), Some(&TranscriberError::EmptyTranscript));
    }

    #[test]
    fn malformed_timed_events_are_a_hard_error() {
        let err = normalize_timed_events("<transcript/>").unwrap_err();
        assert_eq!(TranscriberError::find(&err), None);
    }

    #[test]
    fn encoding_from_ext() {
        assert_eq!(CaptionEncoding::from_ext("VTT"), Some(CaptionEncoding::TimedTextMarkup));
        assert_eq!(CaptionEncoding::from_ext("json3"), Some(CaptionEncoding::TimedEvents));
        assert_eq!(CaptionEncoding::from_ext("srv3"), None);
    }
}
