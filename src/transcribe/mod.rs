use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::extractors::MediaInfo;
use crate::utils::{extract_video_id, format_optional_duration};
use crate::{Result, TranscriberError};

pub mod batch;

pub use batch::{BatchEvent, BatchPlan, BatchRunner};

/// Transcript for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub title: String,

    pub channel: String,

    /// Formatted duration (`M:SS`, `H:MM:SS` or `Unknown`)
    pub duration: String,

    /// Caption language code or the language the speech model detected
    pub language: String,

    /// Plain-text transcript
    pub transcript: String,

    /// Per-line offsets, when the source provided timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<Segment>>,

    pub video_id: String,

    pub source: TranscriptSource,

    pub processing_time_seconds: f64,
}

/// One timed transcript line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start offset in seconds
    pub offset_seconds: f64,

    pub text: String,
}

/// Where a transcript came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptSource {
    #[serde(rename = "captions")]
    Captions,
    #[serde(rename = "speech-model")]
    SpeechModel,
}

impl std::fmt::Display for TranscriptSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptSource::Captions => write!(f, "captions"),
            TranscriptSource::SpeechModel => write!(f, "speech-model"),
        }
    }
}

/// Descriptive fields shared by every transcript of a video
#[derive(Debug, Clone, PartialEq)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub duration: String,
}

impl VideoDetails {
    pub fn from_info(info: &MediaInfo, url: &str) -> Self {
        Self {
            video_id: info
                .id
                .clone()
                .or_else(|| extract_video_id(url))
                .unwrap_or_default(),
            title: info.title.clone().unwrap_or_else(|| "Unknown".to_string()),
            channel: info
                .channel
                .clone()
                .or_else(|| info.uploader.clone())
                .unwrap_or_else(|| "Unknown".to_string()),
            duration: format_optional_duration(info.duration),
        }
    }
}

impl TranscriptRecord {
    pub fn new(
        details: VideoDetails,
        language: String,
        transcript: String,
        segments: Option<Vec<Segment>>,
        source: TranscriptSource,
        started: Instant,
    ) -> Self {
        let elapsed = started.elapsed().as_secs_f64();
        Self {
            title: details.title,
            channel: details.channel,
            duration: details.duration,
            language,
            transcript,
            segments,
            video_id: details.video_id,
            source,
            processing_time_seconds: (elapsed * 100.0).round() / 100.0,
        }
    }
}

/// Produces a transcript from existing caption tracks
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// `Ok(None)` when the video has no usable captions
    async fn acquire(&self, video_url: &str) -> Result<Option<TranscriptRecord>>;
}

/// Produces a transcript by running speech recognition over the audio
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn transcribe(&self, video_url: &str) -> Result<TranscriptRecord>;
}

/// Single-video transcript pipeline: captions first, speech recognition only when
/// the video has none.
pub struct TranscriptionPipeline {
    captions: Arc<dyn CaptionProvider>,
    speech: Option<Arc<dyn SpeechProvider>>,
}

impl TranscriptionPipeline {
    /// `speech` is `None` when the fallback is switched off
    pub fn new(captions: Arc<dyn CaptionProvider>, speech: Option<Arc<dyn SpeechProvider>>) -> Self {
        Self { captions, speech }
    }

    /// Transcript for one video URL
    pub async fn get_transcript(&self, video_url: &str) -> Result<TranscriptRecord> {
        tracing::info!("Fetching transcript for: {}", video_url);

        if let Some(record) = self.captions.acquire(video_url).await? {
            tracing::info!(
                "Using {} captions for '{}' ({} chars)",
                record.language,
                record.title,
                record.transcript.len()
            );
            return Ok(record);
        }

        let Some(speech) = &self.speech else {
            tracing::info!("No captions for {} and speech fallback is disabled", video_url);
            return Err(TranscriberError::NoCaptions.into());
        };

        tracing::info!("No captions for {}, falling back to speech recognition", video_url);
        speech.transcribe(video_url).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(title: &str, source: TranscriptSource) -> TranscriptRecord {
        TranscriptRecord {
            title: title.to_string(),
            channel: "Channel".to_string(),
            duration: "1:00".to_string(),
            language: "en".to_string(),
            transcript: format!("{} transcript", title),
            segments: None,
            video_id: "dQw4w9WgXcQ".to_string(),
            source,
            processing_time_seconds: 0.1,
        }
    }

    #[tokio::test]
    async fn captions_short_circuit_speech() {
        let mut captions = MockCaptionProvider::new();
        captions
            .expect_acquire()
            .times(1)
            .returning(|_| Ok(Some(record("Talk", TranscriptSource::Captions))));

        let mut speech = MockSpeechProvider::new();
        speech.expect_transcribe().times(0);

        let pipeline = TranscriptionPipeline::new(Arc::new(captions), Some(Arc::new(speech)));
        let result = pipeline.get_transcript("https://youtu.be/dQw4w9WgXcQ").await.unwrap();

        assert_eq!(result.source, TranscriptSource::Captions);
    }

    #[tokio::test]
    async fn missing_captions_trigger_exactly_one_speech_run() {
        let mut captions = MockCaptionProvider::new();
        captions.expect_acquire().times(1).returning(|_| Ok(None));

        let mut speech = MockSpeechProvider::new();
        speech
            .expect_transcribe()
            .withf(|url| url == "https://youtu.be/dQw4w9WgXcQ")
            .times(1)
            .returning(|_| Ok(record("Talk", TranscriptSource::SpeechModel)));

        let pipeline = TranscriptionPipeline::new(Arc::new(captions), Some(Arc::new(speech)));
        let result = pipeline.get_transcript("https://youtu.be/dQw4w9WgXcQ").await.unwrap();

        assert_eq!(result.source, TranscriptSource::SpeechModel);
    }

    #[tokio::test]
    async fn disabled_fallback_reports_no_captions() {
        let mut captions = MockCaptionProvider::new();
        captions.expect_acquire().returning(|_| Ok(None));

        let pipeline = TranscriptionPipeline::new(Arc::new(captions), None);
        let err = pipeline.get_transcript("https://youtu.be/dQw4w9WgXcQ").await.unwrap_err();

        assert_eq!(TranscriberError::find(&err), Some(&TranscriberError::NoCaptions));
    }

    #[tokio::test]
    async fn caption_errors_do_not_fall_back() {
        let mut captions = MockCaptionProvider::new();
        captions
            .expect_acquire()
            .returning(|_| Err(anyhow::anyhow!("Failed to download captions: HTTP 500")));

        let mut speech = MockSpeechProvider::new();
        speech.expect_transcribe().times(0);

        let pipeline = TranscriptionPipeline::new(Arc::new(captions), Some(Arc::new(speech)));
        assert!(pipeline.get_transcript("https://youtu.be/dQw4w9WgXcQ").await.is_err());
    }

    #[test]
    fn record_serializes_source_and_omits_missing_segments() {
        let json = serde_json::to_value(record("Talk", TranscriptSource::SpeechModel)).unwrap();

        assert_eq!(json["source"], "speech-model");
        assert!(json.get("segments").is_none());
        assert_eq!(json["video_id"], "dQw4w9WgXcQ");
    }

    #[test]
    fn details_fall_back_to_uploader_and_url_id() {
        let info = MediaInfo {
            uploader: Some("Uploader".to_string()),
            duration: Some(3661.0),
            ..Default::default()
        };
        let details = VideoDetails::from_info(&info, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");

        assert_eq!(details.title, "Unknown");
        assert_eq!(details.channel, "Uploader");
        assert_eq!(details.duration, "1:01:01");
        assert_eq!(details.video_id, "dQw4w9WgXcQ");
    }
}
