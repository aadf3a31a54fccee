use anyhow::Context;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use super::{ModelSize, SpeechRecognizer};
use crate::extractors::{ExtractMode, MediaExtractor};
use crate::transcribe::{SpeechProvider, TranscriptRecord, TranscriptSource, VideoDetails};
use crate::{Result, TranscriberError};

/// Downloads a video's audio and runs it through the speech model
pub struct SpeechTranscriber {
    extractor: Arc<dyn MediaExtractor>,
    recognizer: Arc<dyn SpeechRecognizer>,
    model: ModelSize,
    temp_dir: Option<PathBuf>,
}

impl SpeechTranscriber {
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        recognizer: Arc<dyn SpeechRecognizer>,
        model: ModelSize,
        temp_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            extractor,
            recognizer,
            model,
            temp_dir,
        }
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("transcriber-");
        let dir = match &self.temp_dir {
            Some(base) => builder.tempdir_in(base),
            None => builder.tempdir(),
        };
        dir.context("Failed to create temporary directory")
    }
}

#[async_trait]
impl SpeechProvider for SpeechTranscriber {
    async fn transcribe(&self, video_url: &str) -> Result<TranscriptRecord> {
        let started = Instant::now();

        // Fail before spending time on the download.
        self.recognizer.load(self.model).await?;

        let info = self
            .extractor
            .extract_info(video_url, ExtractMode::Full)
            .await?
            .ok_or_else(|| TranscriberError::UnresolvableUrl(video_url.to_string()))?;

        // Removed on drop, including when the request is abandoned mid-way.
        let scratch = self.scratch_dir()?;
        let audio_path = self.extractor.download_audio(video_url, scratch.path()).await?;

        let output = self.recognizer.transcribe_file(&audio_path, self.model).await?;
        let segments = (!output.segments.is_empty()).then_some(output.segments);

        Ok(TranscriptRecord::new(
            VideoDetails::from_info(&info, video_url),
            output.language.unwrap_or_else(|| "unknown".to_string()),
            output.text,
            segments,
            TranscriptSource::SpeechModel,
            started,
        ))
    }
}
