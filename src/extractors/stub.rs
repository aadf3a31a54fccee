use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{CaptionFormat, ExtractMode, MediaExtractor, MediaInfo};
use crate::{Result, TranscriberError};

#[derive(Default)]
struct Calls {
    flat: usize,
    full: usize,
    captions: usize,
    audio: usize,
}

/// In-memory extractor serving canned metadata and caption bodies.
///
/// Lets the classifier and the transcript pipeline run deterministically without
/// network access or yt-dlp installed.
#[derive(Default)]
pub struct StaticExtractor {
    infos: HashMap<String, MediaInfo>,
    failures: HashMap<String, String>,
    captions: HashMap<String, String>,
    audio: HashSet<String>,
    calls: Mutex<Calls>,
}

impl StaticExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `info` for `url` in both extraction modes
    pub fn with_info(mut self, url: impl Into<String>, info: MediaInfo) -> Self {
        self.infos.insert(url.into(), info);
        self
    }

    /// Fail every extraction of `url` with `message`
    pub fn with_failure(mut self, url: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(url.into(), message.into());
        self
    }

    /// Serve `body` when a caption variant with this URL is fetched
    pub fn with_caption(mut self, caption_url: impl Into<String>, body: impl Into<String>) -> Self {
        self.captions.insert(caption_url.into(), body.into());
        self
    }

    /// Allow audio downloads for `url`
    pub fn with_audio(mut self, url: impl Into<String>) -> Self {
        self.audio.insert(url.into());
        self
    }

    pub fn info_calls(&self, mode: ExtractMode) -> usize {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        match mode {
            ExtractMode::Flat => calls.flat,
            ExtractMode::Full => calls.full,
        }
    }

    pub fn caption_fetches(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).captions
    }

    pub fn audio_downloads(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).audio
    }

    fn record(&self, f: impl FnOnce(&mut Calls)) {
        f(&mut self.calls.lock().unwrap_or_else(|e| e.into_inner()));
    }
}

#[async_trait]
impl MediaExtractor for StaticExtractor {
    async fn extract_info(&self, url: &str, mode: ExtractMode) -> Result<Option<MediaInfo>> {
        self.record(|c| match mode {
            ExtractMode::Flat => c.flat += 1,
            ExtractMode::Full => c.full += 1,
        });

        if let Some(message) = self.failures.get(url) {
            return Err(TranscriberError::ExtractionFailed(message.clone()).into());
        }

        Ok(self.infos.get(url).cloned())
    }

    async fn fetch_caption(&self, format: &CaptionFormat) -> Result<String> {
        self.record(|c| c.captions += 1);

        self.captions
            .get(&format.url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Failed to download captions: HTTP 404 Not Found"))
    }

    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        self.record(|c| c.audio += 1);

        if !self.audio.contains(url) {
            return Err(TranscriberError::ExtractionFailed(format!("Failed to download audio: {}", url)).into());
        }

        let path = output_dir.join("audio.mp3");
        tokio::fs::write(&path, b"ID3").await?;
        Ok(path)
    }

    fn engine_name(&self) -> &'static str {
        "static"
    }
}
