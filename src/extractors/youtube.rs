use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{ExtractMode, MediaExtractor, MediaInfo};
use crate::{Result, TranscriberError};

/// YouTube metadata, caption and audio extractor using yt-dlp
pub struct YtDlpExtractor {
    yt_dlp_path: String,
    client: reqwest::Client,
}

impl YtDlpExtractor {
    pub fn new() -> Self {
        Self::with_path("yt-dlp")
    }

    pub fn with_path(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn info_args(mode: ExtractMode) -> &'static [&'static str] {
        match mode {
            ExtractMode::Flat => &["--dump-single-json", "--flat-playlist", "--no-warnings"],
            ExtractMode::Full => &[
                "--dump-single-json",
                "--no-playlist",
                "--skip-download",
                "--no-warnings",
            ],
        }
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        Command::new(&self.yt_dlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(TranscriberError::ExtractionFailed(format!(
                        "{} is not available. Please install it: https://github.com/yt-dlp/yt-dlp",
                        self.yt_dlp_path
                    )))
                } else {
                    anyhow::Error::new(e).context(format!("Failed to run {}", self.yt_dlp_path))
                }
            })
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    async fn extract_info(&self, url: &str, mode: ExtractMode) -> Result<Option<MediaInfo>> {
        tracing::debug!("Extracting {:?} info for: {}", mode, url);

        let mut args = Self::info_args(mode).to_vec();
        args.push("--");
        args.push(url);

        let output = self.run(&args).await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::ExtractionFailed(error.trim().to_string()).into());
        }

        let json_str = String::from_utf8(output.stdout)?;
        if json_str.trim().is_empty() {
            return Ok(None);
        }

        // Parsed straight from text so caption languages keep their reported order.
        let info: Option<MediaInfo> = serde_json::from_str(&json_str)?;
        Ok(info)
    }

    async fn fetch_caption(&self, format: &super::CaptionFormat) -> Result<String> {
        tracing::debug!("Downloading {} captions", format.ext);

        let response = self.client.get(&format.url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download captions: HTTP {}", response.status());
        }

        Ok(response.text().await?)
    }

    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        tracing::debug!("Downloading audio for: {}", url);

        let template = output_dir.join("audio.%(ext)s").to_string_lossy().into_owned();

        let output = self
            .run(&[
                "--output",
                template.as_str(),
                "--format",
                "bestaudio/best",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--no-playlist",
                "--no-warnings",
                "--concurrent-fragments",
                "4",
                "--",
                url,
            ])
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::ExtractionFailed(format!(
                "Failed to download audio: {}",
                error.trim()
            ))
            .into());
        }

        let mut entries = tokio::fs::read_dir(output_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_stem().and_then(|s| s.to_str()) == Some("audio") {
                return Ok(path);
            }
        }

        Err(TranscriberError::ExtractionFailed("yt-dlp finished without producing an audio file".to_string()).into())
    }

    fn engine_name(&self) -> &'static str {
        "yt-dlp"
    }
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_mode_never_resolves_members() {
        assert!(YtDlpExtractor::info_args(ExtractMode::Flat).contains(&"--flat-playlist"));
        assert!(!YtDlpExtractor::info_args(ExtractMode::Full).contains(&"--flat-playlist"));
        assert!(YtDlpExtractor::info_args(ExtractMode::Full).contains(&"--skip-download"));
    }

    #[tokio::test]
    async fn missing_binary_reports_extraction_failure() {
        let extractor = YtDlpExtractor::with_path("yt-dlp-definitely-not-installed");

        assert!(!extractor.check_availability().await);

        let err = extractor
            .extract_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ", ExtractMode::Flat)
            .await
            .unwrap_err();
        assert!(matches!(
            TranscriberError::find(&err),
            Some(TranscriberError::ExtractionFailed(_))
        ));
    }
}
