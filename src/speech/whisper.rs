use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;

use super::{ModelSize, SpeechOutput, SpeechRecognizer};
use crate::transcribe::Segment;
use crate::utils::check_command_available;
use crate::{Result, TranscriberError};

/// Speech recognizer backed by the `whisper` command line tool
pub struct WhisperCli {
    whisper_path: String,
    available: OnceCell<bool>,
}

#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    #[serde(default)]
    text: String,
}

impl WhisperCli {
    pub fn new(whisper_path: impl Into<String>) -> Self {
        Self {
            whisper_path: whisper_path.into(),
            available: OnceCell::new(),
        }
    }

    fn parse_output(json: &str) -> Result<SpeechOutput> {
        let parsed: WhisperJson = serde_json::from_str(json).context("Failed to parse whisper output")?;

        let segments = parsed
            .segments
            .into_iter()
            .filter_map(|seg| {
                let text = seg.text.trim().to_string();
                (!text.is_empty()).then_some(Segment {
                    offset_seconds: seg.start,
                    text,
                })
            })
            .collect();

        Ok(SpeechOutput {
            text: parsed.text.trim().to_string(),
            language: parsed.language.filter(|l| !l.trim().is_empty()),
            segments,
        })
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperCli {
    async fn load(&self, model: ModelSize) -> Result<()> {
        let available = *self
            .available
            .get_or_init(|| check_command_available(&self.whisper_path))
            .await;

        if !available {
            return Err(TranscriberError::SpeechModelUnavailable(format!(
                "'{}' is not installed; cannot load the {} model",
                self.whisper_path, model
            ))
            .into());
        }

        Ok(())
    }

    async fn transcribe_file(&self, audio_path: &Path, model: ModelSize) -> Result<SpeechOutput> {
        let output_dir = audio_path
            .parent()
            .context("Audio file has no parent directory")?;

        tracing::info!("Running {} ({} model) on {}", self.whisper_path, model, audio_path.display());

        let output = Command::new(&self.whisper_path)
            .arg(audio_path)
            .args(["--model", model.as_str()])
            .args(["--output_format", "json"])
            .arg("--output_dir")
            .arg(output_dir)
            .args(["--fp16", "False", "--verbose", "False"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(TranscriberError::SpeechModelUnavailable(format!(
                        "'{}' is not installed",
                        self.whisper_path
                    )))
                } else {
                    anyhow::Error::new(e).context(format!("Failed to run {}", self.whisper_path))
                }
            })?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriberError::SpeechFailed(error.trim().to_string()).into());
        }

        let stem = audio_path
            .file_stem()
            .context("Audio file has no name")?
            .to_string_lossy();
        let json_path = output_dir.join(format!("{}.json", stem));
        let json = tokio::fs::read_to_string(&json_path)
            .await
            .with_context(|| format!("whisper produced no output at {}", json_path.display()))?;

        Self::parse_output(&json)
    }
}
