//! Speech-to-text fallback for videos without captions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod fallback;
pub mod whisper;

pub use fallback::SpeechTranscriber;
pub use whisper::WhisperCli;

use crate::transcribe::Segment;
use crate::Result;

/// Speech model size tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl ModelSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelSize::Tiny => "tiny",
            ModelSize::Base => "base",
            ModelSize::Small => "small",
            ModelSize::Medium => "medium",
            ModelSize::Large => "large",
        }
    }
}

impl std::fmt::Display for ModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the speech model heard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpeechOutput {
    pub text: String,
    /// Language the model detected, if it reported one
    pub language: Option<String>,
    pub segments: Vec<Segment>,
}

/// Trait for speech recognition engines
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Make sure the model of the given tier can be loaded.
    ///
    /// Fails with [`crate::TranscriberError::SpeechModelUnavailable`] otherwise.
    async fn load(&self, model: ModelSize) -> Result<()>;

    /// Transcribe an audio file
    async fn transcribe_file(&self, audio_path: &Path, model: ModelSize) -> Result<SpeechOutput>;
}
