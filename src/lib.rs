//! YouTube Transcriber - turn YouTube videos and playlists into plain-text transcripts
//!
//! This library classifies a YouTube URL as a single video or a collection, pulls the
//! best available caption track for each video and falls back to local speech-to-text
//! when a video has no captions. It is exposed both as an HTTP API (see [`api`]) and
//! through the `transcriber` command line tool.

pub mod api;
pub mod captions;
pub mod cli;
pub mod config;
pub mod detect;
pub mod extractors;
pub mod output;
pub mod speech;
pub mod transcribe;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use detect::{ClassificationResult, UrlClassifier, UrlKind, VideoReference};
pub use extractors::{MediaExtractor, StaticExtractor, YtDlpExtractor};
pub use transcribe::{BatchEvent, TranscriptRecord, TranscriptSource, TranscriptionPipeline};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the transcriber
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriberError {
    #[error("Unsupported URL format: {0}")]
    UnsupportedUrl(String),

    #[error("Could not extract info from URL: {0}")]
    UnresolvableUrl(String),

    #[error("Use /transcribe for single videos.")]
    NotACollection,

    #[error("Use /batch for playlists.")]
    NotAVideo,

    #[error("No videos found")]
    EmptyCollection,

    #[error("No captions available for this video.")]
    NoCaptions,

    #[error("Caption track produced an empty transcript")]
    EmptyTranscript,

    #[error("Speech model unavailable: {0}")]
    SpeechModelUnavailable(String),

    #[error("Media extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Speech recognition failed: {0}")]
    SpeechFailed(String),
}

impl TranscriberError {
    /// Find a domain error anywhere in an `anyhow` chain
    pub fn find(err: &anyhow::Error) -> Option<&TranscriberError> {
        err.chain().find_map(|cause| cause.downcast_ref::<TranscriberError>())
    }
}
