use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::speech::ModelSize;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Media extraction engine settings
    pub extractor: ExtractorConfig,

    /// Speech-to-text fallback settings
    pub speech: SpeechConfig,

    /// Collection processing settings
    pub batch: BatchConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Allowed CORS origins (`*` for any)
    pub cors_origins: Vec<String>,

    /// Include the underlying cause in 500 responses
    pub expose_error_details: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractorConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Caption languages tried first, in order
    pub preferred_languages: Vec<String>,

    /// Prefix used to rebuild a watch URL from a bare video id
    pub video_url_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Fall back to speech recognition when a video has no captions
    pub enabled: bool,

    /// whisper executable
    pub whisper_path: String,

    /// Model size tier
    pub model: ModelSize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Videos transcribed at the same time within one batch
    pub concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Temporary directory for audio downloads
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            expose_error_details: true,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            preferred_languages: vec!["en".to_string(), "en-orig".to_string(), "en-US".to_string()],
            video_url_base: "https://www.youtube.com/watch?v=".to_string(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            whisper_path: "whisper".to_string(),
            model: ModelSize::Base,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            extractor: ExtractorConfig::default(),
            speech: SpeechConfig::default(),
            batch: BatchConfig::default(),
            app: AppConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit file, the default locations, or built-in defaults
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            if let Err(e) = config.save().await {
                tracing::warn!("Could not write default config to {}: {}", config_path.display(), e);
            }
            Ok(config)
        }
    }

    /// Load and validate a YAML config file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("youtube-transcriber").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be non-zero");
        }

        if self.extractor.preferred_languages.is_empty() {
            anyhow::bail!("extractor.preferred_languages must list at least one language");
        }

        if self.extractor.yt_dlp_path.trim().is_empty() {
            anyhow::bail!("extractor.yt_dlp_path must be configured");
        }

        if self.speech.enabled && self.speech.whisper_path.trim().is_empty() {
            anyhow::bail!("speech.whisper_path must be configured when speech fallback is enabled");
        }

        if self.batch.concurrency == 0 {
            anyhow::bail!("batch.concurrency must be at least 1");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  CORS Origins: {}", self.server.cors_origins.join(", "));
        println!("  yt-dlp: {}", self.extractor.yt_dlp_path);
        println!("  Caption Languages: {}", self.extractor.preferred_languages.join(", "));
        if self.speech.enabled {
            println!("  Speech Fallback: {} ({} model)", self.speech.whisper_path, self.speech.model);
        } else {
            println!("  Speech Fallback: disabled");
        }
        println!("  Batch Concurrency: {}", self.batch.concurrency);
        if let Some(dir) = &self.app.temp_dir {
            println!("  Temp Dir: {}", dir.display());
        }
    }
}
