//! URL classification: single video vs. collection.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::extractors::{ExtractMode, MediaExtractor};
use crate::utils::format_optional_duration;
use crate::{Result, TranscriberError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlKind {
    Video,
    Playlist,
}

/// A collection member as reported by flat extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoReference {
    /// Watch URL, or a bare video id when the engine only reported that
    pub url: String,
    pub title: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub url: String,

    #[serde(rename = "type")]
    pub kind: UrlKind,

    pub title: String,

    pub video_count: usize,

    /// Present only for collections
    pub videos: Option<Vec<VideoReference>>,
}

/// Decides what a URL points at using one shallow engine query
pub struct UrlClassifier {
    extractor: Arc<dyn MediaExtractor>,
}

impl UrlClassifier {
    pub fn new(extractor: Arc<dyn MediaExtractor>) -> Self {
        Self { extractor }
    }

    pub async fn classify(&self, url: &str) -> Result<ClassificationResult> {
        tracing::info!("Classifying URL: {}", url);

        let info = self
            .extractor
            .extract_info(url, ExtractMode::Flat)
            .await
            .map_err(|e| TranscriberError::UnresolvableUrl(format!("{:#}", e)))?
            .ok_or_else(|| TranscriberError::UnresolvableUrl(url.to_string()))?;

        if !info.is_collection() {
            return Ok(ClassificationResult {
                url: url.to_string(),
                kind: UrlKind::Video,
                title: info.title.unwrap_or_else(|| "Unknown".to_string()),
                video_count: 1,
                videos: None,
            });
        }

        let videos: Vec<VideoReference> = info
            .entries
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|entry| {
                let reference = entry.reference()?.trim().to_string();
                Some(VideoReference {
                    url: reference,
                    title: entry
                        .title
                        .filter(|t| !t.trim().is_empty())
                        .unwrap_or_else(|| "Unknown".to_string()),
                    duration: format_optional_duration(entry.duration),
                })
            })
            .collect();

        tracing::info!("Found collection with {} videos", videos.len());

        Ok(ClassificationResult {
            url: url.to_string(),
            kind: UrlKind::Playlist,
            title: info.title.unwrap_or_else(|| "Unknown Playlist".to_string()),
            video_count: videos.len(),
            videos: Some(videos),
        })
    }
}
