use async_trait::async_trait;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

pub mod stub;
pub mod youtube;

pub use stub::StaticExtractor;
pub use youtube::YtDlpExtractor;

use crate::captions::CaptionEncoding;
use crate::Result;

/// How deep the engine should look when extracting metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractMode {
    /// List collection members without resolving each member
    Flat,
    /// Resolve a single video, including its caption tracks
    Full,
}

/// Metadata reported by the extraction engine for one URL
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaInfo {
    /// Engine id of the video or collection
    #[serde(default)]
    pub id: Option<String>,

    /// Container type (`playlist` for collections, absent or `video` otherwise)
    #[serde(rename = "_type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default)]
    pub uploader: Option<String>,

    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,

    /// Collection members; the engine reports unavailable members as `null`
    #[serde(default)]
    pub entries: Option<Vec<Option<MediaEntry>>>,

    /// Manually-authored caption tracks, in engine order
    #[serde(default, deserialize_with = "ordered_tracks")]
    pub subtitles: Vec<CaptionTrack>,

    /// Auto-generated caption tracks, in engine order
    #[serde(default, deserialize_with = "ordered_tracks")]
    pub automatic_captions: Vec<CaptionTrack>,
}

impl MediaInfo {
    /// Whether the engine reported a container rather than a single video
    pub fn is_collection(&self) -> bool {
        matches!(self.kind.as_deref(), Some("playlist") | Some("multi_video"))
    }
}

/// One member of a flat-extracted collection
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MediaEntry {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub duration: Option<f64>,
}

impl MediaEntry {
    /// URL if the engine gave one, otherwise the bare id
    pub fn reference(&self) -> Option<&str> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| self.id.as_deref().filter(|id| !id.trim().is_empty()))
    }
}

/// All format variants of the captions for one language
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language: String,
    pub formats: Vec<CaptionFormat>,
}

impl CaptionTrack {
    pub fn new(language: impl Into<String>, formats: Vec<CaptionFormat>) -> Self {
        Self {
            language: language.into(),
            formats,
        }
    }

    /// Pick the variant to download: structured timed events first, then timed-text markup
    pub fn best_format(&self) -> Option<&CaptionFormat> {
        [CaptionEncoding::TimedEvents, CaptionEncoding::TimedTextMarkup]
            .into_iter()
            .find_map(|wanted| {
                self.formats
                    .iter()
                    .find(|f| f.encoding() == Some(wanted) && !f.url.is_empty())
            })
    }
}

/// One downloadable caption variant
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CaptionFormat {
    /// Format tag as reported by the engine (`json3`, `vtt`, `srv1`, ...)
    pub ext: String,

    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub name: Option<String>,
}

impl CaptionFormat {
    pub fn new(ext: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            ext: ext.into(),
            url: url.into(),
            name: None,
        }
    }

    pub fn encoding(&self) -> Option<CaptionEncoding> {
        CaptionEncoding::from_ext(&self.ext)
    }
}

/// Trait for the media extraction engine the pipeline delegates to
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Extract metadata for a URL without downloading media. `Ok(None)` means the
    /// engine had nothing at all to say about the URL.
    async fn extract_info(&self, url: &str, mode: ExtractMode) -> Result<Option<MediaInfo>>;

    /// Download the best available audio track into `output_dir`, returning the file path
    async fn download_audio(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;

    /// Get the name of this engine
    fn engine_name(&self) -> &'static str;

    /// Download the body of one caption variant
    async fn fetch_caption(&self, format: &CaptionFormat) -> Result<String> {
        let response = reqwest::get(&format.url).await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download captions: HTTP {}", response.status());
        }

        Ok(response.text().await?)
    }
}

fn ordered_tracks<'de, D>(deserializer: D) -> std::result::Result<Vec<CaptionTrack>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OrderedTracks>::deserialize(deserializer)?
        .map(|tracks| tracks.0)
        .unwrap_or_default())
}

/// Language map kept in document order; the engine's ordering is significant for
/// the "first reported track" fallback.
struct OrderedTracks(Vec<CaptionTrack>);

impl<'de> Deserialize<'de> for OrderedTracks {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(TracksVisitor)
    }
}

struct TracksVisitor;

impl<'de> Visitor<'de> for TracksVisitor {
    type Value = OrderedTracks;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of language code to caption formats")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut tracks = Vec::new();
        while let Some((language, formats)) = map.next_entry::<String, Vec<CaptionFormat>>()? {
            tracks.push(CaptionTrack { language, formats });
        }
        Ok(OrderedTracks(tracks))
    }
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<url::Url> {
    let normalized = crate::utils::validate_and_normalize_url(url)?;
    Ok(url::Url::parse(&normalized)?)
}
