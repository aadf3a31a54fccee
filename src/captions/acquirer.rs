use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use super::normalize;
use crate::extractors::{CaptionTrack, ExtractMode, MediaExtractor};
use crate::transcribe::{CaptionProvider, TranscriptRecord, TranscriptSource, VideoDetails};
use crate::{Result, TranscriberError};

/// Whether a caption track was written by a person or generated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Manual,
    Automatic,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Manual => write!(f, "manual"),
            TrackKind::Automatic => write!(f, "auto-generated"),
        }
    }
}

/// Choose the caption track to use.
///
/// Order: manual tracks in a preferred language, auto-generated tracks in a preferred
/// language, then the first manual track the engine reported, then the first
/// auto-generated one. Tracks without a parseable format are never chosen.
pub fn select_track<'a>(
    manual: &'a [CaptionTrack],
    automatic: &'a [CaptionTrack],
    preferred_languages: &[String],
) -> Option<(&'a CaptionTrack, TrackKind)> {
    let usable = |track: &&CaptionTrack| track.language != "live_chat" && track.best_format().is_some();
    let by_language = |tracks: &'a [CaptionTrack]| {
        preferred_languages
            .iter()
            .find_map(|lang| tracks.iter().filter(usable).find(|t| &t.language == lang))
    };

    by_language(manual)
        .map(|t| (t, TrackKind::Manual))
        .or_else(|| by_language(automatic).map(|t| (t, TrackKind::Automatic)))
        .or_else(|| manual.iter().find(usable).map(|t| (t, TrackKind::Manual)))
        .or_else(|| automatic.iter().find(usable).map(|t| (t, TrackKind::Automatic)))
}

/// Transcript from existing captions
pub struct CaptionAcquirer {
    extractor: Arc<dyn MediaExtractor>,
    preferred_languages: Vec<String>,
}

impl CaptionAcquirer {
    pub fn new(extractor: Arc<dyn MediaExtractor>, preferred_languages: Vec<String>) -> Self {
        Self {
            extractor,
            preferred_languages,
        }
    }
}

#[async_trait]
impl CaptionProvider for CaptionAcquirer {
    async fn acquire(&self, video_url: &str) -> Result<Option<TranscriptRecord>> {
        let started = Instant::now();

        let info = self
            .extractor
            .extract_info(video_url, ExtractMode::Full)
            .await?
            .ok_or_else(|| TranscriberError::UnresolvableUrl(video_url.to_string()))?;

        // Stop before the speech fallback would download a whole collection.
        if info.is_collection() {
            return Err(TranscriberError::NotAVideo.into());
        }

        let Some((track, kind)) =
            select_track(&info.subtitles, &info.automatic_captions, &self.preferred_languages)
        else {
            tracing::info!("No caption tracks for {}", video_url);
            return Ok(None);
        };

        let Some(format) = track.best_format() else {
            return Ok(None);
        };
        let Some(encoding) = format.encoding() else {
            return Ok(None);
        };

        tracing::debug!(
            "Selected {} '{}' captions ({}) for {}",
            kind,
            track.language,
            encoding.as_str(),
            video_url
        );

        let body = self.extractor.fetch_caption(format).await?;

        let captions = match normalize(encoding, &body) {
            Ok(captions) => captions,
            Err(e) if TranscriberError::find(&e) == Some(&TranscriberError::EmptyTranscript) => {
                tracing::info!("'{}' captions for {} were empty", track.language, video_url);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(TranscriptRecord::new(
            VideoDetails::from_info(&info, video_url),
            track.language.clone(),
            captions.text(),
            captions.segments(),
            TranscriptSource::Captions,
            started,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::{CaptionFormat, MediaInfo, StaticExtractor};

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn track(language: &str) -> CaptionTrack {
        CaptionTrack::new(
            language,
            vec![CaptionFormat::new("vtt", format!("https://captions/{}.vtt", language))],
        )
    }

    fn langs() -> Vec<String> {
        vec!["en".to_string(), "en-orig".to_string(), "en-US".to_string()]
    }

    fn picked(manual: &[CaptionTrack], automatic: &[CaptionTrack]) -> Option<(String, TrackKind)> {
        select_track(manual, automatic, &langs()).map(|(t, k)| (t.language.clone(), k))
    }

    #[test]
    fn manual_english_beats_auto_english() {
        assert_eq!(
            picked(&[track("fr"), track("en")], &[track("en")]),
            Some(("en".to_string(), TrackKind::Manual))
        );
    }

    #[test]
    fn preferred_order_within_a_kind() {
        assert_eq!(
            picked(&[], &[track("en-US"), track("en-orig")]),
            Some(("en-orig".to_string(), TrackKind::Automatic))
        );
    }

    #[test]
    fn auto_english_beats_manual_other_language() {
        assert_eq!(
            picked(&[track("de")], &[track("en")]),
            Some(("en".to_string(), TrackKind::Automatic))
        );
    }

    #[test]
    fn falls_back_to_first_reported_track() {
        assert_eq!(
            picked(&[track("ja"), track("de")], &[track("es")]),
            Some(("ja".to_string(), TrackKind::Manual))
        );
        assert_eq!(
            picked(&[track("live_chat")], &[track("es"), track("fr")]),
            Some(("es".to_string(), TrackKind::Automatic))
        );
        assert_eq!(picked(&[], &[]), None);
    }

    #[test]
    fn tracks_without_parseable_formats_are_skipped() {
        let ttml_only = CaptionTrack::new("en", vec![CaptionFormat::new("ttml", "https://captions/en.ttml")]);
        assert_eq!(
            picked(&[ttml_only], &[track("es")]),
            Some(("es".to_string(), TrackKind::Automatic))
        );
    }

    fn info(manual: Vec<CaptionTrack>, automatic: Vec<CaptionTrack>) -> MediaInfo {
        MediaInfo {
            id: Some("dQw4w9WgXcQ".to_string()),
            title: Some("Talk".to_string()),
            channel: Some("Conf".to_string()),
            duration: Some(125.0),
            subtitles: manual,
            automatic_captions: automatic,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn auto_only_spanish_captions() {
        let extractor = StaticExtractor::new()
            .with_info(URL, info(vec![], vec![track("es")]))
            .with_caption(
                "https://captions/es.vtt",
                "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\nHola a todos\n\n00:00:01.000 --> 00:00:02.000\nHola a todos\n",
            );

        let record = CaptionAcquirer::new(Arc::new(extractor), langs())
            .acquire(URL)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.language, "es");
        assert_eq!(record.source, TranscriptSource::Captions);
        assert_eq!(record.transcript, "Hola a todos");
        assert_eq!(record.title, "Talk");
        assert_eq!(record.channel, "Conf");
        assert_eq!(record.duration, "2:05");
    }

    #[tokio::test]
    async fn collections_are_rejected() {
        let playlist = MediaInfo {
            kind: Some("playlist".to_string()),
            title: Some("Whole Course".to_string()),
            ..Default::default()
        };
        let extractor = Arc::new(StaticExtractor::new().with_info(URL, playlist));

        let err = CaptionAcquirer::new(extractor.clone(), langs()).acquire(URL).await.unwrap_err();

        assert_eq!(TranscriberError::find(&err), Some(&TranscriberError::NotAVideo));
        assert_eq!(extractor.audio_downloads(), 0);
    }

    #[tokio::test]
    async fn no_tracks_is_none_without_fetching() {
        let extractor = Arc::new(StaticExtractor::new().with_info(URL, info(vec![], vec![])));

        let result = CaptionAcquirer::new(extractor.clone(), langs()).acquire(URL).await.unwrap();

        assert!(result.is_none());
        assert_eq!(extractor.caption_fetches(), 0);
    }

    #[tokio::test]
    async fn empty_caption_body_is_none() {
        let extractor = StaticExtractor::new()
            .with_info(URL, info(vec![track("en")], vec![]))
            .with_caption("https://captions/en.vtt", "WEBVTT\nKind: captions\nLanguage: en\n\n");

        let result = CaptionAcquirer::new(Arc::new(extractor), langs()).acquire(URL).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn timed_events_keep_segments() {
        let json3 = CaptionTrack::new(
            "en",
            vec![
                CaptionFormat::new("vtt", "https://captions/en.vtt"),
                CaptionFormat::new("json3", "https://captions/en.json3"),
            ],
        );
        let extractor = StaticExtractor::new()
            .with_info(URL, info(vec![json3], vec![]))
            .with_caption(
                "https://captions/en.json3",
                r#"{"events": [{"tStartMs": 0, "segs": [{"utf8": "Welcome"}]}, {"tStartMs": 2000, "segs": [{"utf8": "back"}]}]}"#,
            );

        let record = CaptionAcquirer::new(Arc::new(extractor), langs())
            .acquire(URL)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.transcript, "Welcome back");
        let segments = record.segments.unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].offset_seconds, 2.0);
    }

    #[tokio::test]
    async fn failed_caption_download_is_an_error() {
        let extractor = StaticExtractor::new().with_info(URL, info(vec![track("en")], vec![]));

        let result = CaptionAcquirer::new(Arc::new(extractor), langs()).acquire(URL).await;
        assert!(result.is_err());
    }
}
