use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::config::Config;

static VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("valid video id pattern"));

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| crate::TranscriberError::UnsupportedUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(crate::TranscriberError::UnsupportedUrl(format!(
            "{} (URL must use HTTP or HTTPS protocol)",
            url
        ))
        .into());
    }

    Ok(parsed.to_string())
}

/// Format a second count as a clock string: `H:MM:SS` from one hour up, `M:SS` below
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Format an optional engine-reported duration, `Unknown` when absent or zero
pub fn format_optional_duration(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s >= 1.0 => format_duration(s as u64),
        _ => "Unknown".to_string(),
    }
}

/// Turn a collection child reference into an absolute URL.
///
/// Flat extraction sometimes reports a bare video id instead of a watch URL.
pub fn video_url_from_reference(reference: &str, base: &str) -> String {
    let reference = reference.trim();
    if reference.starts_with("http://") || reference.starts_with("https://") {
        reference.to_string()
    } else {
        format!("{}{}", base, reference)
    }
}

/// Extract the 11-character video id from a bare id or the common YouTube URL shapes
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();
    if VIDEO_ID.is_match(input) {
        return Some(input.to_string());
    }

    let parsed = Url::parse(input).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("shorts") | Some("v") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    }?;

    VIDEO_ID.is_match(&candidate).then_some(candidate)
}

/// Sanitize filename for safe filesystem usage
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized = filename
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect::<String>();

    if sanitized.trim_matches('_').is_empty() {
        "transcript".to_string()
    } else {
        sanitized
    }
}

/// Check if the current environment has the external tools the pipeline shells out to
pub async fn check_dependencies(config: &Config) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(&config.extractor.yt_dlp_path).await {
        missing.push(format!(
            "{} - required for metadata, captions and audio download",
            config.extractor.yt_dlp_path
        ));
    }

    if !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required for audio extraction before speech recognition".to_string());
    }

    if config.speech.enabled && !check_command_available(&config.speech.whisper_path).await {
        missing.push(format!(
            "{} - required for speech-to-text fallback when a video has no captions",
            config.speech.whisper_path
        ));
    }

    missing
}

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--help")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
