//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::TranscriberError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NotImplemented(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Map a classification failure; anything the engine could not resolve is the caller's fault
    pub fn from_classification(err: anyhow::Error) -> Self {
        match TranscriberError::find(&err) {
            Some(TranscriberError::EmptyCollection) => Self::NotFound(TranscriberError::EmptyCollection.to_string()),
            Some(domain) => Self::BadRequest(domain.to_string()),
            None => Self::BadRequest(format!("{:#}", err)),
        }
    }

    /// Map a single-video transcript failure
    pub fn from_transcription(err: anyhow::Error, expose_details: bool) -> Self {
        match TranscriberError::find(&err) {
            Some(TranscriberError::NoCaptions) => Self::NotFound(TranscriberError::NoCaptions.to_string()),
            Some(e @ TranscriberError::SpeechModelUnavailable(_)) => {
                Self::NotImplemented(format!("Cannot transcribe a video without captions: {}", e))
            }
            Some(
                e @ (TranscriberError::UnsupportedUrl(_)
                | TranscriberError::UnresolvableUrl(_)
                | TranscriberError::NotAVideo),
            ) => {
                Self::BadRequest(e.to_string())
            }
            _ => {
                tracing::error!("Transcription failed: {:#}", err);
                if expose_details {
                    Self::Internal(format!("Transcription failed: {}", err))
                } else {
                    Self::Internal("Transcription failed".to_string())
                }
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            detail: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcription_errors_map_to_statuses() {
        let cases = [
            (anyhow::Error::from(TranscriberError::NoCaptions), StatusCode::NOT_FOUND),
            (
                TranscriberError::SpeechModelUnavailable("whisper".to_string()).into(),
                StatusCode::NOT_IMPLEMENTED,
            ),
            (
                TranscriberError::UnresolvableUrl("x".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (TranscriberError::NotAVideo.into(), StatusCode::BAD_REQUEST),
            (anyhow::anyhow!("disk full"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from_transcription(err, true).status_code(), status);
        }
    }

    #[test]
    fn internal_details_can_be_hidden() {
        let shown = ApiError::from_transcription(anyhow::anyhow!("secret path /srv/x"), true);
        let hidden = ApiError::from_transcription(anyhow::anyhow!("secret path /srv/x"), false);

        assert_eq!(shown.to_string(), "Transcription failed: secret path /srv/x");
        assert_eq!(hidden.to_string(), "Transcription failed");
    }

    #[test]
    fn classification_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from_classification(TranscriberError::NotACollection.into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from_classification(TranscriberError::EmptyCollection.into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from_classification(anyhow::anyhow!("boom")).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
