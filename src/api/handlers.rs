//! Request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::detect::ClassificationResult;
use crate::extractors::validate_url;
use crate::transcribe::{BatchEvent, TranscriptRecord};

/// Body of every URL-taking endpoint
#[derive(Debug, Deserialize)]
pub struct UrlRequest {
    pub url: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Unwrap the body and validate its URL; malformed bodies are a 400 like any other bad input
fn checked_url(body: Result<Json<UrlRequest>, JsonRejection>) -> ApiResult<String> {
    let Json(body) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    validate_url(&body.url)
        .map(|_| body.url.trim().to_string())
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}

pub async fn detect(
    State(state): State<AppState>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> ApiResult<Json<ClassificationResult>> {
    let url = checked_url(body)?;

    let result = state
        .classifier
        .classify(&url)
        .await
        .map_err(ApiError::from_classification)?;

    Ok(Json(result))
}

pub async fn transcribe(
    State(state): State<AppState>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> ApiResult<Json<TranscriptRecord>> {
    let url = checked_url(body)?;

    let record = state
        .pipeline
        .get_transcript(&url)
        .await
        .map_err(|e| ApiError::from_transcription(e, state.expose_error_details))?;

    Ok(Json(record))
}

pub async fn batch(
    State(state): State<AppState>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, axum::Error>>>> {
    let url = checked_url(body)?;

    let plan = state
        .batch
        .prepare(&url)
        .await
        .map_err(ApiError::from_classification)?;

    // Dropping the stream on disconnect closes the channel, which stops the runner.
    let events = state.batch.spawn(plan);
    let stream = stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        Some((to_sse(&event), events))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &BatchEvent) -> Result<Event, axum::Error> {
    Event::default().json_data(event)
}
