//! HTTP API: `/health`, `/detect`, `/transcribe` and the streaming `/batch`.
//!
//! Routes are served at the root and again under `/api`.

use anyhow::Context;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use crate::captions::CaptionAcquirer;
use crate::config::Config;
use crate::detect::UrlClassifier;
use crate::extractors::{MediaExtractor, YtDlpExtractor};
use crate::speech::{SpeechRecognizer, SpeechTranscriber, WhisperCli};
use crate::transcribe::{BatchRunner, SpeechProvider, TranscriptionPipeline};
use crate::Result;

/// Shared, read-only handles every request works with
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<UrlClassifier>,
    pub pipeline: Arc<TranscriptionPipeline>,
    pub batch: BatchRunner,
    pub expose_error_details: bool,
}

impl AppState {
    /// Wire the pipeline around the given engine and (optional) speech recognizer
    pub fn new(
        config: &Config,
        extractor: Arc<dyn MediaExtractor>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
    ) -> Self {
        let classifier = Arc::new(UrlClassifier::new(extractor.clone()));

        let captions = Arc::new(CaptionAcquirer::new(
            extractor.clone(),
            config.extractor.preferred_languages.clone(),
        ));
        let speech = recognizer.map(|recognizer| {
            Arc::new(SpeechTranscriber::new(
                extractor.clone(),
                recognizer,
                config.speech.model,
                config.app.temp_dir.clone(),
            )) as Arc<dyn SpeechProvider>
        });
        let pipeline = Arc::new(TranscriptionPipeline::new(captions, speech));

        let batch = BatchRunner::new(
            classifier.clone(),
            pipeline.clone(),
            config.batch.concurrency,
            config.extractor.video_url_base.clone(),
        );

        Self {
            classifier,
            pipeline,
            batch,
            expose_error_details: config.server.expose_error_details,
        }
    }

    /// Production wiring: yt-dlp plus the whisper CLI when speech fallback is enabled
    pub fn from_config(config: &Config) -> Self {
        let extractor: Arc<dyn MediaExtractor> =
            Arc::new(YtDlpExtractor::with_path(config.extractor.yt_dlp_path.clone()));
        let recognizer = config
            .speech
            .enabled
            .then(|| Arc::new(WhisperCli::new(config.speech.whisper_path.clone())) as Arc<dyn SpeechRecognizer>);

        Self::new(config, extractor, recognizer)
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Create the API router.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/detect", post(handlers::detect))
        .route("/transcribe", post(handlers::transcribe))
        .route("/batch", post(handlers::batch));

    Router::new()
        .nest("/api", routes.clone())
        .merge(routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    let app = create_router(state, &config.server.cors_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received shutdown signal");
}
