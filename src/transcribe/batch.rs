use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use super::{TranscriptRecord, TranscriptionPipeline};
use crate::detect::{UrlClassifier, UrlKind, VideoReference};
use crate::utils::video_url_from_reference;
use crate::{Result, TranscriberError};

/// Progress event emitted while a collection is transcribed.
///
/// A run always produces one `Metadata`, then one `Transcript` or `Error` per child
/// in collection order, then one `Done`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchEvent {
    Metadata {
        title: String,
        video_count: usize,
    },
    Transcript {
        index: usize,
        total: usize,
        #[serde(flatten)]
        record: TranscriptRecord,
    },
    Error {
        index: usize,
        total: usize,
        title: String,
        error: String,
    },
    Done,
}

/// A classified collection ready to be streamed
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub id: Uuid,
    pub title: String,
    pub children: Vec<VideoReference>,
}

/// Drives the transcript pipeline over every video of a collection
#[derive(Clone)]
pub struct BatchRunner {
    classifier: Arc<UrlClassifier>,
    pipeline: Arc<TranscriptionPipeline>,
    concurrency: usize,
    video_url_base: String,
}

impl BatchRunner {
    pub fn new(
        classifier: Arc<UrlClassifier>,
        pipeline: Arc<TranscriptionPipeline>,
        concurrency: usize,
        video_url_base: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            pipeline,
            concurrency: concurrency.max(1),
            video_url_base: video_url_base.into(),
        }
    }

    /// Classify `url` and check it is a non-empty collection
    pub async fn prepare(&self, url: &str) -> Result<BatchPlan> {
        let classification = self.classifier.classify(url).await?;

        if classification.kind == UrlKind::Video {
            return Err(TranscriberError::NotACollection.into());
        }

        let children = classification.videos.unwrap_or_default();
        if children.is_empty() {
            return Err(TranscriberError::EmptyCollection.into());
        }

        Ok(BatchPlan {
            id: Uuid::new_v4(),
            title: classification.title,
            children,
        })
    }

    /// Emit every event of `plan` into `events`.
    ///
    /// Stops as soon as the receiving side is gone; children still in flight are dropped.
    pub async fn stream(&self, plan: BatchPlan, events: mpsc::Sender<BatchEvent>) {
        let total = plan.children.len();
        let span = tracing::info_span!("batch", batch_id = %plan.id, total);

        async move {
            tracing::info!("Starting batch '{}'", plan.title);

            let metadata = BatchEvent::Metadata {
                title: plan.title,
                video_count: total,
            };
            if events.send(metadata).await.is_err() {
                return;
            }

            // `buffered` yields in input order, so events stay index-ascending under concurrency.
            let mut results = stream::iter(plan.children.into_iter().enumerate())
                .map(|(index, child)| self.process_child(index, total, child))
                .buffered(self.concurrency);

            while let Some(event) = results.next().await {
                if events.send(event).await.is_err() {
                    tracing::info!("Client disconnected, abandoning batch");
                    return;
                }
            }

            let _ = events.send(BatchEvent::Done).await;
            tracing::info!("Batch complete");
        }
        .instrument(span)
        .await
    }

    /// Run `plan` on a background task, returning the event receiver
    pub fn spawn(&self, plan: BatchPlan) -> mpsc::Receiver<BatchEvent> {
        let (tx, rx) = mpsc::channel(self.concurrency.max(4));
        let runner = self.clone();
        tokio::spawn(async move { runner.stream(plan, tx).await });
        rx
    }

    /// Classify and run a whole batch, collecting every event
    pub async fn run_batch(&self, url: &str) -> Result<Vec<BatchEvent>> {
        let plan = self.prepare(url).await?;
        let mut rx = self.spawn(plan);

        let mut collected = Vec::new();
        while let Some(event) = rx.recv().await {
            collected.push(event);
        }
        Ok(collected)
    }

    async fn process_child(&self, index: usize, total: usize, child: VideoReference) -> BatchEvent {
        let video_url = video_url_from_reference(&child.url, &self.video_url_base);

        match self.pipeline.get_transcript(&video_url).await {
            Ok(record) => BatchEvent::Transcript { index, total, record },
            Err(e) => {
                tracing::warn!("Video {}/{} ({}) failed: {:#}", index + 1, total, video_url, e);
                BatchEvent::Error {
                    index,
                    total,
                    title: child.title,
                    error: e.to_string(),
                }
            }
        }
    }
}
