//! Dispatch loop — routes every source message through the pipeline.
//!
//! For each message, in arrival order:
//! 1. `Transformer::transform()` decides publish or skip
//! 2. Publish → fetch attached media (when a media source is set), then
//!    `Publisher::publish()`, then a report to the log sink
//! 3. Skip → a report to the log sink, nothing else
//!
//! Messages are handled one at a time, so per-channel order is preserved.
//! Failures are reported, never retried.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::channels::{LogSink, MediaSource, MessageStream, Outcome, Publisher, Report};
use crate::error::Result;
use crate::pipeline::{PipelineResult, RawMessage, Transformer};

/// Tally of outcomes over the lifetime of a dispatch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub published: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Connects the listener, the pipeline, the posting client and the log sink.
pub struct Dispatcher {
    transformer: Transformer,
    publisher: Arc<dyn Publisher>,
    log_sink: Arc<dyn LogSink>,
    media_source: Option<Arc<dyn MediaSource>>,
}

impl Dispatcher {
    pub fn new(
        transformer: Transformer,
        publisher: Arc<dyn Publisher>,
        log_sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            transformer,
            publisher,
            log_sink,
            media_source: None,
        }
    }

    /// Relay attached media too. Without a source, posts go out text-only.
    pub fn with_media_source(mut self, media_source: Arc<dyn MediaSource>) -> Self {
        self.media_source = Some(media_source);
        self
    }

    /// Consume the stream until it ends.
    pub async fn run(&self, mut messages: MessageStream) -> DispatchStats {
        let mut stats = DispatchStats::default();

        while let Some(message) = messages.next().await {
            match self.handle(&message).await {
                Outcome::Published { .. } => stats.published += 1,
                Outcome::Skipped { .. } => stats.skipped += 1,
                Outcome::PublishFailed { .. } => stats.failed += 1,
            }
        }

        info!(
            published = stats.published,
            skipped = stats.skipped,
            failed = stats.failed,
            "Message stream ended"
        );
        stats
    }

    /// Process a single message and report its outcome.
    pub async fn handle(&self, message: &RawMessage) -> Outcome {
        let result = self.transformer.transform(&message.text);
        debug!(
            message_id = message.message_id,
            channel = message.source_channel_id,
            action = result.label(),
            "Pipeline decision"
        );

        let outcome = match result {
            PipelineResult::Skip { reason } => {
                info!(
                    message_id = message.message_id,
                    channel = message.source_channel_id,
                    reason = %reason,
                    "Skipping message"
                );
                Outcome::Skipped {
                    reason,
                    text: self.transformer.decorate(&message.text),
                }
            }
            PipelineResult::Publish { text } => match self.publish(message, &text).await {
                Ok(post_id) => {
                    info!(
                        message_id = message.message_id,
                        channel = message.source_channel_id,
                        publisher = self.publisher.name(),
                        post_id = %post_id,
                        "Published message"
                    );
                    Outcome::Published { post_id, text }
                }
                Err(e) => {
                    warn!(
                        message_id = message.message_id,
                        channel = message.source_channel_id,
                        publisher = self.publisher.name(),
                        error = %e,
                        "Failed to publish message"
                    );
                    Outcome::PublishFailed {
                        error: e.to_string(),
                        text,
                    }
                }
            },
        };

        let report = Report::new(message, outcome.clone());
        if let Err(e) = self.log_sink.report(&report).await {
            warn!(
                message_id = message.message_id,
                error = %e,
                "Failed to write report to log sink"
            );
        }

        outcome
    }

    async fn publish(&self, message: &RawMessage, text: &str) -> Result<String> {
        let media = match (&message.media, &self.media_source) {
            (Some(media), Some(source)) => {
                debug!(
                    message_id = message.message_id,
                    kind = media.kind.as_str(),
                    "Fetching media"
                );
                Some(source.fetch(media).await?)
            }
            _ => None,
        };

        Ok(self.publisher.publish(text, media.as_ref()).await?)
    }
}
