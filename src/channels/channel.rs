//! Seams between the dispatch loop and the outside world.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::error::{ChannelError, PublishError};
use crate::pipeline::{Media, MediaKind, RawMessage, SkipReason};

/// Stream of messages from the source channels, in arrival order.
pub type MessageStream = Pin<Box<dyn Stream<Item = RawMessage> + Send>>;

/// Downloaded media, ready to upload elsewhere.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub kind: MediaKind,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Resolves a media reference from a source post into its bytes.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch(&self, media: &Media) -> Result<MediaFile, ChannelError>;
}

/// Destination platform client.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Platform name for logs (e.g. "twitter").
    fn name(&self) -> &str;

    /// Publish one post, returning the platform's id for it.
    async fn publish(&self, text: &str, media: Option<&MediaFile>)
    -> Result<String, PublishError>;
}

/// Where status reports go (a Telegram log channel in production).
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn report(&self, report: &Report) -> Result<(), ChannelError>;
}

/// What happened to one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Published { post_id: String, text: String },
    /// `text` is the decorated candidate that was not posted.
    Skipped { reason: SkipReason, text: String },
    PublishFailed { error: String, text: String },
}

/// Status report for a single relayed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub message_id: i64,
    pub source_channel_id: i64,
    /// Media of the source post, mirrored alongside the report.
    pub media: Option<Media>,
    pub outcome: Outcome,
}

impl Report {
    pub fn new(message: &RawMessage, outcome: Outcome) -> Self {
        Self {
            message_id: message.message_id,
            source_channel_id: message.source_channel_id,
            media: message.media.clone(),
            outcome,
        }
    }

    /// Human-readable form for the log channel.
    pub fn render(&self) -> String {
        let origin = format!(
            "message {} from channel {}",
            self.message_id, self.source_channel_id
        );
        match &self.outcome {
            Outcome::Published { post_id, text } => {
                format!("✅ Posted {origin} (post id {post_id})\n\n{text}")
            }
            Outcome::Skipped { reason, text } if text.is_empty() => {
                format!("⏭️ Skipped {origin}: {reason}")
            }
            Outcome::Skipped { reason, text } => {
                format!("⏭️ Skipped {origin}: {reason}\n\n{text}")
            }
            Outcome::PublishFailed { error, text } => {
                format!("❌ Failed to post {origin}: {error}\n\n{text}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_published() {
        let msg = RawMessage::new(42, -100123, "hi");
        let report = Report::new(
            &msg,
            Outcome::Published {
                post_id: "1789".into(),
                text: "📢 hi".into(),
            },
        );
        assert_eq!(
            report.render(),
            "✅ Posted message 42 from channel -100123 (post id 1789)\n\n📢 hi"
        );
    }

    #[test]
    fn render_skipped() {
        let msg = RawMessage::new(7, -1, "");
        let report = Report::new(
            &msg,
            Outcome::Skipped {
                reason: SkipReason::TooLong {
                    length: 300,
                    max_length: 280,
                },
                text: "📢 a long post".into(),
            },
        );
        assert_eq!(
            report.render(),
            "⏭️ Skipped message 7 from channel -1: too long (300 > 280 chars)\n\n📢 a long post"
        );
    }

    #[test]
    fn render_skipped_empty_has_no_body() {
        let report = Report::new(
            &RawMessage::new(8, -1, ""),
            Outcome::Skipped {
                reason: SkipReason::Empty,
                text: String::new(),
            },
        );
        assert_eq!(
            report.render(),
            "⏭️ Skipped message 8 from channel -1: empty after processing"
        );
    }

    #[test]
    fn report_carries_source_media() {
        let media = Media {
            kind: MediaKind::Video,
            file_id: "BAAD".into(),
            file_size: None,
        };
        let msg = RawMessage::new(3, -1, "clip").with_media(media.clone());
        let report = Report::new(
            &msg,
            Outcome::Skipped {
                reason: SkipReason::Empty,
                text: String::new(),
            },
        );
        assert_eq!(report.media, Some(media));
    }

    #[test]
    fn render_failed_includes_text() {
        let msg = RawMessage::new(1, -2, "x");
        let report = Report::new(
            &msg,
            Outcome::PublishFailed {
                error: "API returned 403: duplicate".into(),
                text: "📢 x".into(),
            },
        );
        let rendered = report.render();
        assert!(rendered.starts_with("❌ Failed to post message 1 from channel -2"));
        assert!(rendered.ends_with("📢 x"));
    }

    #[test]
    fn report_serializes_outcome_tag() {
        let msg = RawMessage::new(1, -2, "x");
        let report = Report::new(
            &msg,
            Outcome::Skipped {
                reason: SkipReason::Empty,
                text: String::new(),
            },
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"]["outcome"], "skipped");
        assert_eq!(json["message_id"], 1);
    }
}
