//! Shared types for the transformation pipeline.

use std::fmt;

use serde::Serialize;

// ── Raw message ─────────────────────────────────────────────────────

/// Kind of media attached to a channel post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
    Animation,
    Document,
    Audio,
    Voice,
}

impl MediaKind {
    pub const ALL: [MediaKind; 6] = [
        Self::Photo,
        Self::Video,
        Self::Animation,
        Self::Document,
        Self::Audio,
        Self::Voice,
    ];

    /// Field name of this kind in a Telegram message object.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
            Self::Animation => "animation",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Voice => "voice",
        }
    }
}

/// Media attached to a channel post, referenced by its Telegram file id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Media {
    pub kind: MediaKind,
    pub file_id: String,
    /// Size in bytes when Telegram reports it.
    pub file_size: Option<u64>,
}

/// A message as received from a source channel.
///
/// The listener builds one per channel post; the dispatcher drops it after a
/// single pipeline run.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Telegram message id (unique within its chat).
    pub message_id: i64,
    /// Chat id of the source channel.
    pub source_channel_id: i64,
    /// Message text, or the caption for media posts. May be empty.
    pub text: String,
    pub media: Option<Media>,
}

impl RawMessage {
    pub fn new(message_id: i64, source_channel_id: i64, text: impl Into<String>) -> Self {
        Self {
            message_id,
            source_channel_id,
            text: text.into(),
            media: None,
        }
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }
}

// ── Pipeline result ─────────────────────────────────────────────────

/// Why a message was not published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// Final text exceeded the limit and long posts are skipped.
    TooLong { length: usize, max_length: usize },
    /// Nothing left to publish.
    Empty,
}

impl SkipReason {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TooLong { .. } => "too_long",
            Self::Empty => "empty",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLong { length, max_length } => {
                write!(f, "too long ({length} > {max_length} chars)")
            }
            Self::Empty => f.write_str("empty after processing"),
        }
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PipelineResult {
    Publish { text: String },
    Skip { reason: SkipReason },
}

impl PipelineResult {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "publish",
            Self::Skip { reason } => reason.label(),
        }
    }

    /// Text to publish, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Publish { text } => Some(text),
            Self::Skip { .. } => None,
        }
    }
}
