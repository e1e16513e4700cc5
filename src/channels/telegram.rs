//! Telegram channel — long-polls the Bot API for channel posts and writes
//! status reports to the log channel.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::channels::{LogSink, MediaFile, MediaSource, MessageStream, Report};
use crate::error::ChannelError;
use crate::pipeline::{Media, MediaKind, RawMessage};

/// Maximum message length for Telegram's sendMessage API, in UTF-16 units.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Maximum caption length for media messages, in UTF-16 units.
const TELEGRAM_MAX_CAPTION_LENGTH: usize = 1024;

/// Long-poll timeout passed to getUpdates, in seconds.
const POLL_TIMEOUT_SECS: u64 = 30;

/// Delay before polling again after an error.
const POLL_ERROR_DELAY: Duration = Duration::from_secs(5);

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram channel — source-channel listener plus log-channel sink.
#[derive(Clone)]
pub struct TelegramChannel {
    bot_token: SecretString,
    source_channels: HashSet<i64>,
    log_channel: i64,
    api_base: String,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: SecretString, source_channels: &[i64], log_channel: i64) -> Self {
        Self {
            bot_token,
            source_channels: source_channels.iter().copied().collect(),
            log_channel,
            api_base: DEFAULT_API_BASE.to_string(),
            retry_delay: POLL_ERROR_DELAY,
            client: reqwest::Client::new(),
        }
    }

    /// Point the channel at another Bot API host (mock servers in tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Delay between failed polls.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{file_path}",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }

    /// Whether posts from `chat_id` should be relayed.
    pub fn is_source_channel(&self, chat_id: i64) -> bool {
        self.source_channels.contains(&chat_id)
    }

    /// Spawn the long-poll loop and return its messages as a stream.
    pub fn start(&self) -> MessageStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let this = self.clone();

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!(
                channels = this.source_channels.len(),
                "Telegram listener polling for posts..."
            );

            loop {
                let updates = match this.get_updates(offset).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        tracing::warn!(offset, "Telegram poll error: {e}");
                        tokio::time::sleep(this.retry_delay).await;
                        continue;
                    }
                };

                for update in &updates {
                    // Advance offset past this update
                    if let Some(uid) = update.get("update_id").and_then(Value::as_i64) {
                        offset = offset.max(uid + 1);
                    }

                    let Some(message) = parse_update(update) else {
                        continue;
                    };

                    if !this.is_source_channel(message.source_channel_id) {
                        tracing::debug!(
                            channel = message.source_channel_id,
                            "Ignoring update from unmonitored chat"
                        );
                        continue;
                    }

                    tracing::info!(
                        message_id = message.message_id,
                        channel = message.source_channel_id,
                        media = message.media.as_ref().map(|m| m.kind.as_str()),
                        "New message from source channel"
                    );

                    if tx.send(message).is_err() {
                        tracing::info!("Telegram listener channel closed");
                        return;
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Box::pin(stream)
    }

    /// One `getUpdates` long poll. Any response without a `result` array
    /// (including `ok: false`) is an error.
    async fn get_updates(&self, offset: i64) -> Result<Vec<Value>, ChannelError> {
        let body = serde_json::json!({
            "offset": offset,
            "timeout": POLL_TIMEOUT_SECS,
            "allowed_updates": ["channel_post", "message"]
        });

        let data: Value = self
            .client
            .post(self.api_url("getUpdates"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?
            .json()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        match data.get("result").and_then(Value::as_array) {
            Some(results) if data.get("ok").and_then(Value::as_bool) != Some(false) => {
                Ok(results.clone())
            }
            _ => Err(ChannelError::Http(format!(
                "getUpdates returned no result: {data}"
            ))),
        }
    }

    /// POST a JSON body to a Bot API method and return the response body.
    async fn call(&self, method: &str, body: &Value) -> Result<Value, ChannelError> {
        let resp = self
            .client
            .post(self.api_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("{method} returned {status}: {err}"),
            });
        }

        resp.json().await.map_err(|e| ChannelError::SendFailed {
            name: "telegram".into(),
            reason: format!("{method} returned an unreadable body: {e}"),
        })
    }

    /// Send a plain-text message, split to fit Telegram's limit.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), ChannelError> {
        for chunk in split_message(text, TELEGRAM_MAX_MESSAGE_LENGTH) {
            let body = serde_json::json!({
                "chat_id": chat_id,
                "text": chunk,
                "disable_web_page_preview": true,
            });
            self.call("sendMessage", &body).await?;
        }
        Ok(())
    }

    /// Re-send media by file id (no download needed), with an optional caption.
    pub async fn send_media(
        &self,
        chat_id: i64,
        media: &Media,
        caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "chat_id": chat_id });
        body[media.kind.as_str()] = Value::from(media.file_id.as_str());
        if let Some(caption) = caption {
            body["caption"] = Value::from(caption);
        }

        self.call(send_method(media.kind), &body).await?;
        tracing::debug!(chat_id, kind = media.kind.as_str(), "Telegram media sent");
        Ok(())
    }

    /// Verify the bot token with `getMe`.
    pub async fn health_check(&self) -> Result<(), ChannelError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ChannelError::StartupFailed {
                name: "telegram".into(),
                reason: format!("getMe returned {}", resp.status()),
            })
        }
    }
}

#[async_trait]
impl LogSink for TelegramChannel {
    /// Mirror the report to the log channel. Media posts are re-sent with the
    /// report as caption, or followed by it when it is too long for one.
    async fn report(&self, report: &Report) -> Result<(), ChannelError> {
        let text = report.render();
        match &report.media {
            Some(media) if utf16_len(&text) <= TELEGRAM_MAX_CAPTION_LENGTH => {
                self.send_media(self.log_channel, media, Some(&text)).await
            }
            Some(media) => {
                self.send_media(self.log_channel, media, None).await?;
                self.send_message(self.log_channel, &text).await
            }
            None => self.send_message(self.log_channel, &text).await,
        }
    }
}

#[async_trait]
impl MediaSource for TelegramChannel {
    /// Resolve the file with `getFile`, then download it.
    async fn fetch(&self, media: &Media) -> Result<MediaFile, ChannelError> {
        let failed = |reason: String| ChannelError::DownloadFailed {
            file_id: media.file_id.clone(),
            reason,
        };

        let info = self
            .call("getFile", &serde_json::json!({ "file_id": media.file_id }))
            .await?;
        let file_path = info
            .get("result")
            .and_then(|r| r.get("file_path"))
            .and_then(Value::as_str)
            .ok_or_else(|| failed("getFile returned no file_path".into()))?;

        let resp = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(failed(format!("download returned {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(|e| failed(e.to_string()))?;

        let file_name = file_path
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(media.kind.as_str())
            .to_string();

        tracing::info!(
            file_id = %media.file_id,
            size = bytes.len(),
            "Downloaded media from Telegram"
        );
        Ok(MediaFile {
            kind: media.kind,
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn send_method(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Photo => "sendPhoto",
        MediaKind::Video => "sendVideo",
        MediaKind::Animation => "sendAnimation",
        MediaKind::Document => "sendDocument",
        MediaKind::Audio => "sendAudio",
        MediaKind::Voice => "sendVoice",
    }
}

/// Turn a `getUpdates` entry into a relayable message.
///
/// Channel posts and regular messages are both accepted; text falls back to
/// the media caption, and media-only posts produce an empty text. Photos
/// arrive as a list of sizes; the largest (last) one is kept.
pub fn parse_update(update: &Value) -> Option<RawMessage> {
    let message = update
        .get("channel_post")
        .or_else(|| update.get("message"))?;

    let message_id = message.get("message_id").and_then(Value::as_i64)?;
    let chat_id = message
        .get("chat")
        .and_then(|c| c.get("id"))
        .and_then(Value::as_i64)?;

    let text = message
        .get("text")
        .or_else(|| message.get("caption"))
        .and_then(Value::as_str)
        .unwrap_or_default();

    let raw = RawMessage::new(message_id, chat_id, text);
    Some(match parse_media(message) {
        Some(media) => raw.with_media(media),
        None => raw,
    })
}

fn parse_media(message: &Value) -> Option<Media> {
    MediaKind::ALL.into_iter().find_map(|kind| {
        let field = message.get(kind.as_str())?;
        let file = match field {
            Value::Array(sizes) => sizes.last()?,
            other => other,
        };
        Some(Media {
            kind,
            file_id: file.get("file_id").and_then(Value::as_str)?.to_string(),
            file_size: file.get("file_size").and_then(Value::as_u64),
        })
    })
}

fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Byte index of the longest prefix of `text` within `max_units` UTF-16
/// units. Always covers at least one char so splitting makes progress.
fn utf16_prefix_end(text: &str, max_units: usize) -> usize {
    let mut units = 0;
    for (idx, ch) in text.char_indices() {
        units += ch.len_utf16();
        if units > max_units {
            return if idx == 0 { ch.len_utf8() } else { idx };
        }
    }
    text.len()
}

/// Split a message into chunks that fit Telegram's UTF-16 length limit.
/// Tries to split on newlines, then spaces, then hard-cuts. Chunks that
/// are only whitespace are dropped.
fn split_message(text: &str, max_units: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while !remaining.is_empty() {
        let end = utf16_prefix_end(remaining, max_units);
        let split_at = if end == remaining.len() {
            end
        } else {
            // Find a good split point
            let chunk = &remaining[..end];
            chunk
                .rfind('\n')
                .or_else(|| chunk.rfind(' '))
                .filter(|&at| at > 0)
                .unwrap_or(end)
        };

        let chunk = &remaining[..split_at];
        if !chunk.trim().is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = remaining[split_at..].trim_start();
    }

    chunks
}

// ── Tests ───────────────────────────────────────────────────────────
