//! X/Twitter posting client — API v2 `POST /2/tweets`, OAuth 1.0a user context.
//!
//! Media goes through the v1.1 simple upload endpoint first; the returned
//! media id is attached to the tweet.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::channels::oauth::{OAuthKeys, RequestStamp, authorization_header};
use crate::channels::{MediaFile, Publisher};
use crate::config::TwitterCredentials;
use crate::error::PublishError;

const DEFAULT_API_BASE: &str = "https://api.twitter.com";
const DEFAULT_UPLOAD_BASE: &str = "https://upload.twitter.com";

/// Largest media file the client will try to upload.
pub const MAX_MEDIA_BYTES: usize = 50 * 1024 * 1024;

/// Posting client for a single account.
pub struct TwitterClient {
    credentials: TwitterCredentials,
    api_base: String,
    upload_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: Option<CreatedTweet>,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    media_id_string: String,
}

impl TwitterClient {
    pub fn new(credentials: TwitterCredentials) -> Self {
        Self {
            credentials,
            api_base: DEFAULT_API_BASE.to_string(),
            upload_base: DEFAULT_UPLOAD_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point both the API and upload hosts elsewhere (mock servers in tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.upload_base = self.api_base.clone();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/2/{path}", self.api_base)
    }

    fn upload_url(&self) -> String {
        format!("{}/1.1/media/upload.json", self.upload_base)
    }

    fn sign(&self, method: &str, url: &str) -> Result<String, PublishError> {
        let keys = OAuthKeys {
            consumer_key: self.credentials.consumer_key.expose_secret(),
            consumer_secret: self.credentials.consumer_secret.expose_secret(),
            token: self.credentials.access_token.expose_secret(),
            token_secret: self.credentials.access_secret.expose_secret(),
        };
        authorization_header(method, url, &[], &keys, &RequestStamp::fresh())
    }

    /// Upload one media file and return its media id.
    ///
    /// Multipart bodies are not part of the OAuth signature base string.
    pub async fn upload_media(&self, media: &MediaFile) -> Result<String, PublishError> {
        let size = media.bytes.len();
        if size > MAX_MEDIA_BYTES {
            tracing::warn!(size, limit = MAX_MEDIA_BYTES, "Media file too large");
            return Err(PublishError::MediaTooLarge {
                size,
                limit: MAX_MEDIA_BYTES,
            });
        }

        let url = self.upload_url();
        let auth = self.sign("POST", &url)?;
        let part = Part::bytes(media.bytes.clone()).file_name(media.file_name.clone());
        let form = Form::new().part("media", part);

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .multipart(form)
            .send()
            .await?;
        let resp = check_status(resp, "Media upload rejected").await?;

        let parsed: UploadResponse = resp
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

        tracing::info!(
            media_id = %parsed.media_id_string,
            kind = media.kind.as_str(),
            size,
            "Media uploaded"
        );
        Ok(parsed.media_id_string)
    }

    /// Create a tweet, optionally with already-uploaded media, and return its id.
    pub async fn create_tweet(
        &self,
        text: &str,
        media_ids: &[String],
    ) -> Result<String, PublishError> {
        let url = self.api_url("tweets");
        let auth = self.sign("POST", &url)?;

        let body = if media_ids.is_empty() {
            serde_json::json!({ "text": text })
        } else {
            serde_json::json!({ "text": text, "media": { "media_ids": media_ids } })
        };

        let resp = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await?;
        let resp = check_status(resp, "Tweet creation rejected").await?;

        let parsed: CreateTweetResponse = resp
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

        let id = parsed
            .data
            .map(|d| d.id)
            .ok_or_else(|| PublishError::InvalidResponse("missing data.id".into()))?;

        tracing::info!(tweet_id = %id, media = media_ids.len(), "Tweet posted");
        Ok(id)
    }
}

async fn check_status(
    resp: reqwest::Response,
    context: &'static str,
) -> Result<reqwest::Response, PublishError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "{context}");
    Err(PublishError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Publisher for TwitterClient {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn publish(
        &self,
        text: &str,
        media: Option<&MediaFile>,
    ) -> Result<String, PublishError> {
        let media_ids = match media {
            Some(file) => vec![self.upload_media(file).await?],
            None => Vec::new(),
        };
        self.create_tweet(text, &media_ids).await
    }
}
