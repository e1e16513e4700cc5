//! Configuration types.
//!
//! Everything is resolved once at startup from environment variables into an
//! immutable [`RelayConfig`]. Nothing reads the environment after that.

use secrecy::SecretString;
use tracing::{debug, info};

use crate::error::ConfigError;

/// Default `MAX_TWITTER_LENGTH`.
pub const DEFAULT_MAX_LENGTH: usize = 280;

/// Default `ADD_PREFIX`.
pub const DEFAULT_PREFIX: &str = "📢 ";

/// Default `HEALTH_PORT`.
pub const DEFAULT_HEALTH_PORT: u16 = 8000;

/// Default `LOG_FILE`.
pub const DEFAULT_LOG_FILE: &str = "smart_posting_bot.log";

/// Text transformation settings consumed by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSettings {
    /// Maximum post length in characters.
    pub max_length: usize,
    /// Skip posts that are too long instead of truncating them.
    pub skip_long_posts: bool,
    pub remove_urls: bool,
    pub remove_hashtags: bool,
    pub remove_mentions: bool,
    pub remove_emojis: bool,
    /// Collapse whitespace runs and strip the ends.
    pub trim_extra_spaces: bool,
    /// Prepended to every post.
    pub prefix: String,
    /// Appended to every post.
    pub suffix: String,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            skip_long_posts: true,
            remove_urls: true,
            remove_hashtags: false,
            remove_mentions: false,
            remove_emojis: false,
            trim_extra_spaces: true,
            prefix: DEFAULT_PREFIX.to_string(),
            suffix: String::new(),
        }
    }
}

impl TransformSettings {
    /// Settings with every rule disabled and no decoration.
    pub fn passthrough(max_length: usize) -> Self {
        Self {
            max_length,
            skip_long_posts: false,
            remove_urls: false,
            remove_hashtags: false,
            remove_mentions: false,
            remove_emojis: false,
            trim_extra_spaces: false,
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

/// Telegram side: bot credentials plus the channels to watch and report to.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_id: i64,
    pub api_hash: SecretString,
    pub bot_token: SecretString,
    pub source_channels: Vec<i64>,
    pub log_channel: i64,
}

/// X/Twitter credentials (OAuth 1.0a user context plus the app bearer token).
#[derive(Debug, Clone)]
pub struct TwitterCredentials {
    pub bearer_token: SecretString,
    pub consumer_key: SecretString,
    pub consumer_secret: SecretString,
    pub access_token: SecretString,
    pub access_secret: SecretString,
}

/// Full relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    pub twitter: TwitterCredentials,
    pub transform: TransformSettings,
    pub health_port: u16,
    pub log_file: String,
}

impl RelayConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let telegram = TelegramConfig {
            api_id: parse_int(
                "TELEGRAM_API_ID",
                &env.required("TELEGRAM_API_ID")?,
            )?,
            api_hash: env.secret("TELEGRAM_API_HASH")?,
            bot_token: env.secret("TELEGRAM_BOT_TOKEN")?,
            source_channels: parse_channel_list(
                "SOURCE_CHANNELS",
                &env.required("SOURCE_CHANNELS")?,
            )?,
            log_channel: parse_int("LOG_CHANNEL", &env.required("LOG_CHANNEL")?)?,
        };

        let twitter = TwitterCredentials {
            bearer_token: env.secret("TWITTER_BEARER_TOKEN")?,
            consumer_key: env.secret("TWITTER_CONSUMER_KEY")?,
            consumer_secret: env.secret("TWITTER_CONSUMER_SECRET")?,
            access_token: env.secret("TWITTER_ACCESS_TOKEN")?,
            access_secret: env.secret("TWITTER_ACCESS_SECRET")?,
        };

        let defaults = TransformSettings::default();
        let max_length = match env.optional("MAX_TWITTER_LENGTH") {
            Some(raw) => parse_max_length(&raw)?,
            None => defaults.max_length,
        };

        let transform = TransformSettings {
            max_length,
            skip_long_posts: env.flag("SKIP_LONG_POSTS", defaults.skip_long_posts)?,
            remove_urls: env.flag("REMOVE_URLS", defaults.remove_urls)?,
            remove_hashtags: env.flag("REMOVE_HASHTAGS", defaults.remove_hashtags)?,
            remove_mentions: env.flag("REMOVE_MENTIONS", defaults.remove_mentions)?,
            remove_emojis: env.flag("REMOVE_EMOJIS", defaults.remove_emojis)?,
            trim_extra_spaces: env.flag("TRIM_EXTRA_SPACES", defaults.trim_extra_spaces)?,
            // Prefix and suffix are taken verbatim; an explicitly empty value clears them.
            prefix: (env.lookup)("ADD_PREFIX").unwrap_or(defaults.prefix),
            suffix: (env.lookup)("ADD_SUFFIX").unwrap_or(defaults.suffix),
        };

        let health_port = match env.optional("HEALTH_PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: "HEALTH_PORT".into(),
                message: format!("expected a port number, got {raw:?}"),
            })?,
            None => DEFAULT_HEALTH_PORT,
        };

        let log_file = env
            .optional("LOG_FILE")
            .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string());

        Ok(Self {
            telegram,
            twitter,
            transform,
            health_port,
            log_file,
        })
    }

    /// Log the non-secret parts of the configuration.
    pub fn trace_loaded(&self) {
        info!(
            source_channels = self.telegram.source_channels.len(),
            log_channel = self.telegram.log_channel,
            max_length = self.transform.max_length,
            skip_long_posts = self.transform.skip_long_posts,
            "Loaded relay config"
        );
        debug!(transform = ?self.transform, health_port = self.health_port, "Transform settings");
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Set and non-blank.
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        self.required(key).map(SecretString::from)
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.optional(key) {
            Some(raw) => parse_bool(key, &raw),
            None => Ok(default),
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {raw:?}"),
        }),
    }
}

fn parse_int(key: &str, raw: &str) -> Result<i64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected an integer, got {raw:?}"),
    })
}

fn parse_max_length(raw: &str) -> Result<usize, ConfigError> {
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue {
            key: "MAX_TWITTER_LENGTH".into(),
            message: format!("expected a positive integer, got {raw:?}"),
        }),
    }
}

fn parse_channel_list(key: &str, raw: &str) -> Result<Vec<i64>, ConfigError> {
    let channels = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_int(key, s))
        .collect::<Result<Vec<_>, _>>()?;

    if channels.is_empty() {
        return Err(ConfigError::MissingEnvVar(key.to_string()));
    }
    Ok(channels)
}
