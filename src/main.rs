use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use smart_relay::channels::{LogSink, MediaSource, Publisher, TelegramChannel, TwitterClient};
use smart_relay::config::RelayConfig;
use smart_relay::dispatch::Dispatcher;
use smart_relay::health;
use smart_relay::pipeline::Transformer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!(
            "  Required: TELEGRAM_API_ID, TELEGRAM_API_HASH, TELEGRAM_BOT_TOKEN, SOURCE_CHANNELS,"
        );
        eprintln!(
            "  LOG_CHANNEL, TWITTER_BEARER_TOKEN, TWITTER_CONSUMER_KEY, TWITTER_CONSUMER_SECRET,"
        );
        eprintln!("  TWITTER_ACCESS_TOKEN, TWITTER_ACCESS_SECRET");
        std::process::exit(1);
    });

    // Console + log file, both filtered by RUST_LOG (default: info)
    let log_path = Path::new(&config.log_file);
    let log_dir = log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_name = log_path
        .file_name()
        .context("LOG_FILE must name a file")?;
    let (file_writer, _log_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(log_dir, log_name));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    eprintln!("📢 Smart Relay v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Source channels: {:?}", config.telegram.source_channels);
    eprintln!("   Log channel: {}", config.telegram.log_channel);
    eprintln!("   Max length: {}", config.transform.max_length);
    eprintln!("   Skip long posts: {}", config.transform.skip_long_posts);
    eprintln!("   Health: http://0.0.0.0:{}/health\n", config.health_port);
    config.trace_loaded();

    // ── Health server ───────────────────────────────────────────────
    let health_port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = health::serve(health_port).await {
            tracing::error!(port = health_port, error = %e, "Health server failed");
        }
    });

    // ── Channels ────────────────────────────────────────────────────
    let telegram = Arc::new(TelegramChannel::new(
        config.telegram.bot_token.clone(),
        &config.telegram.source_channels,
        config.telegram.log_channel,
    ));
    telegram
        .health_check()
        .await
        .context("Telegram bot token check failed")?;

    let publisher: Arc<dyn Publisher> = Arc::new(TwitterClient::new(config.twitter.clone()));
    let log_sink: Arc<dyn LogSink> = telegram.clone();
    let media_source: Arc<dyn MediaSource> = telegram.clone();

    // ── Dispatch ────────────────────────────────────────────────────
    let dispatcher = Dispatcher::new(
        Transformer::new(config.transform.clone()),
        publisher,
        log_sink,
    )
    .with_media_source(media_source);
    let messages = telegram.start();

    tokio::select! {
        stats = dispatcher.run(messages) => {
            tracing::warn!(?stats, "Listener stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
