//! Integration tests for the dispatch loop.
//!
//! The posting client and log sink are replaced by in-memory stubs so the
//! routing contract can be checked without any network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use smart_relay::channels::{
    LogSink, MediaFile, MediaSource, MessageStream, Outcome, Publisher, Report,
};
use smart_relay::config::TransformSettings;
use smart_relay::dispatch::{DispatchStats, Dispatcher};
use smart_relay::error::{ChannelError, PublishError};
use smart_relay::pipeline::{Media, MediaKind, RawMessage, SkipReason, Transformer};

/// Records every published text; rejects texts containing "FAIL".
#[derive(Default)]
struct StubPublisher {
    posts: Mutex<Vec<String>>,
    attachments: Mutex<Vec<String>>,
}

#[async_trait]
impl Publisher for StubPublisher {
    fn name(&self) -> &str {
        "stub"
    }

    async fn publish(
        &self,
        text: &str,
        media: Option<&MediaFile>,
    ) -> Result<String, PublishError> {
        if text.contains("FAIL") {
            return Err(PublishError::Api {
                status: 403,
                body: "duplicate content".into(),
            });
        }
        if let Some(file) = media {
            self.attachments.lock().unwrap().push(file.file_name.clone());
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(text.to_string());
        Ok(format!("post-{}", posts.len()))
    }
}

/// Records reports; optionally fails every write.
#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<Report>>,
    broken: bool,
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn report(&self, report: &Report) -> Result<(), ChannelError> {
        self.reports.lock().unwrap().push(report.clone());
        if self.broken {
            return Err(ChannelError::SendFailed {
                name: "stub".into(),
                reason: "log channel unavailable".into(),
            });
        }
        Ok(())
    }
}

/// Serves a fixed payload for any file id except "missing".
struct StubMediaSource;

#[async_trait]
impl MediaSource for StubMediaSource {
    async fn fetch(&self, media: &Media) -> Result<MediaFile, ChannelError> {
        if media.file_id == "missing" {
            return Err(ChannelError::DownloadFailed {
                file_id: media.file_id.clone(),
                reason: "file is too big".into(),
            });
        }
        Ok(MediaFile {
            kind: media.kind,
            file_name: format!("{}.jpg", media.file_id),
            bytes: vec![0xFF, 0xD8],
        })
    }
}

fn photo(file_id: &str) -> Media {
    Media {
        kind: MediaKind::Photo,
        file_id: file_id.into(),
        file_size: None,
    }
}

fn settings() -> TransformSettings {
    TransformSettings {
        max_length: 20,
        skip_long_posts: true,
        ..TransformSettings::default()
    }
}

fn stream(messages: Vec<RawMessage>) -> MessageStream {
    Box::pin(futures::stream::iter(messages))
}

fn dispatcher(
    settings: TransformSettings,
    sink: RecordingSink,
) -> (Dispatcher, Arc<StubPublisher>, Arc<RecordingSink>) {
    let publisher = Arc::new(StubPublisher::default());
    let sink = Arc::new(sink);
    let dispatcher = Dispatcher::new(
        Transformer::new(settings),
        publisher.clone(),
        sink.clone(),
    );
    (dispatcher, publisher, sink)
}

#[tokio::test]
async fn publishes_transformed_text() {
    let (dispatcher, publisher, sink) = dispatcher(settings(), RecordingSink::default());

    let outcome = dispatcher
        .handle(&RawMessage::new(1, -100, "hi   https://x.io"))
        .await;

    assert_eq!(
        outcome,
        Outcome::Published {
            post_id: "post-1".into(),
            text: "📢 hi".into()
        }
    );
    assert_eq!(*publisher.posts.lock().unwrap(), vec!["📢 hi".to_string()]);

    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].message_id, 1);
    assert_eq!(reports[0].source_channel_id, -100);
}

#[tokio::test]
async fn skip_is_reported_and_not_published() {
    let (dispatcher, publisher, sink) = dispatcher(settings(), RecordingSink::default());

    let outcome = dispatcher
        .handle(&RawMessage::new(2, -100, "this text is far too long for twenty"))
        .await;

    match &outcome {
        Outcome::Skipped {
            reason: SkipReason::TooLong { max_length: 20, .. },
            text,
        } => assert_eq!(text, "📢 this text is far too long for twenty"),
        other => panic!("expected TooLong skip, got {other:?}"),
    }
    assert!(publisher.posts.lock().unwrap().is_empty());
    assert_eq!(sink.reports.lock().unwrap()[0].outcome, outcome);
}

#[tokio::test]
async fn empty_message_is_skipped() {
    let (dispatcher, publisher, sink) = dispatcher(
        TransformSettings {
            prefix: String::new(),
            ..settings()
        },
        RecordingSink::default(),
    );

    let outcome = dispatcher
        .handle(&RawMessage::new(3, -100, "").with_media(photo("AgAD")))
        .await;

    assert_eq!(
        outcome,
        Outcome::Skipped {
            reason: SkipReason::Empty,
            text: String::new(),
        }
    );
    assert!(publisher.posts.lock().unwrap().is_empty());

    // The media still reaches the log channel with the report.
    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].media, Some(photo("AgAD")));
}

#[tokio::test]
async fn media_is_fetched_and_attached() {
    let (dispatcher, publisher, _sink) = dispatcher(settings(), RecordingSink::default());
    let dispatcher = dispatcher.with_media_source(Arc::new(StubMediaSource));

    let outcome = dispatcher
        .handle(&RawMessage::new(5, -100, "look").with_media(photo("AgAD")))
        .await;

    assert!(matches!(outcome, Outcome::Published { .. }));
    assert_eq!(*publisher.posts.lock().unwrap(), vec!["📢 look"]);
    assert_eq!(*publisher.attachments.lock().unwrap(), vec!["AgAD.jpg"]);
}

#[tokio::test]
async fn media_fetch_failure_is_a_publish_failure() {
    let (dispatcher, publisher, sink) = dispatcher(settings(), RecordingSink::default());
    let dispatcher = dispatcher.with_media_source(Arc::new(StubMediaSource));

    let outcome = dispatcher
        .handle(&RawMessage::new(6, -100, "look").with_media(photo("missing")))
        .await;

    match &outcome {
        Outcome::PublishFailed { error, text } => {
            assert!(error.contains("file is too big"));
            assert_eq!(text, "📢 look");
        }
        other => panic!("expected PublishFailed, got {other:?}"),
    }
    assert!(publisher.posts.lock().unwrap().is_empty());
    assert_eq!(sink.reports.lock().unwrap()[0].outcome, outcome);
}

#[tokio::test]
async fn without_media_source_posts_text_only() {
    let (dispatcher, publisher, _sink) = dispatcher(settings(), RecordingSink::default());

    dispatcher
        .handle(&RawMessage::new(7, -100, "look").with_media(photo("AgAD")))
        .await;

    assert_eq!(*publisher.posts.lock().unwrap(), vec!["📢 look"]);
    assert!(publisher.attachments.lock().unwrap().is_empty());
}

#[tokio::test]
async fn publish_failure_is_reported_without_retry() {
    let (dispatcher, publisher, sink) = dispatcher(settings(), RecordingSink::default());

    let outcome = dispatcher.handle(&RawMessage::new(4, -100, "FAIL me")).await;

    match &outcome {
        Outcome::PublishFailed { error, text } => {
            assert!(error.contains("403"));
            assert_eq!(text, "📢 FAIL me");
        }
        other => panic!("expected PublishFailed, got {other:?}"),
    }
    assert!(publisher.posts.lock().unwrap().is_empty());
    assert_eq!(sink.reports.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn broken_log_sink_does_not_stop_the_loop() {
    let (dispatcher, publisher, sink) = dispatcher(
        settings(),
        RecordingSink {
            broken: true,
            ..Default::default()
        },
    );

    let stats = dispatcher
        .run(stream(vec![
            RawMessage::new(1, -100, "one"),
            RawMessage::new(2, -100, "two"),
        ]))
        .await;

    assert_eq!(stats.published, 2);
    assert_eq!(publisher.posts.lock().unwrap().len(), 2);
    assert_eq!(sink.reports.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn run_preserves_arrival_order_and_counts() {
    let (dispatcher, publisher, sink) = dispatcher(settings(), RecordingSink::default());

    let stats = dispatcher
        .run(stream(vec![
            RawMessage::new(1, -100, "first"),
            RawMessage::new(1, -200, "other channel"),
            RawMessage::new(2, -100, "a message that is much too long to fit"),
            RawMessage::new(3, -100, "FAIL"),
            RawMessage::new(4, -100, "last"),
        ]))
        .await;

    assert_eq!(
        stats,
        DispatchStats {
            published: 3,
            skipped: 1,
            failed: 1
        }
    );
    assert_eq!(
        *publisher.posts.lock().unwrap(),
        vec!["📢 first", "📢 other channel", "📢 last"]
    );

    let order: Vec<(i64, i64)> = sink
        .reports
        .lock()
        .unwrap()
        .iter()
        .map(|r| (r.source_channel_id, r.message_id))
        .collect();
    assert_eq!(order, vec![(-100, 1), (-200, 1), (-100, 2), (-100, 3), (-100, 4)]);
}

#[tokio::test]
async fn truncation_mode_publishes_cut_text() {
    let (dispatcher, publisher, _sink) = dispatcher(
        TransformSettings {
            skip_long_posts: false,
            prefix: String::new(),
            max_length: 10,
            ..settings()
        },
        RecordingSink::default(),
    );

    dispatcher
        .handle(&RawMessage::new(9, -100, "1234567890ABC"))
        .await;

    assert_eq!(*publisher.posts.lock().unwrap(), vec!["1234567890"]);
}
