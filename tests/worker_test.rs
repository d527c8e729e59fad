//! Track worker: serialized command execution on a tokio task.

use crabcast::capture::SinkRef;
use crabcast::errors::PublishError;
use crabcast::publish::{LocalVideoTrack, NegotiationEvent, TrackHandle, TrackWorker};
use crabcast::testing::{FakeFactory, FakeSender, RecordingSink};
use crabcast::types::VideoQuality::{High, Low, Medium};
use crabcast::types::{CaptureOptions, CodecUpdate, QualityRequest, VideoCodec};
use crabcast::webrtc::Encoding;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_test::assert_ok;

fn spawn(factory: &FakeFactory) -> (TrackHandle, JoinHandle<()>) {
    let track = LocalVideoTrack::create(
        "camera",
        Box::new(factory.clone()),
        CaptureOptions::default(),
        None,
    )
    .unwrap();
    TrackWorker::spawn(track, 4)
}

fn simulcast_sender(id: &str) -> Arc<FakeSender> {
    Arc::new(FakeSender::new(
        id,
        vec![
            Encoding::simulcast("q", false),
            Encoding::simulcast("h", false),
            Encoding::simulcast("f", false),
        ],
    ))
}

#[tokio::test]
async fn test_restart_through_handle_keeps_sinks() {
    let factory = FakeFactory::new();
    let (handle, _task) = spawn(&factory);
    let sink: SinkRef = RecordingSink::new("preview");

    assert_ok!(handle.add_sink(sink).await);
    assert_ok!(handle.start_capture().await);
    assert_ok!(handle.restart(CaptureOptions::default(), None).await);

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.capturing);
    assert_eq!(snapshot.sink_count, 1);
    assert_eq!(snapshot.media_track_id.as_ref(), Some(factory.media_tracks()[1].id()));
    assert_eq!(factory.media_tracks()[1].sink_names(), vec!["preview"]);
}

#[tokio::test]
async fn test_negotiation_events_in_order() {
    let factory = FakeFactory::new();
    let (handle, _task) = spawn(&factory);
    let primary = simulcast_sender("primary");
    handle.bind_sender(primary.clone()).await.unwrap();
    handle.set_codec(VideoCodec::Vp8).await.unwrap();

    let needed = handle
        .deliver(NegotiationEvent::SubscribedCodecs {
            codecs: vec![
                CodecUpdate::new("vp8", vec![QualityRequest::new(Low, true)]),
                CodecUpdate::new("av1", vec![QualityRequest::new(High, true)]),
            ],
        })
        .await;
    assert_eq!(needed, vec![VideoCodec::Av1]);

    handle
        .deliver(NegotiationEvent::SubscribedQualities {
            qualities: vec![
                QualityRequest::new(Low, false),
                QualityRequest::new(Medium, true),
            ],
        })
        .await;
    assert_eq!(primary.active_rids(), vec!["h"]);
    assert_eq!(primary.write_count(), 2);
}

#[tokio::test]
async fn test_repeated_quality_in_one_message_keeps_worker_alive() {
    let factory = FakeFactory::new();
    let (handle, _task) = spawn(&factory);
    let primary = Arc::new(FakeSender::new(
        "primary",
        vec![Encoding::simulcast("q", true), Encoding::simulcast("h", false)],
    ));
    handle.bind_sender(primary.clone()).await.unwrap();

    handle
        .deliver(NegotiationEvent::SubscribedQualities {
            qualities: vec![QualityRequest::new(Low, false), QualityRequest::new(Low, true)],
        })
        .await;

    assert!(handle.is_alive());
    assert!(handle.snapshot().await.is_ok());
    assert_eq!(primary.write_count(), 0);
    assert_eq!(primary.active_rids(), vec!["q"]);
}

#[tokio::test]
async fn test_concurrent_callers_are_serialized() {
    let factory = FakeFactory::new();
    let (handle, _task) = spawn(&factory);
    let primary = simulcast_sender("primary");
    handle.bind_sender(primary.clone()).await.unwrap();

    let restarts = (0..3).map(|_| {
        let handle = handle.clone();
        tokio::spawn(async move { handle.restart(CaptureOptions::default(), None).await })
    });
    let layers = (0..3).map(|_| {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle
                .apply_qualities(vec![QualityRequest::new(Low, true)])
                .await
        })
    });

    for result in futures::future::join_all(restarts).await {
        result.unwrap().unwrap();
    }
    futures::future::join_all(layers).await;

    let capturers = factory.capturers();
    assert_eq!(capturers.len(), 4);
    assert!(capturers[..3].iter().all(|c| c.dispose_count() == 1));
    assert_eq!(capturers[3].dispose_count(), 0);
    assert_eq!(primary.replace_count(), 3);
    assert_eq!(primary.active_rids(), vec!["q"]);
    assert_eq!(primary.write_count(), 1);
}

#[tokio::test]
async fn test_alternate_codec_roundtrip() {
    let factory = FakeFactory::new();
    let (handle, _task) = spawn(&factory);
    handle.set_codec(VideoCodec::Vp8).await.unwrap();

    let needed = handle
        .apply_codec_updates(vec![CodecUpdate::new(
            "h264",
            vec![QualityRequest::new(Medium, true)],
        )])
        .await;
    assert_eq!(needed, vec![VideoCodec::H264]);

    let alternate = simulcast_sender("h264");
    handle
        .add_simulcast_track(VideoCodec::H264, alternate.encodings())
        .await
        .unwrap();
    handle
        .bind_simulcast_sender(VideoCodec::H264, alternate.clone())
        .await
        .unwrap();
    assert_eq!(alternate.active_rids(), vec!["h"]);

    let again = handle
        .add_simulcast_track(VideoCodec::H264, Vec::new())
        .await;
    assert!(matches!(again, Err(PublishError::AlreadyExists(_))));
}

#[tokio::test]
async fn test_dropping_handles_disposes_track() {
    let factory = FakeFactory::new();
    let (handle, task) = spawn(&factory);
    handle.start_capture().await.unwrap();

    drop(handle);
    task.await.unwrap();

    assert_eq!(factory.journal().count("capturer.dispose"), 1);
    assert_eq!(factory.helpers()[0].close_count(), 1);
}

#[tokio::test]
async fn test_calls_after_shutdown() {
    let factory = FakeFactory::new();
    let (handle, task) = spawn(&factory);
    let primary = simulcast_sender("primary");
    handle.bind_sender(primary.clone()).await.unwrap();

    handle.shutdown().await.unwrap();
    task.await.unwrap();

    handle
        .apply_qualities(vec![QualityRequest::new(High, true)])
        .await;
    assert_eq!(primary.write_count(), 0);
    assert!(matches!(handle.start_capture().await, Err(PublishError::Disposed)));
    assert!(matches!(handle.shutdown().await, Err(PublishError::Disposed)));
}
