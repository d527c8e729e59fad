//! Designated execution context for a track
//!
//! A [`TrackWorker`] owns one [`LocalVideoTrack`] on a dedicated tokio task.
//! Every operation is queued as a command and answered over a oneshot
//! channel, so restarts, layer updates and codec updates on the same track
//! never overlap. [`TrackHandle`] is the cloneable front end.

use crate::capture::{SinkRef, VideoProcessor};
use crate::errors::PublishError;
use crate::publish::negotiator::SimulcastTrackInfo;
use crate::publish::track::LocalVideoTrack;
use crate::types::{
    CameraPosition, CaptureOptions, CodecUpdate, QualityRequest, TrackId, VideoCodec,
    VideoDimensions,
};
use crate::webrtc::sender::{Encoding, SenderRef};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Inbound message from the negotiation channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NegotiationEvent {
    SubscribedCodecs { codecs: Vec<CodecUpdate> },
    SubscribedQualities { qualities: Vec<QualityRequest> },
}

/// Point-in-time view of a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSnapshot {
    pub name: String,
    pub codec: Option<VideoCodec>,
    pub media_track_id: Option<TrackId>,
    pub options: CaptureOptions,
    pub dimensions: VideoDimensions,
    pub sink_count: usize,
    pub resource_count: usize,
    pub capturing: bool,
    pub disposed: bool,
    pub subscribed_codecs: Vec<CodecUpdate>,
}

impl TrackSnapshot {
    fn of(track: &LocalVideoTrack) -> Self {
        Self {
            name: track.name().to_string(),
            codec: track.codec(),
            media_track_id: track.media_track_id().cloned(),
            options: track.options().clone(),
            dimensions: track.dimensions(),
            sink_count: track.sinks().len(),
            resource_count: track.resource_count(),
            capturing: track.is_capturing(),
            disposed: track.is_disposed(),
            subscribed_codecs: track.subscribed_codecs().to_vec(),
        }
    }
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Restart {
        options: CaptureOptions,
        processor: Option<Box<dyn VideoProcessor>>,
        reply: Reply<Result<(), PublishError>>,
    },
    StartCapture(Reply<Result<(), PublishError>>),
    StopCapture(Reply<Result<(), PublishError>>),
    SwitchCamera {
        device_id: Option<String>,
        position: Option<CameraPosition>,
        reply: Reply<Result<(), PublishError>>,
    },
    AddSink(SinkRef, Reply<()>),
    RemoveSink(SinkRef, Reply<()>),
    BindSender(SenderRef, Reply<()>),
    SetCodec(VideoCodec, Reply<()>),
    ApplyQualities(Vec<QualityRequest>, Reply<()>),
    ApplyCodecUpdates(Vec<CodecUpdate>, Reply<Vec<VideoCodec>>),
    AddSimulcastTrack {
        codec: VideoCodec,
        encodings: Vec<Encoding>,
        reply: Reply<Result<SimulcastTrackInfo, PublishError>>,
    },
    BindSimulcastSender {
        codec: VideoCodec,
        sender: SenderRef,
        reply: Reply<Result<(), PublishError>>,
    },
    Snapshot(Reply<TrackSnapshot>),
    Shutdown(Reply<()>),
}

pub struct TrackWorker;

impl TrackWorker {
    /// Move `track` onto its own task. `capacity` bounds the command queue.
    pub fn spawn(track: LocalVideoTrack, capacity: usize) -> (TrackHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let name = track.name().to_string();
        let task = tokio::spawn(run(track, rx));
        log::debug!("Spawned worker for track {}", name);
        (TrackHandle { name, commands: tx }, task)
    }
}

async fn run(mut track: LocalVideoTrack, mut commands: mpsc::Receiver<Command>) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Restart {
                options,
                processor,
                reply,
            } => {
                let _ = reply.send(track.restart(options, processor));
            }
            Command::StartCapture(reply) => {
                let _ = reply.send(track.start_capture());
            }
            Command::StopCapture(reply) => {
                let _ = reply.send(track.stop_capture());
            }
            Command::SwitchCamera {
                device_id,
                position,
                reply,
            } => {
                let _ = reply.send(track.switch_camera(device_id.as_deref(), position));
            }
            Command::AddSink(sink, reply) => {
                track.add_sink(sink);
                let _ = reply.send(());
            }
            Command::RemoveSink(sink, reply) => {
                track.remove_sink(&sink);
                let _ = reply.send(());
            }
            Command::BindSender(sender, reply) => {
                track.bind_sender(sender);
                let _ = reply.send(());
            }
            Command::SetCodec(codec, reply) => {
                track.set_codec(codec);
                let _ = reply.send(());
            }
            Command::ApplyQualities(qualities, reply) => {
                track.apply_qualities(&qualities);
                let _ = reply.send(());
            }
            Command::ApplyCodecUpdates(updates, reply) => {
                let _ = reply.send(track.apply_codec_updates(&updates));
            }
            Command::AddSimulcastTrack {
                codec,
                encodings,
                reply,
            } => {
                let _ = reply.send(track.add_simulcast_track(codec, encodings));
            }
            Command::BindSimulcastSender {
                codec,
                sender,
                reply,
            } => {
                let _ = reply.send(track.bind_simulcast_sender(codec, sender));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(TrackSnapshot::of(&track));
            }
            Command::Shutdown(reply) => {
                track.dispose();
                let _ = reply.send(());
                break;
            }
        }
    }
    log::debug!("Worker for track {} stopped", track.name());
}

/// Cloneable handle queuing commands onto a track's worker.
#[derive(Clone)]
pub struct TrackHandle {
    name: String,
    commands: mpsc::Sender<Command>,
}

impl TrackHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the worker is still accepting commands.
    pub fn is_alive(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, PublishError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| PublishError::Disposed)?;
        rx.await.map_err(|_| PublishError::Disposed)
    }

    /// Restart the capture pipeline. A track already torn down is logged and
    /// treated as a no-op.
    pub async fn restart(
        &self,
        options: CaptureOptions,
        processor: Option<Box<dyn VideoProcessor>>,
    ) -> Result<(), PublishError> {
        match self
            .request(|reply| Command::Restart {
                options,
                processor,
                reply,
            })
            .await
        {
            Err(PublishError::Disposed) => {
                log::warn!("Restart requested on stopped track {}", self.name);
                Ok(())
            }
            other => other?,
        }
    }

    pub async fn start_capture(&self) -> Result<(), PublishError> {
        self.request(Command::StartCapture).await?
    }

    pub async fn stop_capture(&self) -> Result<(), PublishError> {
        self.request(Command::StopCapture).await?
    }

    pub async fn switch_camera(
        &self,
        device_id: Option<String>,
        position: Option<CameraPosition>,
    ) -> Result<(), PublishError> {
        self.request(|reply| Command::SwitchCamera {
            device_id,
            position,
            reply,
        })
        .await?
    }

    pub async fn add_sink(&self, sink: SinkRef) -> Result<(), PublishError> {
        self.request(|reply| Command::AddSink(sink, reply)).await
    }

    pub async fn remove_sink(&self, sink: SinkRef) -> Result<(), PublishError> {
        self.request(|reply| Command::RemoveSink(sink, reply)).await
    }

    pub async fn bind_sender(&self, sender: SenderRef) -> Result<(), PublishError> {
        self.request(|reply| Command::BindSender(sender, reply)).await
    }

    pub async fn set_codec(&self, codec: VideoCodec) -> Result<(), PublishError> {
        self.request(|reply| Command::SetCodec(codec, reply)).await
    }

    /// Apply a quality subscription. Never fails; a stopped worker is logged.
    pub async fn apply_qualities(&self, qualities: Vec<QualityRequest>) {
        if self
            .request(|reply| Command::ApplyQualities(qualities, reply))
            .await
            .is_err()
        {
            log::warn!("Layer update dropped, track {} is stopped", self.name);
        }
    }

    /// Apply a codec subscription round. A stopped worker yields no codecs.
    pub async fn apply_codec_updates(&self, updates: Vec<CodecUpdate>) -> Vec<VideoCodec> {
        self.request(|reply| Command::ApplyCodecUpdates(updates, reply))
            .await
            .unwrap_or_else(|_| {
                log::warn!("Codec update dropped, track {} is stopped", self.name);
                Vec::new()
            })
    }

    /// Route an inbound negotiation message. Returns codecs needing new tracks.
    pub async fn deliver(&self, event: NegotiationEvent) -> Vec<VideoCodec> {
        match event {
            NegotiationEvent::SubscribedCodecs { codecs } => self.apply_codec_updates(codecs).await,
            NegotiationEvent::SubscribedQualities { qualities } => {
                self.apply_qualities(qualities).await;
                Vec::new()
            }
        }
    }

    pub async fn add_simulcast_track(
        &self,
        codec: VideoCodec,
        encodings: Vec<Encoding>,
    ) -> Result<SimulcastTrackInfo, PublishError> {
        self.request(|reply| Command::AddSimulcastTrack {
            codec,
            encodings,
            reply,
        })
        .await?
    }

    pub async fn bind_simulcast_sender(
        &self,
        codec: VideoCodec,
        sender: SenderRef,
    ) -> Result<(), PublishError> {
        self.request(|reply| Command::BindSimulcastSender {
            codec,
            sender,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<TrackSnapshot, PublishError> {
        self.request(Command::Snapshot).await
    }

    /// Dispose the track and stop the worker. Later calls see a stopped track.
    pub async fn shutdown(&self) -> Result<(), PublishError> {
        self.request(Command::Shutdown).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFactory, FakeSender};
    use crate::types::VideoQuality;
    use std::sync::Arc;

    fn spawn_track(factory: &FakeFactory) -> (TrackHandle, JoinHandle<()>) {
        let track = LocalVideoTrack::create(
            "worker",
            Box::new(factory.clone()),
            CaptureOptions::default(),
            None,
        )
        .unwrap();
        TrackWorker::spawn(track, 8)
    }

    #[test]
    fn test_negotiation_event_json() {
        let json = r#"{"type":"subscribed_qualities","qualities":[{"quality":"LOW","enabled":true}]}"#;
        let event: NegotiationEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            NegotiationEvent::SubscribedQualities {
                qualities: vec![QualityRequest::new(VideoQuality::Low, true)]
            }
        );
    }

    #[tokio::test]
    async fn test_commands_reach_track() {
        let factory = FakeFactory::new();
        let (handle, _task) = spawn_track(&factory);
        let sender = Arc::new(FakeSender::new(
            "primary",
            vec![Encoding::simulcast("q", false), Encoding::simulcast("f", false)],
        ));

        handle.bind_sender(sender.clone()).await.unwrap();
        handle.set_codec(VideoCodec::Vp8).await.unwrap();
        handle
            .deliver(NegotiationEvent::SubscribedQualities {
                qualities: vec![QualityRequest::new(VideoQuality::High, true)],
            })
            .await;

        assert_eq!(sender.active_rids(), vec!["f"]);
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.codec, Some(VideoCodec::Vp8));
        assert!(!snapshot.disposed);
    }

    #[tokio::test]
    async fn test_shutdown_stops_worker() {
        let factory = FakeFactory::new();
        let (handle, task) = spawn_track(&factory);

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(!handle.is_alive());
        assert_eq!(factory.journal().count("capturer.dispose"), 1);
        assert!(handle.restart(CaptureOptions::default(), None).await.is_ok());
        assert!(handle.apply_codec_updates(Vec::new()).await.is_empty());
        assert!(matches!(handle.snapshot().await, Err(PublishError::Disposed)));
    }
}
