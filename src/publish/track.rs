//! Local video track lifecycle
//!
//! [`LocalVideoTrack`] owns the capture pipeline (capturer, source and media
//! track) of one published stream, the render sinks attached to it, the
//! primary sender reference and the codec negotiation state. All methods take
//! `&mut self`; callers run them on one execution context, usually through
//! [`crate::publish::worker::TrackWorker`].

use crate::capture::{
    build_pipeline, CameraControl, CaptureFactory, CapturePipeline, SinkRef, VideoProcessor,
};
use crate::errors::PublishError;
use crate::publish::closer::ResourceCloser;
use crate::publish::layers::{self, LayerUpdate};
use crate::publish::negotiator::{CodecNegotiator, SimulcastTrackInfo};
use crate::types::{
    CameraPosition, CaptureOptions, CodecUpdate, QualityRequest, TrackId, VideoCodec,
    VideoDimensions,
};
use crate::webrtc::sender::{Encoding, SenderRef};
use std::sync::Arc;

pub struct LocalVideoTrack {
    name: String,
    factory: Box<dyn CaptureFactory>,
    options: CaptureOptions,
    pipeline: Option<CapturePipeline>,
    sender: Option<SenderRef>,
    negotiator: CodecNegotiator,
    sinks: Vec<SinkRef>,
    closer: ResourceCloser,
    capturing: bool,
    disposed: bool,
}

impl LocalVideoTrack {
    /// Build the capture pipeline through `factory`. Capture is not started.
    pub fn create(
        name: impl Into<String>,
        mut factory: Box<dyn CaptureFactory>,
        options: CaptureOptions,
        processor: Option<Box<dyn VideoProcessor>>,
    ) -> Result<Self, PublishError> {
        let name = name.into();
        let (pipeline, effective, helper) = build_pipeline(factory.as_mut(), &options, processor)?;

        let mut closer = ResourceCloser::new();
        if let Some(helper) = helper {
            closer.register(pipeline.media_track.id().clone(), helper);
        }

        log::info!(
            "Created local video track {} (media track {})",
            name,
            pipeline.media_track.id()
        );

        Ok(Self {
            name,
            factory,
            options: effective,
            pipeline: Some(pipeline),
            sender: None,
            negotiator: CodecNegotiator::new(),
            sinks: Vec::new(),
            closer,
            capturing: false,
            disposed: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Identity of the live media track, absent after dispose or a failed restart.
    pub fn media_track_id(&self) -> Option<&TrackId> {
        self.pipeline.as_ref().map(|p| p.media_track.id())
    }

    pub fn sinks(&self) -> &[SinkRef] {
        &self.sinks
    }

    pub fn sender(&self) -> Option<&SenderRef> {
        self.sender.as_ref()
    }

    pub fn codec(&self) -> Option<VideoCodec> {
        self.negotiator.active_codec()
    }

    /// Set the codec the primary sender publishes with.
    pub fn set_codec(&mut self, codec: VideoCodec) {
        self.negotiator.set_active_codec(Some(codec));
    }

    pub fn subscribed_codecs(&self) -> &[CodecUpdate] {
        self.negotiator.subscribed_codecs()
    }

    pub fn simulcast_track(&self, codec: VideoCodec) -> Option<SimulcastTrackInfo> {
        self.negotiator.simulcast_track(codec)
    }

    pub fn resource_count(&self) -> usize {
        self.closer.len()
    }

    /// Size the capturer produces. Uses the capturer's own format negotiation
    /// when it has one.
    pub fn dimensions(&self) -> VideoDimensions {
        let requested = self.options.requested_dimensions();
        self.pipeline
            .as_ref()
            .and_then(|p| p.capturer.size_negotiation())
            .map(|sizes| sizes.find_capture_size(requested))
            .unwrap_or(requested)
    }

    pub fn start_capture(&mut self) -> Result<(), PublishError> {
        if self.disposed {
            log::warn!("start_capture on disposed track {}, ignoring", self.name);
            return Ok(());
        }
        let dimensions = self.dimensions();
        let fps = self.options.capture_params.max_fps;
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| PublishError::Capture("track has no capture pipeline".to_string()))?;

        pipeline
            .capturer
            .start_capture(dimensions.width, dimensions.height, fps)?;
        self.capturing = true;
        log::debug!(
            "Capture started on {} at {}x{}@{}",
            self.name,
            dimensions.width,
            dimensions.height,
            fps
        );
        Ok(())
    }

    pub fn stop_capture(&mut self) -> Result<(), PublishError> {
        if self.disposed {
            log::warn!("stop_capture on disposed track {}, ignoring", self.name);
            return Ok(());
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.capturer.stop_capture()?;
        }
        self.capturing = false;
        Ok(())
    }

    /// Switch camera through the capturer's camera-control capability.
    pub fn switch_camera(
        &mut self,
        device_id: Option<&str>,
        position: Option<CameraPosition>,
    ) -> Result<(), PublishError> {
        if self.disposed {
            log::warn!("switch_camera on disposed track {}, ignoring", self.name);
            return Ok(());
        }
        let pipeline = self
            .pipeline
            .as_mut()
            .ok_or_else(|| PublishError::Capture("track has no capture pipeline".to_string()))?;
        let control: &mut dyn CameraControl = pipeline
            .capturer
            .camera_control()
            .ok_or_else(|| PublishError::Unsupported("capturer cannot switch cameras".to_string()))?;

        let new_device = control.switch_camera(device_id, position)?;
        log::info!("Track {} switched to camera {}", self.name, new_device);
        self.options.device_id = Some(new_device);
        if position.is_some() {
            self.options.position = position;
        }
        Ok(())
    }

    /// Attach a render sink. Adding a sink twice is a no-op.
    pub fn add_sink(&mut self, sink: SinkRef) {
        if self.disposed {
            log::warn!("add_sink on disposed track {}, ignoring", self.name);
            return;
        }
        if self.sinks.iter().any(|s| same_sink(s, &sink)) {
            return;
        }
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.media_track.add_sink(sink.clone());
        }
        self.sinks.push(sink);
    }

    pub fn remove_sink(&mut self, sink: &SinkRef) {
        let Some(index) = self.sinks.iter().position(|s| same_sink(s, sink)) else {
            return;
        };
        let removed = self.sinks.remove(index);
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.media_track.remove_sink(&removed);
        }
    }

    /// Bind the primary sender once the track is attached to a connection.
    pub fn bind_sender(&mut self, sender: SenderRef) {
        if self.disposed {
            log::warn!("bind_sender on disposed track {}, ignoring", self.name);
            return;
        }
        log::debug!("Track {} bound to sender {}", self.name, sender.id());
        self.sender = Some(sender);
    }

    pub fn unbind_sender(&mut self) -> Option<SenderRef> {
        self.sender.take()
    }

    /// Apply a standalone quality subscription to the primary sender.
    pub fn apply_qualities(&mut self, qualities: &[QualityRequest]) {
        if self.disposed {
            log::warn!("Attempted to set publishing layers on disposed track {}", self.name);
            return;
        }
        let Some(sender) = self.sender.as_ref() else {
            log::debug!("Track {} has no sender, layer update skipped", self.name);
            return;
        };
        if layers::apply_qualities(sender.as_ref(), qualities) == LayerUpdate::Skipped {
            log::debug!("Layer update on track {} skipped", self.name);
        }
    }

    /// Apply a codec subscription round. Returns codecs that need a new
    /// alternate track; the caller creates them and calls
    /// [`Self::add_simulcast_track`].
    pub fn apply_codec_updates(&mut self, updates: &[CodecUpdate]) -> Vec<VideoCodec> {
        if self.disposed {
            log::warn!("Attempted to set publishing codecs on disposed track {}", self.name);
            return Vec::new();
        }
        self.negotiator
            .apply_codec_updates(self.sender.as_ref(), updates)
    }

    pub fn add_simulcast_track(
        &mut self,
        codec: VideoCodec,
        encodings: Vec<Encoding>,
    ) -> Result<SimulcastTrackInfo, PublishError> {
        if self.disposed {
            return Err(PublishError::Disposed);
        }
        self.negotiator.add_simulcast_track(codec, encodings)
    }

    /// Bind the sender of an alternate-codec track and bring its layers in
    /// line with the latest negotiation round.
    pub fn bind_simulcast_sender(
        &mut self,
        codec: VideoCodec,
        sender: SenderRef,
    ) -> Result<(), PublishError> {
        if self.disposed {
            return Err(PublishError::Disposed);
        }
        let pending = self
            .negotiator
            .bind_simulcast_sender(codec, sender.clone())?;
        if let Some(qualities) = pending {
            layers::apply_qualities(sender.as_ref(), &qualities);
        }
        Ok(())
    }

    /// Replace the capture pipeline with one built from `options`.
    ///
    /// Old capturer, source, media track and helper resources are released
    /// before the new pipeline is constructed. Sinks move to the new media
    /// track in their attachment order, capture resumes and a bound sender is
    /// re-pointed without renegotiation. If capture fails to start the sender
    /// is still re-pointed and the track keeps the new, stopped pipeline. On a
    /// disposed track this logs and does nothing.
    pub fn restart(
        &mut self,
        options: CaptureOptions,
        processor: Option<Box<dyn VideoProcessor>>,
    ) -> Result<(), PublishError> {
        if self.disposed {
            log::warn!("Attempting to restart track {} that was already disposed, aborting", self.name);
            return Ok(());
        }

        let mut old = self.pipeline.take();
        if let Some(old) = old.as_mut() {
            release_pipeline(old);
            if let Some(mut helper) = self.closer.unregister(old.media_track.id()) {
                if let Err(e) = helper.close() {
                    log::warn!("Failed to close helper of {}: {}", old.media_track.id(), e);
                }
            }
        }
        self.capturing = false;

        let (mut pipeline, effective, helper) =
            build_pipeline(self.factory.as_mut(), &options, processor).map_err(|e| {
                log::error!("Restart of track {} failed: {}", self.name, e);
                e
            })?;
        if let Some(helper) = helper {
            self.closer.register(pipeline.media_track.id().clone(), helper);
        }

        for sink in &self.sinks {
            if let Some(old) = old.as_mut() {
                old.media_track.remove_sink(sink);
            }
            pipeline.media_track.add_sink(sink.clone());
        }

        let new_id = pipeline.media_track.id().clone();
        self.pipeline = Some(pipeline);
        self.options = effective;

        let started = self.start_capture();

        if let Some(sender) = self.sender.as_ref() {
            sender.replace_track(Some(&new_id))?;
        }
        started?;

        log::info!("Restarted track {} on media track {}", self.name, new_id);
        Ok(())
    }

    /// Release capturer, source, sender references and helper resources, in
    /// that order. Runs once.
    pub fn dispose(&mut self) {
        if self.disposed {
            log::warn!("Track {} already disposed", self.name);
            return;
        }
        self.disposed = true;
        self.capturing = false;

        if let Some(mut pipeline) = self.pipeline.take() {
            release_pipeline(&mut pipeline);
        }

        self.sender = None;
        self.negotiator.release_senders();

        for failure in self.closer.close_all() {
            log::warn!(
                "Resource of {} failed to close on dispose: {}",
                failure.owner,
                failure.error
            );
        }
        log::info!("Disposed track {}", self.name);
    }
}

impl Drop for LocalVideoTrack {
    fn drop(&mut self) {
        if !self.disposed {
            self.dispose();
        }
    }
}

fn release_pipeline(pipeline: &mut CapturePipeline) {
    if let Err(e) = pipeline.capturer.stop_capture() {
        log::warn!("Failed to stop capturer: {}", e);
    }
    pipeline.capturer.dispose();
    pipeline.source.dispose();
    pipeline.media_track.set_enabled(false);
    pipeline.media_track.dispose();
}

fn same_sink(a: &SinkRef, b: &SinkRef) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
