//! Capture-side collaborator seams
//!
//! Capture, encoding and rendering live outside this crate. The track consumes
//! them through the traits here: a capturer with optional capabilities, a video
//! source, a media track that render sinks attach to, and the factory that
//! builds all three.

use crate::errors::PublishError;
use crate::types::{CameraPosition, CaptureOptions, TrackId, VideoDimensions};
use std::sync::Arc;

/// Camera switching, only offered by camera-backed capturers.
pub trait CameraControl {
    /// Switch to `device_id` or, if absent, to the first device facing
    /// `position`. Returns the device id now in use.
    fn switch_camera(
        &mut self,
        device_id: Option<&str>,
        position: Option<CameraPosition>,
    ) -> Result<String, PublishError>;
}

/// Capture format negotiation, offered by capturers that know their supported sizes.
pub trait CaptureSizeNegotiation {
    /// Closest supported capture size for the requested one.
    fn find_capture_size(&self, requested: VideoDimensions) -> VideoDimensions;
}

/// Common capture control. Extra behavior is exposed as capabilities that
/// callers query explicitly.
pub trait VideoCapturer: Send {
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> Result<(), PublishError>;

    fn stop_capture(&mut self) -> Result<(), PublishError>;

    fn dispose(&mut self);

    fn camera_control(&mut self) -> Option<&mut dyn CameraControl> {
        None
    }

    fn size_negotiation(&self) -> Option<&dyn CaptureSizeNegotiation> {
        None
    }
}

/// Frame processing hook attached to a source.
pub trait VideoProcessor: Send {
    fn name(&self) -> &str;
}

pub trait VideoSource: Send {
    fn set_processor(&mut self, processor: Option<Box<dyn VideoProcessor>>);

    fn dispose(&mut self);
}

/// Render sink. Identity is the `Arc` pointer.
pub trait VideoSink: Send + Sync {
    fn name(&self) -> &str;
}

pub type SinkRef = Arc<dyn VideoSink>;

/// Native media track fed by a source. Must tolerate `remove_sink` after `dispose`.
pub trait MediaTrack: Send {
    fn id(&self) -> &TrackId;

    fn set_enabled(&mut self, enabled: bool);

    fn add_sink(&mut self, sink: SinkRef);

    fn remove_sink(&mut self, sink: &SinkRef);

    fn dispose(&mut self);
}

/// Releasable helper tied to one media track instance (capture thread helpers).
pub trait Closeable: Send {
    fn close(&mut self) -> Result<(), PublishError>;
}

/// Result of building a capturer.
pub struct CreatedCapturer {
    pub capturer: Box<dyn VideoCapturer>,
    /// Options actually in effect, e.g. with the resolved device id filled in
    pub options: CaptureOptions,
    /// Helper to release when the media track it belongs to goes away
    pub helper: Option<Box<dyn Closeable>>,
}

/// Capture construction collaborator.
pub trait CaptureFactory: Send {
    /// Fails with `NoCaptureDevice` when nothing can be opened.
    fn create_capturer(&mut self, options: &CaptureOptions) -> Result<CreatedCapturer, PublishError>;

    fn create_source(&mut self, is_screencast: bool) -> Result<Box<dyn VideoSource>, PublishError>;

    fn create_media_track(
        &mut self,
        source: &dyn VideoSource,
    ) -> Result<Box<dyn MediaTrack>, PublishError>;
}

/// Capturer, source and media track built together.
pub struct CapturePipeline {
    pub capturer: Box<dyn VideoCapturer>,
    pub source: Box<dyn VideoSource>,
    pub media_track: Box<dyn MediaTrack>,
}

/// Build a full pipeline through the factory.
///
/// Returns the pipeline, the effective options and the helper that must be
/// registered against the new media track.
pub fn build_pipeline(
    factory: &mut dyn CaptureFactory,
    options: &CaptureOptions,
    processor: Option<Box<dyn VideoProcessor>>,
) -> Result<(CapturePipeline, CaptureOptions, Option<Box<dyn Closeable>>), PublishError> {
    let CreatedCapturer {
        mut capturer,
        options: effective,
        mut helper,
    } = factory.create_capturer(options)?;

    let mut source = match factory.create_source(effective.is_screencast) {
        Ok(source) => source,
        Err(e) => {
            capturer.dispose();
            close_helper(helper.as_mut());
            return Err(e);
        }
    };
    source.set_processor(processor);

    let media_track = match factory.create_media_track(source.as_ref()) {
        Ok(track) => track,
        Err(e) => {
            capturer.dispose();
            source.dispose();
            close_helper(helper.as_mut());
            return Err(e);
        }
    };

    Ok((
        CapturePipeline {
            capturer,
            source,
            media_track,
        },
        effective,
        helper,
    ))
}

fn close_helper(helper: Option<&mut Box<dyn Closeable>>) {
    if let Some(helper) = helper {
        if let Err(e) = helper.close() {
            log::warn!("Failed to close capture helper after construction error: {}", e);
        }
    }
}
