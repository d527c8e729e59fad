//! In-memory collaborators
//!
//! Every fake built by one [`FakeFactory`] writes to a shared [`EventJournal`]
//! so tests can assert ordering across capturer, source, media track and
//! helper calls. Entries read `kind#instance`, e.g. `capturer.dispose#1`.

use crate::capture::{
    CameraControl, CaptureFactory, CaptureSizeNegotiation, Closeable, CreatedCapturer,
    MediaTrack, SinkRef, VideoCapturer, VideoProcessor, VideoSink, VideoSource,
};
use crate::errors::PublishError;
use crate::types::{CameraPosition, CaptureOptions, TrackId, VideoDimensions};
use crate::webrtc::sender::{Encoding, RtpParameters, RtpSender};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct EventJournal {
    entries: Arc<Mutex<Vec<(String, usize)>>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, kind: &str, instance: usize) {
        self.entries
            .lock()
            .expect("lock poisoned")
            .push((kind.to_string(), instance));
    }

    pub fn events(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("lock poisoned")
            .iter()
            .map(|(kind, instance)| format!("{kind}#{instance}"))
            .collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.entries
            .lock()
            .expect("lock poisoned")
            .iter()
            .filter(|(k, _)| k == kind)
            .count()
    }

    /// Position of the first `kind#instance` entry.
    pub fn position(&self, kind: &str, instance: usize) -> Option<usize> {
        self.entries
            .lock()
            .expect("lock poisoned")
            .iter()
            .position(|(k, i)| k == kind && *i == instance)
    }
}

// ---------------------------------------------------------------------------
// Sender

struct SenderState {
    parameters: RtpParameters,
    writes: usize,
    fail_reads: bool,
    fail_writes: bool,
    track: Option<TrackId>,
    replacements: usize,
}

/// Sender with counted parameter writes and injectable failures.
pub struct FakeSender {
    id: String,
    state: Mutex<SenderState>,
}

impl FakeSender {
    pub fn new(id: impl Into<String>, encodings: Vec<Encoding>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(SenderState {
                parameters: RtpParameters::new(encodings),
                writes: 0,
                fail_reads: false,
                fail_writes: false,
                track: None,
                replacements: 0,
            }),
        }
    }

    pub fn encodings(&self) -> Vec<Encoding> {
        self.state.lock().expect("lock poisoned").parameters.encodings.clone()
    }

    pub fn active_flags(&self) -> Vec<bool> {
        self.encodings().iter().map(|e| e.active).collect()
    }

    pub fn active_rids(&self) -> Vec<String> {
        self.state.lock().expect("lock poisoned").parameters.active_rids()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").writes
    }

    pub fn fail_reads(&self, fail: bool) {
        self.state.lock().expect("lock poisoned").fail_reads = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().expect("lock poisoned").fail_writes = fail;
    }

    pub fn track(&self) -> Option<TrackId> {
        self.state.lock().expect("lock poisoned").track.clone()
    }

    pub fn replace_count(&self) -> usize {
        self.state.lock().expect("lock poisoned").replacements
    }
}

impl RtpSender for FakeSender {
    fn id(&self) -> &str {
        &self.id
    }

    fn parameters(&self) -> Result<RtpParameters, PublishError> {
        let state = self.state.lock().expect("lock poisoned");
        if state.fail_reads {
            return Err(PublishError::Sender(format!("{}: parameters unavailable", self.id)));
        }
        Ok(state.parameters.clone())
    }

    fn set_parameters(&self, parameters: RtpParameters) -> Result<(), PublishError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if state.fail_writes {
            return Err(PublishError::Sender(format!("{}: parameters rejected", self.id)));
        }
        state.parameters = parameters;
        state.writes += 1;
        Ok(())
    }

    fn replace_track(&self, track: Option<&TrackId>) -> Result<(), PublishError> {
        let mut state = self.state.lock().expect("lock poisoned");
        state.track = track.cloned();
        state.replacements += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sinks and closeables

pub struct RecordingSink {
    name: String,
}

impl RecordingSink {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { name: name.into() })
    }
}

impl VideoSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Default)]
pub struct CloseProbe {
    closes: Arc<AtomicUsize>,
}

impl CloseProbe {
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct FakeCloseable {
    probe: CloseProbe,
    fail: bool,
    journal: Option<(EventJournal, usize)>,
}

impl FakeCloseable {
    pub fn new() -> (Self, CloseProbe) {
        let probe = CloseProbe::default();
        (
            Self {
                probe: probe.clone(),
                fail: false,
                journal: None,
            },
            probe,
        )
    }

    pub fn failing() -> (Self, CloseProbe) {
        let (mut closeable, probe) = Self::new();
        closeable.fail = true;
        (closeable, probe)
    }
}

impl Closeable for FakeCloseable {
    fn close(&mut self) -> Result<(), PublishError> {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
        if let Some((journal, instance)) = &self.journal {
            journal.record("helper.close", *instance);
        }
        if self.fail {
            return Err(PublishError::Close("helper refused to close".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Capture pipeline

/// Observable state of one fake capturer.
#[derive(Clone, Default)]
pub struct CapturerProbe {
    inner: Arc<Mutex<CapturerState>>,
}

#[derive(Default)]
struct CapturerState {
    started_with: Option<(u32, u32, u32)>,
    running: bool,
    disposes: usize,
    device_id: Option<String>,
}

impl CapturerProbe {
    pub fn is_running(&self) -> bool {
        self.inner.lock().expect("lock poisoned").running
    }

    pub fn started_with(&self) -> Option<(u32, u32, u32)> {
        self.inner.lock().expect("lock poisoned").started_with
    }

    pub fn dispose_count(&self) -> usize {
        self.inner.lock().expect("lock poisoned").disposes
    }

    pub fn device_id(&self) -> Option<String> {
        self.inner.lock().expect("lock poisoned").device_id.clone()
    }
}

struct FakeCapturer {
    instance: usize,
    journal: EventJournal,
    probe: CapturerProbe,
    devices: Option<Vec<(String, CameraPosition)>>,
    sizes: Option<Vec<VideoDimensions>>,
    fail_start: Arc<AtomicBool>,
}

impl VideoCapturer for FakeCapturer {
    fn start_capture(&mut self, width: u32, height: u32, fps: u32) -> Result<(), PublishError> {
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(PublishError::Capture("camera busy".to_string()));
        }
        self.journal.record("capturer.start", self.instance);
        let mut state = self.probe.inner.lock().expect("lock poisoned");
        state.started_with = Some((width, height, fps));
        state.running = true;
        Ok(())
    }

    fn stop_capture(&mut self) -> Result<(), PublishError> {
        self.journal.record("capturer.stop", self.instance);
        self.probe.inner.lock().expect("lock poisoned").running = false;
        Ok(())
    }

    fn dispose(&mut self) {
        self.journal.record("capturer.dispose", self.instance);
        self.probe.inner.lock().expect("lock poisoned").disposes += 1;
    }

    fn camera_control(&mut self) -> Option<&mut dyn CameraControl> {
        if self.devices.is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn size_negotiation(&self) -> Option<&dyn CaptureSizeNegotiation> {
        if self.sizes.is_some() {
            Some(self)
        } else {
            None
        }
    }
}

impl CameraControl for FakeCapturer {
    fn switch_camera(
        &mut self,
        device_id: Option<&str>,
        position: Option<CameraPosition>,
    ) -> Result<String, PublishError> {
        let devices = self.devices.as_deref().unwrap_or_default();
        let target = devices
            .iter()
            .find(|(id, pos)| match device_id {
                Some(wanted) => id == wanted,
                None => Some(*pos) == position,
            })
            .map(|(id, _)| id.clone())
            .ok_or_else(|| PublishError::NoCaptureDevice("no matching camera".to_string()))?;

        self.journal.record("capturer.switch", self.instance);
        self.probe.inner.lock().expect("lock poisoned").device_id = Some(target.clone());
        Ok(target)
    }
}

impl CaptureSizeNegotiation for FakeCapturer {
    fn find_capture_size(&self, requested: VideoDimensions) -> VideoDimensions {
        let sizes = self.sizes.as_deref().unwrap_or_default();
        sizes
            .iter()
            .copied()
            .min_by_key(|size| {
                size.width.abs_diff(requested.width) + size.height.abs_diff(requested.height)
            })
            .unwrap_or(requested)
    }
}

#[derive(Clone, Default)]
pub struct SourceProbe {
    disposes: Arc<AtomicUsize>,
    processor: Arc<Mutex<Option<String>>>,
}

impl SourceProbe {
    pub fn dispose_count(&self) -> usize {
        self.disposes.load(Ordering::SeqCst)
    }

    pub fn processor_name(&self) -> Option<String> {
        self.processor.lock().expect("lock poisoned").clone()
    }
}

struct FakeSource {
    instance: usize,
    journal: EventJournal,
    probe: SourceProbe,
}

impl VideoSource for FakeSource {
    fn set_processor(&mut self, processor: Option<Box<dyn VideoProcessor>>) {
        *self.probe.processor.lock().expect("lock poisoned") =
            processor.map(|p| p.name().to_string());
    }

    fn dispose(&mut self) {
        self.journal.record("source.dispose", self.instance);
        self.probe.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Observable state of one fake media track.
#[derive(Clone)]
pub struct MediaTrackProbe {
    id: TrackId,
    inner: Arc<Mutex<MediaTrackState>>,
}

struct MediaTrackState {
    sinks: Vec<SinkRef>,
    enabled: bool,
    disposed: bool,
}

impl MediaTrackProbe {
    pub fn id(&self) -> &TrackId {
        &self.id
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("lock poisoned")
            .sinks
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().expect("lock poisoned").enabled
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.lock().expect("lock poisoned").disposed
    }
}

struct FakeMediaTrack {
    instance: usize,
    journal: EventJournal,
    probe: MediaTrackProbe,
}

impl MediaTrack for FakeMediaTrack {
    fn id(&self) -> &TrackId {
        &self.probe.id
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.journal.record(
            if enabled { "media_track.enable" } else { "media_track.disable" },
            self.instance,
        );
        self.probe.inner.lock().expect("lock poisoned").enabled = enabled;
    }

    fn add_sink(&mut self, sink: SinkRef) {
        self.journal.record("media_track.add_sink", self.instance);
        self.probe.inner.lock().expect("lock poisoned").sinks.push(sink);
    }

    fn remove_sink(&mut self, sink: &SinkRef) {
        self.journal.record("media_track.remove_sink", self.instance);
        self.probe
            .inner
            .lock()
            .expect("lock poisoned")
            .sinks
            .retain(|s| !std::ptr::eq(Arc::as_ptr(s) as *const (), Arc::as_ptr(sink) as *const ()));
    }

    fn dispose(&mut self) {
        self.journal.record("media_track.dispose", self.instance);
        self.probe.inner.lock().expect("lock poisoned").disposed = true;
    }
}

// ---------------------------------------------------------------------------
// Factory

#[derive(Default)]
struct FactoryState {
    next_instance: usize,
    capturers: Vec<CapturerProbe>,
    sources: Vec<SourceProbe>,
    media_tracks: Vec<MediaTrackProbe>,
    helpers: Vec<CloseProbe>,
    devices: Option<Vec<(String, CameraPosition)>>,
    sizes: Option<Vec<VideoDimensions>>,
    fail_next_capturer: Option<PublishError>,
    fail_next_media_track: bool,
}

/// Capture factory producing fakes. Clones share state, so a test can keep
/// one clone for inspection after handing another to the track.
#[derive(Clone, Default)]
pub struct FakeFactory {
    journal: EventJournal,
    state: Arc<Mutex<FactoryState>>,
    no_device: Arc<AtomicBool>,
    fail_start: Arc<AtomicBool>,
}

impl FakeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capturers gain the camera-control capability over these devices.
    pub fn with_cameras(self, devices: Vec<(&str, CameraPosition)>) -> Self {
        self.state.lock().expect("lock poisoned").devices = Some(
            devices
                .into_iter()
                .map(|(id, pos)| (id.to_string(), pos))
                .collect(),
        );
        self
    }

    /// Capturers gain the size-negotiation capability over these sizes.
    pub fn with_capture_sizes(self, sizes: Vec<VideoDimensions>) -> Self {
        self.state.lock().expect("lock poisoned").sizes = Some(sizes);
        self
    }

    pub fn journal(&self) -> EventJournal {
        self.journal.clone()
    }

    pub fn set_no_device(&self, no_device: bool) {
        self.no_device.store(no_device, Ordering::SeqCst);
    }

    pub fn fail_next_capturer(&self, error: PublishError) {
        self.state.lock().expect("lock poisoned").fail_next_capturer = Some(error);
    }

    /// The next `start_capture` on any capturer from this factory fails.
    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_media_track(&self) {
        self.state.lock().expect("lock poisoned").fail_next_media_track = true;
    }

    pub fn capturers(&self) -> Vec<CapturerProbe> {
        self.state.lock().expect("lock poisoned").capturers.clone()
    }

    pub fn sources(&self) -> Vec<SourceProbe> {
        self.state.lock().expect("lock poisoned").sources.clone()
    }

    pub fn media_tracks(&self) -> Vec<MediaTrackProbe> {
        self.state.lock().expect("lock poisoned").media_tracks.clone()
    }

    pub fn helpers(&self) -> Vec<CloseProbe> {
        self.state.lock().expect("lock poisoned").helpers.clone()
    }
}

impl CaptureFactory for FakeFactory {
    fn create_capturer(&mut self, options: &CaptureOptions) -> Result<CreatedCapturer, PublishError> {
        if self.no_device.load(Ordering::SeqCst) {
            return Err(PublishError::NoCaptureDevice("no camera attached".to_string()));
        }
        let mut state = self.state.lock().expect("lock poisoned");
        if let Some(error) = state.fail_next_capturer.take() {
            return Err(error);
        }

        state.next_instance += 1;
        let instance = state.next_instance;
        self.journal.record("factory.create_capturer", instance);

        let mut effective = options.clone();
        if effective.device_id.is_none() {
            effective.device_id = state
                .devices
                .as_ref()
                .and_then(|devices| devices.first())
                .map(|(id, _)| id.clone())
                .or_else(|| Some("default".to_string()));
        }

        let probe = CapturerProbe::default();
        probe.inner.lock().expect("lock poisoned").device_id = effective.device_id.clone();
        state.capturers.push(probe.clone());

        let (mut helper, helper_probe) = FakeCloseable::new();
        helper.journal = Some((self.journal.clone(), instance));
        state.helpers.push(helper_probe);

        Ok(CreatedCapturer {
            capturer: Box::new(FakeCapturer {
                instance,
                journal: self.journal.clone(),
                probe,
                devices: state.devices.clone(),
                sizes: state.sizes.clone(),
                fail_start: self.fail_start.clone(),
            }),
            options: effective,
            helper: Some(Box::new(helper)),
        })
    }

    fn create_source(&mut self, _is_screencast: bool) -> Result<Box<dyn VideoSource>, PublishError> {
        let mut state = self.state.lock().expect("lock poisoned");
        let instance = state.next_instance;
        self.journal.record("factory.create_source", instance);
        let probe = SourceProbe::default();
        state.sources.push(probe.clone());
        Ok(Box::new(FakeSource {
            instance,
            journal: self.journal.clone(),
            probe,
        }))
    }

    fn create_media_track(
        &mut self,
        _source: &dyn VideoSource,
    ) -> Result<Box<dyn MediaTrack>, PublishError> {
        let mut state = self.state.lock().expect("lock poisoned");
        if std::mem::take(&mut state.fail_next_media_track) {
            return Err(PublishError::Construction("media track creation failed".to_string()));
        }
        let instance = state.next_instance;
        self.journal.record("factory.create_media_track", instance);
        let probe = MediaTrackProbe {
            id: TrackId::generate(),
            inner: Arc::new(Mutex::new(MediaTrackState {
                sinks: Vec::new(),
                enabled: true,
                disposed: false,
            })),
        };
        state.media_tracks.push(probe.clone());
        Ok(Box::new(FakeMediaTrack {
            instance,
            journal: self.journal.clone(),
            probe,
        }))
    }
}
