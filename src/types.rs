//! Shared value types: quality requests, codec updates, codec kinds and
//! capture options.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Requested video quality. Ordering is total with `Off` as the bottom value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VideoQuality {
    Off,
    Low,
    Medium,
    High,
}

impl VideoQuality {
    /// Row identifier shared with the remote peer for this quality.
    pub const fn rid(&self) -> Option<&'static str> {
        match self {
            Self::Low => Some("q"),
            Self::Medium => Some("h"),
            Self::High => Some("f"),
            Self::Off => None,
        }
    }

    pub fn from_rid(rid: &str) -> Option<Self> {
        match rid {
            "q" => Some(Self::Low),
            "h" => Some(Self::Medium),
            "f" => Some(Self::High),
            _ => None,
        }
    }
}

/// One layer state requested by the negotiation peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityRequest {
    pub quality: VideoQuality,
    pub enabled: bool,
}

impl QualityRequest {
    pub const fn new(quality: VideoQuality, enabled: bool) -> Self {
        Self { quality, enabled }
    }
}

/// Full desired layer state of one codec for a negotiation round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecUpdate {
    pub codec: String,
    pub qualities: Vec<QualityRequest>,
}

impl CodecUpdate {
    pub fn new(codec: impl Into<String>, qualities: Vec<QualityRequest>) -> Self {
        Self {
            codec: codec.into(),
            qualities,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.qualities.iter().any(|q| q.enabled)
    }
}

/// Codec kinds a track can publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    Vp8,
    H264,
    Vp9,
    Av1,
    H265,
}

impl VideoCodec {
    pub const ALL: [VideoCodec; 5] = [
        VideoCodec::Vp8,
        VideoCodec::H264,
        VideoCodec::Vp9,
        VideoCodec::Av1,
        VideoCodec::H265,
    ];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Vp8 => "vp8",
            Self::H264 => "h264",
            Self::Vp9 => "vp9",
            Self::Av1 => "av1",
            Self::H265 => "h265",
        }
    }

    /// Stable slot index into per-codec tables.
    pub const fn index(&self) -> usize {
        match self {
            Self::Vp8 => 0,
            Self::H264 => 1,
            Self::Vp9 => 2,
            Self::Av1 => 3,
            Self::H265 => 4,
        }
    }

    pub const fn supports_svc(&self) -> bool {
        matches!(self, Self::Vp9 | Self::Av1)
    }

    /// Case-insensitive lookup; unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|codec| codec.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VideoCodec {
    type Err = crate::errors::PublishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
            .ok_or_else(|| crate::errors::PublishError::Unsupported(format!("unknown codec: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDimensions {
    pub width: u32,
    pub height: u32,
}

impl VideoDimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraPosition {
    Front,
    Back,
}

/// Parameters the capturer is asked to produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureParameters {
    pub width: u32,
    pub height: u32,
    pub max_fps: u32,
}

impl Default for CaptureParameters {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            max_fps: 30,
        }
    }
}

/// Options the capture-construction collaborator builds a capturer from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CaptureOptions {
    pub device_id: Option<String>,
    pub position: Option<CameraPosition>,
    pub capture_params: CaptureParameters,
    #[serde(default)]
    pub is_screencast: bool,
}

impl CaptureOptions {
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    pub fn with_position(mut self, position: CameraPosition) -> Self {
        self.position = Some(position);
        self
    }

    pub fn requested_dimensions(&self) -> VideoDimensions {
        VideoDimensions::new(self.capture_params.width, self.capture_params.height)
    }
}

/// Opaque identity of a media track instance, used as a resource owner key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("TR_{}", uuid::Uuid::new_v4().simple()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
