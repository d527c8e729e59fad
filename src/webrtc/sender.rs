use crate::errors::PublishError;
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One transmit layer of an RTP sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Encoding {
    pub rid: Option<String>, // RTP stream id (q, h, f)
    pub active: bool,
    pub scalability_mode: Option<String>, // e.g. L3T3_KEY when the codec runs SVC
    pub max_bitrate_bps: Option<u32>,
    pub max_framerate: Option<u32>,
    pub scale_resolution_down_by: Option<f64>,
}

impl Encoding {
    /// Simulcast layer identified by its rid
    pub fn simulcast(rid: impl Into<String>, active: bool) -> Self {
        Self {
            rid: Some(rid.into()),
            active,
            ..Default::default()
        }
    }

    /// Single SVC encoding carrying a scalability mode
    pub fn svc(mode: impl Into<String>, active: bool) -> Self {
        Self {
            active,
            scalability_mode: Some(mode.into()),
            ..Default::default()
        }
    }
}

/// Parameter object exposed by a sender. Encodings are replaced as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RtpParameters {
    pub encodings: Vec<Encoding>,
}

impl RtpParameters {
    pub fn new(encodings: Vec<Encoding>) -> Self {
        Self { encodings }
    }

    /// Whether the first encoding carries SVC layer semantics
    pub fn is_svc(&self) -> bool {
        self.encodings
            .first()
            .is_some_and(|e| e.scalability_mode.is_some())
    }

    pub fn active_rids(&self) -> Vec<String> {
        self.encodings
            .iter()
            .filter(|e| e.active)
            .filter_map(|e| e.rid.clone())
            .collect()
    }
}

/// Media sender owned by the peer connection. The track only holds a shared
/// reference and never disposes it.
pub trait RtpSender: Send + Sync {
    fn id(&self) -> &str;

    fn parameters(&self) -> Result<RtpParameters, PublishError>;

    fn set_parameters(&self, parameters: RtpParameters) -> Result<(), PublishError>;

    /// Point the sender at another media track without renegotiating.
    fn replace_track(&self, track: Option<&TrackId>) -> Result<(), PublishError>;
}

pub type SenderRef = Arc<dyn RtpSender>;
