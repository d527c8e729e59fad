//! crabcast: simulcast and SVC publishing control for local video tracks
//!
//! This crate manages the publishing side of a locally captured video track
//! in a real-time session: which encoding layers a sender transmits, which
//! codecs it publishes, and how the capture pipeline is torn down and rebuilt
//! when capture options change.
//!
//! # Features
//! - Per-quality layer control for simulcast and SVC senders
//! - Codec negotiation with alternate-codec simulcast tracks
//! - Track restart that preserves sinks and re-points the bound sender
//! - Keyed cleanup of helper resources tied to each media track
//! - A per-track tokio worker serializing all operations
//!
//! # Usage
//! ```rust,ignore
//! use crabcast::publish::{LocalVideoTrack, TrackWorker};
//! use crabcast::types::CaptureOptions;
//!
//! let track = LocalVideoTrack::create("camera", factory, CaptureOptions::default(), None)?;
//! let (handle, _task) = TrackWorker::spawn(track, 32);
//! handle.start_capture().await?;
//! ```
pub mod capture;
pub mod config;
pub mod errors;
pub mod invariant_ppt;
pub mod publish;
pub mod testing;
pub mod types;
pub mod webrtc;

// Re-exports for convenience
pub use config::CrabcastConfig;
pub use errors::{PublishError, PublishErrorKind};
pub use publish::{
    CodecNegotiator, LayerUpdate, LocalVideoTrack, NegotiationEvent, ResourceCloser, TrackHandle,
    TrackWorker,
};
pub use types::{
    CameraPosition, CaptureOptions, CodecUpdate, QualityRequest, TrackId, VideoCodec,
    VideoDimensions, VideoQuality,
};
pub use webrtc::{compute_video_encodings, Encoding, RtpParameters, RtpSender, SenderRef};

/// Initialize logging for the publishing system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabcast=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        codecs: VideoCodec::ALL.iter().map(|c| c.name().to_string()).collect(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    /// Codec names the negotiator recognizes
    pub codecs: Vec<String>,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabcast");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
        assert_eq!(info.codecs, vec!["vp8", "h264", "vp9", "av1", "h265"]);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        assert!(std::env::var("RUST_LOG").is_ok());
    }
}
