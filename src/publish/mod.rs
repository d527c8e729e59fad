//! Publishing control for a local video track
//!
//! - [`track`]: pipeline lifecycle, restart and dispose
//! - [`layers`]: quality requests to encoding `active` flags
//! - [`negotiator`]: codec subscriptions and alternate-codec tracks
//! - [`closer`]: per-media-track helper resources
//! - [`worker`]: single execution context for a track

pub mod closer;
pub mod layers;
pub mod negotiator;
pub mod track;
pub mod worker;

pub use closer::{CloseFailure, ResourceCloser};
pub use layers::{apply_qualities, max_enabled_quality, update_encodings, LayerUpdate};
pub use negotiator::{CodecNegotiator, SimulcastSlot, SimulcastTrackInfo};
pub use track::LocalVideoTrack;
pub use worker::{NegotiationEvent, TrackHandle, TrackSnapshot, TrackWorker};
