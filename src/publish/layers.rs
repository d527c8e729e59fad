//! Publishing layer control
//!
//! Turns a peer's per-quality requests into `active` flags on a sender's
//! encodings. SVC senders carry one encoding whose layers live inside the
//! bitstream, so only its on/off state is controlled. Simulcast senders carry
//! one encoding per rid and each request toggles the matching one.

use crate::assert_invariant;
use crate::types::{QualityRequest, VideoQuality};
use crate::webrtc::sender::{Encoding, RtpSender};

/// What a layer application did to the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerUpdate {
    /// At least one encoding changed and parameters were written back
    Written,
    /// Nothing changed, no write issued
    Unchanged,
    /// Reading or writing the sender failed; prior layer state stays in effect
    Skipped,
}

/// Highest enabled quality, `Off` when nothing is enabled.
pub fn max_enabled_quality(qualities: &[QualityRequest]) -> VideoQuality {
    qualities
        .iter()
        .filter(|q| q.enabled)
        .map(|q| q.quality)
        .max()
        .unwrap_or(VideoQuality::Off)
}

/// Apply `qualities` to `encodings` in place. Returns whether any `active`
/// flag differs from its state before the call. Later requests for the same
/// quality override earlier ones.
pub fn update_encodings(encodings: &mut [Encoding], qualities: &[QualityRequest]) -> bool {
    let Some(first) = encodings.first() else {
        return false;
    };
    let before: Vec<bool> = encodings.iter().map(|e| e.active).collect();

    if first.scalability_mode.is_some() {
        encodings[0].active = max_enabled_quality(qualities) != VideoQuality::Off;
    } else {
        // Legacy senders expose a single encoding without any rid
        let ridless_sole = encodings.len() == 1 && first.rid.is_none();
        for request in qualities {
            let Some(rid) = request.quality.rid() else {
                continue;
            };

            let index = encodings
                .iter()
                .position(|e| e.rid.as_deref() == Some(rid))
                .or_else(|| (ridless_sole && request.quality == VideoQuality::Low).then_some(0));

            let Some(index) = index else {
                log::debug!("No encoding for rid {}, ignoring {:?}", rid, request.quality);
                continue;
            };
            encodings[index].active = request.enabled;
        }
    }

    encodings.iter().map(|e| e.active).ne(before)
}

/// Best-effort layer application on `sender`. Never fails; sender errors are
/// logged and the update is skipped.
pub fn apply_qualities(sender: &dyn RtpSender, qualities: &[QualityRequest]) -> LayerUpdate {
    let mut parameters = match sender.parameters() {
        Ok(parameters) => parameters,
        Err(e) => {
            log::warn!("Failed to read parameters of sender {}: {}", sender.id(), e);
            return LayerUpdate::Skipped;
        }
    };

    let before: Vec<bool> = parameters.encodings.iter().map(|e| e.active).collect();
    let changed = update_encodings(&mut parameters.encodings, qualities);

    let after: Vec<bool> = parameters.encodings.iter().map(|e| e.active).collect();
    assert_invariant!(
        changed == (before != after),
        "Sender parameters are written only when an active flag changed",
        "publish::layers::apply_qualities"
    );

    if !changed {
        log::debug!("Layers of sender {} already match request", sender.id());
        return LayerUpdate::Unchanged;
    }

    match sender.set_parameters(parameters) {
        Ok(()) => {
            log::debug!("Updated publishing layers on sender {}", sender.id());
            LayerUpdate::Written
        }
        Err(e) => {
            log::warn!("Failed to write parameters of sender {}: {}", sender.id(), e);
            LayerUpdate::Skipped
        }
    }
}
