//! Codec negotiation state
//!
//! Tracks the active codec and one slot per alternate codec kind. Each round
//! of codec updates either adjusts layers on a sender that already exists or
//! reports which codecs still need a track before their layers can be driven.

use crate::assert_invariant;
use crate::errors::PublishError;
use crate::publish::layers::{apply_qualities, LayerUpdate};
use crate::types::{CodecUpdate, QualityRequest, VideoCodec};
use crate::webrtc::sender::{Encoding, SenderRef};

/// State of one alternate-codec slot.
#[derive(Clone, Default)]
pub enum SimulcastSlot {
    #[default]
    Unregistered,
    RegisteredNoSender {
        encodings: Vec<Encoding>,
    },
    RegisteredWithSender {
        encodings: Vec<Encoding>,
        sender: SenderRef,
    },
}

impl SimulcastSlot {
    pub fn is_registered(&self) -> bool {
        !matches!(self, SimulcastSlot::Unregistered)
    }

    pub fn sender(&self) -> Option<&SenderRef> {
        match self {
            SimulcastSlot::RegisteredWithSender { sender, .. } => Some(sender),
            _ => None,
        }
    }
}

impl std::fmt::Debug for SimulcastSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulcastSlot::Unregistered => write!(f, "Unregistered"),
            SimulcastSlot::RegisteredNoSender { encodings } => f
                .debug_struct("RegisteredNoSender")
                .field("encodings", &encodings.len())
                .finish(),
            SimulcastSlot::RegisteredWithSender { encodings, sender } => f
                .debug_struct("RegisteredWithSender")
                .field("encodings", &encodings.len())
                .field("sender", &sender.id())
                .finish(),
        }
    }
}

/// Snapshot of a registered alternate-codec track.
#[derive(Clone)]
pub struct SimulcastTrackInfo {
    pub codec: VideoCodec,
    pub sender: Option<SenderRef>,
    pub encodings: Vec<Encoding>,
}

impl SimulcastTrackInfo {
    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }
}

impl std::fmt::Debug for SimulcastTrackInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulcastTrackInfo")
            .field("codec", &self.codec)
            .field("sender", &self.sender.as_ref().map(|s| s.id().to_string()))
            .field("encodings", &self.encodings)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct CodecNegotiator {
    active_codec: Option<VideoCodec>,
    slots: [SimulcastSlot; VideoCodec::ALL.len()],
    subscribed: Vec<CodecUpdate>,
}

impl CodecNegotiator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_codec(&self) -> Option<VideoCodec> {
        self.active_codec
    }

    pub fn set_active_codec(&mut self, codec: Option<VideoCodec>) {
        self.active_codec = codec;
    }

    /// Latest full update list recorded by `apply_codec_updates`.
    pub fn subscribed_codecs(&self) -> &[CodecUpdate] {
        &self.subscribed
    }

    pub fn slot(&self, codec: VideoCodec) -> &SimulcastSlot {
        &self.slots[codec.index()]
    }

    pub fn simulcast_track(&self, codec: VideoCodec) -> Option<SimulcastTrackInfo> {
        match &self.slots[codec.index()] {
            SimulcastSlot::Unregistered => None,
            SimulcastSlot::RegisteredNoSender { encodings } => Some(SimulcastTrackInfo {
                codec,
                sender: None,
                encodings: encodings.clone(),
            }),
            SimulcastSlot::RegisteredWithSender { encodings, sender } => Some(SimulcastTrackInfo {
                codec,
                sender: Some(sender.clone()),
                encodings: encodings.clone(),
            }),
        }
    }

    /// Apply one negotiation round. Returns the codecs that need a new
    /// alternate track before their layers can be controlled.
    pub fn apply_codec_updates(
        &mut self,
        primary: Option<&SenderRef>,
        updates: &[CodecUpdate],
    ) -> Vec<VideoCodec> {
        log::debug!("Applying codec updates: {:?}", updates);

        if self.active_codec.is_none() {
            if let Some(first) = updates.first() {
                apply_to_primary(primary, &first.qualities);
                return Vec::new();
            }
        }

        self.subscribed = updates.to_vec();

        let mut new_codecs = Vec::new();
        for update in updates {
            let Some(codec) = VideoCodec::from_name(&update.codec) else {
                log::warn!("Unknown publishing codec {}, skipping", update.codec);
                continue;
            };

            if self.active_codec == Some(codec) {
                apply_to_primary(primary, &update.qualities);
                continue;
            }

            match &self.slots[codec.index()] {
                SimulcastSlot::RegisteredWithSender { sender, .. } => {
                    log::debug!("Setting publishing layers for simulcast codec {}", codec);
                    apply_qualities(sender.as_ref(), &update.qualities);
                }
                SimulcastSlot::Unregistered | SimulcastSlot::RegisteredNoSender { .. } => {
                    if update.any_enabled() && !new_codecs.contains(&codec) {
                        new_codecs.push(codec);
                    }
                }
            }
        }

        assert_invariant!(
            self.active_codec.map_or(true, |active| !new_codecs.contains(&active)),
            "The active codec is never reported as needing a new track",
            "CodecNegotiator::apply_codec_updates"
        );
        new_codecs
    }

    /// Register an alternate-codec track. Fails if the codec already has one.
    pub fn add_simulcast_track(
        &mut self,
        codec: VideoCodec,
        encodings: Vec<Encoding>,
    ) -> Result<SimulcastTrackInfo, PublishError> {
        let slot = &mut self.slots[codec.index()];
        if slot.is_registered() {
            return Err(PublishError::AlreadyExists(format!(
                "simulcast track for codec {codec}"
            )));
        }

        *slot = SimulcastSlot::RegisteredNoSender {
            encodings: encodings.clone(),
        };
        log::info!("Registered simulcast track for codec {}", codec);

        Ok(SimulcastTrackInfo {
            codec,
            sender: None,
            encodings,
        })
    }

    /// Attach the sender of a registered alternate-codec track. Returns the
    /// qualities recorded for that codec in the latest round, if any, so the
    /// caller can bring the new sender in line.
    pub fn bind_simulcast_sender(
        &mut self,
        codec: VideoCodec,
        sender: SenderRef,
    ) -> Result<Option<Vec<QualityRequest>>, PublishError> {
        let slot = &mut self.slots[codec.index()];
        let encodings = match std::mem::take(slot) {
            SimulcastSlot::Unregistered => {
                return Err(PublishError::Unsupported(format!(
                    "no simulcast track registered for codec {codec}"
                )))
            }
            SimulcastSlot::RegisteredNoSender { encodings }
            | SimulcastSlot::RegisteredWithSender { encodings, .. } => encodings,
        };
        *slot = SimulcastSlot::RegisteredWithSender { encodings, sender };

        Ok(self
            .subscribed
            .iter()
            .find(|u| VideoCodec::from_name(&u.codec) == Some(codec))
            .map(|u| u.qualities.clone()))
    }

    /// Drop every sender reference, keeping registrations.
    pub fn release_senders(&mut self) {
        for slot in self.slots.iter_mut() {
            if let SimulcastSlot::RegisteredWithSender { encodings, .. } = std::mem::take(slot) {
                *slot = SimulcastSlot::RegisteredNoSender { encodings };
            }
        }
    }
}

fn apply_to_primary(primary: Option<&SenderRef>, qualities: &[QualityRequest]) -> LayerUpdate {
    match primary {
        Some(sender) => apply_qualities(sender.as_ref(), qualities),
        None => {
            log::debug!("No primary sender bound, layer update skipped");
            LayerUpdate::Skipped
        }
    }
}
