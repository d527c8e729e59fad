use crate::types::{VideoCodec, VideoDimensions};
use crate::webrtc::sender::Encoding;
use serde::{Deserialize, Serialize};

/// Simulcast configuration for multiple video layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulcastConfig {
    pub enabled: bool,
    /// Scalability mode used instead of simulcast for SVC-capable codecs
    pub scalability_mode: Option<String>,
    pub layers: Vec<SimulcastLayer>,
}

impl Default for SimulcastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scalability_mode: Some("L3T3_KEY".to_string()),
            layers: vec![
                SimulcastLayer {
                    rid: "f".to_string(), // Full resolution
                    width: 1280,
                    height: 720,
                    bitrate: 2_000_000,
                    fps: 30,
                },
                SimulcastLayer {
                    rid: "h".to_string(), // Half resolution
                    width: 640,
                    height: 360,
                    bitrate: 500_000,
                    fps: 15,
                },
                SimulcastLayer {
                    rid: "q".to_string(), // Quarter resolution
                    width: 320,
                    height: 180,
                    bitrate: 150_000,
                    fps: 10,
                },
            ],
        }
    }
}

/// Individual simulcast layer preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulcastLayer {
    pub rid: String,  // RTP stream id (f, h, q)
    pub width: u32,   // Layer width
    pub height: u32,  // Layer height
    pub bitrate: u32, // Layer bitrate in bps
    pub fps: u32,     // Layer frame rate
}

impl SimulcastLayer {
    fn longest_side(&self) -> u32 {
        self.width.max(self.height)
    }

    fn to_encoding(&self, source: VideoDimensions) -> Encoding {
        let scale = source.longest_side() as f64 / self.longest_side().max(1) as f64;
        Encoding {
            rid: Some(self.rid.clone()),
            active: true,
            scalability_mode: None,
            max_bitrate_bps: Some(self.bitrate),
            max_framerate: Some(self.fps),
            scale_resolution_down_by: Some(scale.max(1.0)),
        }
    }
}

/// Build the initial encoding set for a freshly published track.
///
/// SVC-capable codecs get one encoding carrying the configured scalability
/// mode. Everything else gets simulcast layers ordered low to high, limited to
/// layers that do not exceed the source size. With simulcast disabled a single
/// rid-less encoding is produced.
pub fn compute_video_encodings(
    codec: VideoCodec,
    source: VideoDimensions,
    config: &SimulcastConfig,
) -> Vec<Encoding> {
    let mut layers: Vec<&SimulcastLayer> = config.layers.iter().collect();
    layers.sort_by_key(|layer| layer.longest_side());

    let fitting: Vec<&SimulcastLayer> = layers
        .iter()
        .copied()
        .filter(|layer| layer.longest_side() <= source.longest_side())
        .collect();
    let fitting = if fitting.is_empty() {
        layers.into_iter().take(1).collect()
    } else {
        fitting
    };

    let top = fitting.last().copied();

    if codec.supports_svc() {
        if let Some(mode) = &config.scalability_mode {
            log::debug!("Using SVC mode {} for {}", mode, codec);
            return vec![Encoding {
                max_bitrate_bps: top.map(|l| l.bitrate),
                max_framerate: top.map(|l| l.fps),
                ..Encoding::svc(mode.clone(), true)
            }];
        }
    }

    if !config.enabled {
        return vec![Encoding {
            active: true,
            max_bitrate_bps: top.map(|l| l.bitrate),
            max_framerate: top.map(|l| l.fps),
            ..Default::default()
        }];
    }

    fitting
        .into_iter()
        .map(|layer| layer.to_encoding(source))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layers_use_shared_rids() {
        let config = SimulcastConfig::default();
        let rids: Vec<&str> = config.layers.iter().map(|l| l.rid.as_str()).collect();
        assert_eq!(rids, vec!["f", "h", "q"]);
    }

    #[test]
    fn test_simulcast_encodings_ordered_low_to_high() {
        let encodings = compute_video_encodings(
            VideoCodec::Vp8,
            VideoDimensions::new(1280, 720),
            &SimulcastConfig::default(),
        );
        let rids: Vec<_> = encodings.iter().map(|e| e.rid.clone().unwrap()).collect();
        assert_eq!(rids, vec!["q", "h", "f"]);
        assert!(encodings.iter().all(|e| e.active));
        assert_eq!(encodings[0].scale_resolution_down_by, Some(4.0));
        assert_eq!(encodings[2].scale_resolution_down_by, Some(1.0));
    }

    #[test]
    fn test_small_source_drops_large_layers() {
        let encodings = compute_video_encodings(
            VideoCodec::H264,
            VideoDimensions::new(640, 480),
            &SimulcastConfig::default(),
        );
        let rids: Vec<_> = encodings.iter().map(|e| e.rid.clone().unwrap()).collect();
        assert_eq!(rids, vec!["q", "h"]);
    }

    #[test]
    fn test_tiny_source_keeps_smallest_layer() {
        let encodings = compute_video_encodings(
            VideoCodec::H264,
            VideoDimensions::new(160, 90),
            &SimulcastConfig::default(),
        );
        assert_eq!(encodings.len(), 1);
        assert_eq!(encodings[0].rid.as_deref(), Some("q"));
    }

    #[test]
    fn test_svc_codec_gets_single_encoding() {
        let encodings = compute_video_encodings(
            VideoCodec::Vp9,
            VideoDimensions::new(1920, 1080),
            &SimulcastConfig::default(),
        );
        assert_eq!(encodings.len(), 1);
        assert_eq!(encodings[0].scalability_mode.as_deref(), Some("L3T3_KEY"));
        assert_eq!(encodings[0].max_bitrate_bps, Some(2_000_000));
    }

    #[test]
    fn test_simulcast_disabled_gives_single_ridless_encoding() {
        let config = SimulcastConfig {
            enabled: false,
            ..SimulcastConfig::default()
        };
        let encodings = compute_video_encodings(VideoCodec::Vp8, VideoDimensions::new(1280, 720), &config);
        assert_eq!(encodings.len(), 1);
        assert!(encodings[0].rid.is_none());
        assert!(encodings[0].scalability_mode.is_none());
    }
}
