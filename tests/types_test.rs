use crabcast::errors::PublishErrorKind;
use crabcast::types::*;

#[test]
fn test_codec_name_parsing_is_case_insensitive() {
    assert_eq!("VP8".parse::<VideoCodec>().unwrap(), VideoCodec::Vp8);
    assert_eq!("Av1".parse::<VideoCodec>().unwrap(), VideoCodec::Av1);
    assert_eq!(VideoCodec::from_name("h265"), Some(VideoCodec::H265));

    let err = "theora".parse::<VideoCodec>().unwrap_err();
    assert_eq!(err.kind(), PublishErrorKind::Unsupported);
}

#[test]
fn test_svc_support() {
    let svc: Vec<_> = VideoCodec::ALL
        .iter()
        .filter(|c| c.supports_svc())
        .copied()
        .collect();
    assert_eq!(svc, vec![VideoCodec::Vp9, VideoCodec::Av1]);
}

#[test]
fn test_codec_update_json() {
    let json = r#"{"codec":"h264","qualities":[{"quality":"LOW","enabled":true},{"quality":"HIGH","enabled":false}]}"#;
    let update: CodecUpdate = serde_json::from_str(json).unwrap();
    assert_eq!(update.codec, "h264");
    assert_eq!(update.qualities.len(), 2);
    assert!(update.any_enabled());

    let silent = CodecUpdate::new("vp9", vec![QualityRequest::new(VideoQuality::High, false)]);
    assert!(!silent.any_enabled());
}

#[test]
fn test_rid_round_trip_for_layered_qualities() {
    for quality in [VideoQuality::Low, VideoQuality::Medium, VideoQuality::High] {
        let rid = quality.rid().unwrap();
        assert_eq!(VideoQuality::from_rid(rid), Some(quality));
    }
    assert_eq!(VideoQuality::Off.rid(), None);
}

#[test]
fn test_capture_options_defaults() {
    let options = CaptureOptions::default();
    assert_eq!(options.requested_dimensions(), VideoDimensions::new(1280, 720));
    assert_eq!(options.capture_params.max_fps, 30);
    assert!(options.device_id.is_none());
    assert!(!options.is_screencast);

    let back = options.with_device("cam-2").with_position(CameraPosition::Back);
    assert_eq!(back.device_id.as_deref(), Some("cam-2"));
    assert_eq!(back.position, Some(CameraPosition::Back));
}

#[test]
fn test_generated_track_ids_are_unique() {
    let a = TrackId::generate();
    let b = TrackId::generate();
    assert_ne!(a, b);
    assert!(a.as_str().starts_with("TR_"));
    assert_eq!(TrackId::from("TR_fixed").to_string(), "TR_fixed");
}
