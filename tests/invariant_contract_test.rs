//! Contract tests: each publishing operation must exercise the invariants
//! it is responsible for.

use crabcast::invariant_ppt::{clear_invariant_log, contract_test};
use crabcast::publish::{apply_qualities, CodecNegotiator, ResourceCloser};
use crabcast::testing::{FakeCloseable, FakeSender};
use crabcast::types::{CodecUpdate, QualityRequest, TrackId, VideoCodec, VideoQuality};
use crabcast::webrtc::{Encoding, SenderRef};
use std::sync::Arc;

#[test]
fn contract_layer_controller() {
    clear_invariant_log();
    let sender = FakeSender::new("primary", vec![Encoding::simulcast("q", false)]);
    apply_qualities(&sender, &[QualityRequest::new(VideoQuality::Low, true)]);

    contract_test(
        "layer controller",
        &["Sender parameters are written only when an active flag changed"],
    );
}

#[test]
fn contract_codec_negotiator() {
    clear_invariant_log();
    let primary: SenderRef = Arc::new(FakeSender::new("primary", Vec::new()));
    let mut negotiator = CodecNegotiator::new();
    negotiator.set_active_codec(Some(VideoCodec::Vp8));
    negotiator.apply_codec_updates(
        Some(&primary),
        &[CodecUpdate::new(
            "h264",
            vec![QualityRequest::new(VideoQuality::Low, true)],
        )],
    );

    contract_test(
        "codec negotiator",
        &["The active codec is never reported as needing a new track"],
    );
}

#[test]
fn contract_resource_closer() {
    clear_invariant_log();
    let mut closer = ResourceCloser::new();
    let (closeable, probe) = FakeCloseable::failing();
    closer.register(TrackId::from("TR_a"), Box::new(closeable));

    let failures = closer.close_all();
    assert_eq!(failures.len(), 1);
    assert_eq!(probe.close_count(), 1);

    contract_test("resource closer", &["Resource table is empty after close_all"]);
}
