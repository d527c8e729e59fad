//! Property-based tests for publishing layer control
//!
//! Run with: cargo test --test layers_props

use crabcast::publish::{apply_qualities, max_enabled_quality, update_encodings, LayerUpdate};
use crabcast::testing::FakeSender;
use crabcast::types::{QualityRequest, VideoQuality};
use crabcast::webrtc::Encoding;
use proptest::prelude::*;

fn quality() -> impl Strategy<Value = VideoQuality> {
    prop_oneof![
        Just(VideoQuality::Off),
        Just(VideoQuality::Low),
        Just(VideoQuality::Medium),
        Just(VideoQuality::High),
    ]
}

fn requests() -> impl Strategy<Value = Vec<QualityRequest>> {
    prop::collection::vec(
        (quality(), any::<bool>()).prop_map(|(q, enabled)| QualityRequest::new(q, enabled)),
        0..6,
    )
}

fn simulcast_encodings() -> impl Strategy<Value = Vec<Encoding>> {
    prop::collection::vec(any::<bool>(), 3).prop_map(|flags| {
        ["q", "h", "f"]
            .iter()
            .zip(flags)
            .map(|(rid, active)| Encoding::simulcast(*rid, active))
            .collect()
    })
}

proptest! {
    /// INVARIANT: applying the same request twice writes at most once
    #[test]
    fn repeated_request_is_idempotent(
        encodings in simulcast_encodings(),
        request in requests(),
    ) {
        let sender = FakeSender::new("primary", encodings);
        let first = apply_qualities(&sender, &request);
        let flags = sender.active_flags();

        prop_assert_eq!(apply_qualities(&sender, &request), LayerUpdate::Unchanged);
        prop_assert_eq!(sender.active_flags(), flags);
        let expected_writes = usize::from(first == LayerUpdate::Written);
        prop_assert_eq!(sender.write_count(), expected_writes);
    }

    /// INVARIANT: the last request for a rid decides its encoding's state
    #[test]
    fn last_request_per_rid_wins(
        encodings in simulcast_encodings(),
        request in requests(),
    ) {
        let original = encodings.clone();
        let mut updated = encodings;
        update_encodings(&mut updated, &request);

        for (before, after) in original.iter().zip(&updated) {
            let rid = before.rid.as_deref();
            let last = request
                .iter()
                .rev()
                .find(|r| r.quality.rid() == rid);
            match last {
                Some(r) => prop_assert_eq!(after.active, r.enabled),
                None => prop_assert_eq!(after.active, before.active),
            }
        }
    }

    /// INVARIANT: requests for rids the sender does not expose change nothing
    #[test]
    fn absent_rid_is_noop(
        active in any::<bool>(),
        enabled in any::<bool>(),
    ) {
        let mut encodings = vec![
            Encoding::simulcast("h", active),
            Encoding::simulcast("f", active),
        ];
        let changed = update_encodings(
            &mut encodings,
            &[QualityRequest::new(VideoQuality::Low, enabled)],
        );
        prop_assert!(!changed);
        prop_assert!(encodings.iter().all(|e| e.active == active));
    }

    /// INVARIANT: an SVC encoding is active iff some quality above Off is enabled
    #[test]
    fn svc_active_tracks_max_enabled(
        initially in any::<bool>(),
        request in requests(),
    ) {
        let mut encodings = vec![Encoding::svc("L3T3_KEY", initially)];
        update_encodings(&mut encodings, &request);
        let expected = max_enabled_quality(&request) != VideoQuality::Off;
        prop_assert_eq!(encodings[0].active, expected);
    }
}
