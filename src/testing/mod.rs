//! Testing utilities for crabcast
//!
//! In-memory senders, capturers, sources, media tracks and factories that
//! record what the publishing code does to them. Used by the crate's own
//! tests, by integration tests and by the CLI's replay command.

pub mod fakes;

pub use fakes::{
    CapturerProbe, CloseProbe, EventJournal, FakeCloseable, FakeFactory, FakeSender,
    MediaTrackProbe, RecordingSink, SourceProbe,
};
