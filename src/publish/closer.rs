use crate::assert_invariant;
use crate::capture::Closeable;
use crate::errors::PublishError;
use crate::types::TrackId;
use std::collections::HashMap;

/// A close that failed during `close_all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFailure {
    pub owner: TrackId,
    pub error: PublishError,
}

/// Secondary resources keyed by the media track instance that owns them.
#[derive(Default)]
pub struct ResourceCloser {
    resources: HashMap<TrackId, Box<dyn Closeable>>,
}

impl ResourceCloser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `closeable` under `owner`. A closeable already registered for
    /// the same owner is superseded and closed here.
    pub fn register(&mut self, owner: TrackId, closeable: Box<dyn Closeable>) {
        if let Some(mut previous) = self.resources.insert(owner.clone(), closeable) {
            log::debug!("Closing superseded resource for {}", owner);
            if let Err(e) = previous.close() {
                log::warn!("Failed to close superseded resource for {}: {}", owner, e);
            }
        }
    }

    /// Remove and hand back the closeable for `owner`. The caller closes it.
    pub fn unregister(&mut self, owner: &TrackId) -> Option<Box<dyn Closeable>> {
        self.resources.remove(owner)
    }

    pub fn contains(&self, owner: &TrackId) -> bool {
        self.resources.contains_key(owner)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Close every remaining registration once. Failures are collected and
    /// do not stop the remaining closes.
    pub fn close_all(&mut self) -> Vec<CloseFailure> {
        let mut failures = Vec::new();
        for (owner, mut closeable) in self.resources.drain() {
            if let Err(error) = closeable.close() {
                log::warn!("Failed to close resource for {}: {}", owner, error);
                failures.push(CloseFailure { owner, error });
            }
        }

        assert_invariant!(
            self.resources.is_empty(),
            "Resource table is empty after close_all",
            "ResourceCloser::close_all"
        );
        failures
    }
}
