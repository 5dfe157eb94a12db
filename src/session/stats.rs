//! Decode loop activity counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the decode worker, readable by the owner at any
/// time (e.g. for metrics export).
#[derive(Debug, Default)]
pub struct SessionStats {
    empty_polls: AtomicU64,
    attempts: AtomicU64,
    results: AtomicU64,
    panics_caught: AtomicU64,
}

impl SessionStats {
    /// Polls that found no frame in the slot.
    pub fn empty_polls(&self) -> u64 {
        self.empty_polls.load(Ordering::Relaxed)
    }

    /// Preprocess-and-decode attempts made.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Results delivered to the caller.
    pub fn results(&self) -> u64 {
        self.results.load(Ordering::Relaxed)
    }

    /// Panics caught inside preprocess/decode attempts.
    pub fn panics_caught(&self) -> u64 {
        self.panics_caught.load(Ordering::Relaxed)
    }

    pub(crate) fn record_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_result(&self) {
        self.results.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.panics_caught.fetch_add(1, Ordering::Relaxed);
    }
}
