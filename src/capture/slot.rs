//! Latest-frame slot shared between the frame source and the decode loop.

use super::Frame;
use std::sync::{Arc, Mutex, PoisonError};

/// Single-slot cell holding the most recent captured frame.
///
/// The frame source publishes into the slot from its delivery thread;
/// the decode loop reads from its worker thread. Writes are whole-value
/// replacements with last-write-wins semantics and no queueing, so the
/// loop always sees the freshest frame. The mutex is held only for the
/// pointer swap, never across frame processing.
#[derive(Debug, Default)]
pub struct FrameSlot {
    latest: Mutex<Option<Arc<Frame>>>,
}

impl FrameSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a frame, replacing any previous one.
    pub fn publish(&self, frame: Frame) {
        let frame = Arc::new(frame);
        let mut guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(frame);
    }

    /// Returns the most recent frame, if any has been published.
    ///
    /// The frame is not consumed; repeated calls return the same frame
    /// until the source overwrites it.
    pub fn latest(&self) -> Option<Arc<Frame>> {
        let guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        guard.clone()
    }

    /// Empties the slot.
    ///
    /// Called when a decode loop starts so that a stale frame from a
    /// previous preview is never decoded.
    pub fn clear(&self) {
        let mut guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Returns true if no frame is currently held.
    pub fn is_empty(&self) -> bool {
        let guard = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        guard.is_none()
    }
}
