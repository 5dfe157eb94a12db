//! Mock frame source for tests and demonstration.
//!
//! Real frame delivery belongs to the platform camera stack; this
//! module stands in for it by generating synthetic frames and
//! publishing them into a [`FrameSlot`] the way a preview callback
//! would.

use super::{CaptureConfig, Frame, FrameGeometry, FrameSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Generates synthetic frames with a deterministic pattern.
#[derive(Debug)]
pub struct MockFrameSource {
    config: CaptureConfig,
    sequence: u64,
}

impl MockFrameSource {
    /// Creates a source producing frames of the configured geometry.
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            sequence: 0,
        }
    }

    /// Returns the capture configuration.
    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Produces the next synthetic frame.
    pub fn next_frame(&mut self) -> Frame {
        // Pixel count in usize; the u32 product wraps for large
        // configured dimensions.
        let geometry = FrameGeometry::new(
            self.config.width,
            self.config.height,
            self.config.orientation,
        );
        let pixels: Vec<u8> = (0..geometry.pixel_count())
            // Deterministic pattern mixed with the sequence number,
            // enough to make consecutive frames distinguishable.
            .map(|i| ((i as u64 ^ self.sequence) % 256) as u8)
            .collect();

        self.sequence += 1;
        Frame::new(
            pixels,
            self.config.width,
            self.config.height,
            self.config.orientation,
            self.sequence,
        )
    }
}

/// Runs a mock source on a dedicated thread, publishing into `slot` at
/// the configured frame rate until `stop` is set.
///
/// Mirrors the shape of a camera preview callback: each delivery
/// overwrites the previous frame, nothing is queued.
pub fn spawn_publisher(
    mut source: MockFrameSource,
    slot: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    let fps = source.config().fps.max(1);
    let frame_duration = Duration::from_secs(1) / fps;

    thread::spawn(move || {
        tracing::debug!(fps, "Mock frame publisher started");
        while !stop.load(Ordering::Acquire) {
            let started = Instant::now();
            slot.publish(source.next_frame());

            // Keep the delivery rate steady by compensating for the
            // time spent generating the frame.
            let elapsed = started.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }
        tracing::debug!("Mock frame publisher stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_sequenced() {
        let mut source = MockFrameSource::new(CaptureConfig::with_dimensions(8, 8));

        let first = source.next_frame();
        let second = source.next_frame();

        assert_eq!(first.sequence(), 1);
        assert_eq!(second.sequence(), 2);
        assert!(first.is_valid());
        assert_ne!(first.pixels(), second.pixels());
    }

    #[test]
    fn test_frame_buffer_matches_pixel_count() {
        let mut source = MockFrameSource::new(CaptureConfig::with_dimensions(8, 8));
        let frame = source.next_frame();
        assert_eq!(frame.pixels().len(), frame.pixel_count());
    }

    #[test]
    fn test_publisher_fills_slot_and_stops() {
        let config = CaptureConfig {
            fps: 120,
            ..CaptureConfig::with_dimensions(8, 8)
        };
        let slot = Arc::new(FrameSlot::new());
        let stop = Arc::new(AtomicBool::new(false));

        let handle = spawn_publisher(
            MockFrameSource::new(config),
            Arc::clone(&slot),
            Arc::clone(&stop),
        );

        // Wait for at least one frame to arrive.
        let deadline = Instant::now() + Duration::from_secs(2);
        while slot.is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(!slot.is_empty());

        stop.store(true, Ordering::Release);
        handle.join().unwrap();
    }
}
