//! Frame normalization ahead of decoding.
//!
//! The preprocessor brings a raw preview buffer into the form the
//! decoder expects. It is a session-scoped resource: created lazily on
//! the first decode attempt from the preview's fixed geometry, reused
//! for every frame of the session, and destroyed (dropped) only after
//! the decode loop has been joined.

mod rotate;

pub use rotate::{RotationFactory, RotationPreprocessor};

use crate::capture::FrameGeometry;
use thiserror::Error;

/// Errors that can occur while creating a preprocessor.
#[derive(Debug, Clone, Error)]
pub enum PreprocessError {
    #[error("invalid frame geometry: {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },
}

/// Output of one preprocessing pass.
///
/// Output dimensions may differ from the input geometry, e.g. when the
/// frame is rotated upright.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Normalized grayscale buffer.
    pub pixels: Vec<u8>,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// A session-scoped frame normalizer.
///
/// Implementations may keep per-session scratch state; the decode loop
/// owns the handle while running and never shares it between threads.
pub trait Preprocessor: Send {
    /// Normalizes one raw frame buffer.
    fn process(&mut self, pixels: &[u8]) -> ProcessedFrame;
}

/// Creates preprocessors for a preview's fixed geometry.
pub trait PreprocessorFactory: Send + Sync {
    /// Builds a preprocessor for the given geometry.
    fn create(&self, geometry: FrameGeometry) -> Result<Box<dyn Preprocessor>, PreprocessError>;
}
