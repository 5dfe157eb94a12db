//! Grayscale rotation preprocessor.
//!
//! Rotates the luma plane of a preview buffer so the decoder sees an
//! upright image, swapping dimensions for 90/270 degree orientations.
//! Chroma data trailing the luma plane (as in NV21 buffers) is ignored.

use super::{PreprocessError, Preprocessor, PreprocessorFactory, ProcessedFrame};
use crate::capture::{FrameGeometry, Orientation};

/// Rotates grayscale frames according to the session orientation.
#[derive(Debug)]
pub struct RotationPreprocessor {
    geometry: FrameGeometry,
}

impl RotationPreprocessor {
    /// Creates a preprocessor for the given geometry.
    pub fn new(geometry: FrameGeometry) -> Self {
        Self { geometry }
    }

    /// Returns the output dimensions after rotation.
    pub fn output_dimensions(&self) -> (u32, u32) {
        if self.geometry.orientation.swaps_dimensions() {
            (self.geometry.height, self.geometry.width)
        } else {
            (self.geometry.width, self.geometry.height)
        }
    }
}

impl Preprocessor for RotationPreprocessor {
    fn process(&mut self, pixels: &[u8]) -> ProcessedFrame {
        let w = self.geometry.width as usize;
        let h = self.geometry.height as usize;
        let (out_w, out_h) = self.output_dimensions();

        // Short buffers are padded with black rather than rejected; a
        // torn frame is just another frame that fails to decode.
        let luma = |x: usize, y: usize| pixels.get(y * w + x).copied().unwrap_or(0);

        let mut out = vec![0u8; w * h];
        match self.geometry.orientation {
            Orientation::Deg0 => {
                for y in 0..h {
                    for x in 0..w {
                        out[y * w + x] = luma(x, y);
                    }
                }
            }
            Orientation::Deg90 => {
                // (x, y) -> (h - 1 - y, x), row length h
                for y in 0..h {
                    for x in 0..w {
                        out[x * h + (h - 1 - y)] = luma(x, y);
                    }
                }
            }
            Orientation::Deg180 => {
                for y in 0..h {
                    for x in 0..w {
                        out[(h - 1 - y) * w + (w - 1 - x)] = luma(x, y);
                    }
                }
            }
            Orientation::Deg270 => {
                // (x, y) -> (y, w - 1 - x), row length h
                for y in 0..h {
                    for x in 0..w {
                        out[(w - 1 - x) * h + y] = luma(x, y);
                    }
                }
            }
        }

        ProcessedFrame {
            pixels: out,
            width: out_w,
            height: out_h,
        }
    }
}

/// Factory producing [`RotationPreprocessor`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct RotationFactory;

impl PreprocessorFactory for RotationFactory {
    fn create(&self, geometry: FrameGeometry) -> Result<Box<dyn Preprocessor>, PreprocessError> {
        if geometry.width == 0 || geometry.height == 0 {
            return Err(PreprocessError::InvalidGeometry {
                width: geometry.width,
                height: geometry.height,
            });
        }
        tracing::debug!(
            width = geometry.width,
            height = geometry.height,
            orientation = geometry.orientation.degrees(),
            "Created rotation preprocessor"
        );
        Ok(Box::new(RotationPreprocessor::new(geometry)))
    }
}
