//! QR decoding backed by the `rqrr` crate.

use super::{BarcodeFormat, DecodeResult, Decoder};

/// Decodes QR codes from grayscale buffers.
///
/// The inversion flag is honored by flipping luma values on the fly
/// while preparing the image, so inverted (light-on-dark) codes are
/// found on alternate attempts without a second pass per frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct QrDecoder;

impl QrDecoder {
    /// Creates a new QR decoder.
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for QrDecoder {
    fn decode(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
        invert: bool,
    ) -> Option<DecodeResult> {
        let w = width as usize;
        let h = height as usize;
        if w == 0 || h == 0 || pixels.len() < w * h {
            return None;
        }

        let mut image = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| {
            let luma = pixels[y * w + x];
            if invert {
                255 - luma
            } else {
                luma
            }
        });

        for grid in image.detect_grids() {
            match grid.decode() {
                Ok((_meta, content)) => {
                    return Some(DecodeResult::new(content, BarcodeFormat::QrCode));
                }
                Err(e) => {
                    tracing::trace!(error = %e, "Located grid failed to decode");
                }
            }
        }
        None
    }
}
