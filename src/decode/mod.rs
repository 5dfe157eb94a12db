//! Barcode decoding seam.
//!
//! The decoding algorithm itself is an external capability; this
//! module defines the trait the decode loop drives, the result type it
//! hands back, and decoder implementations: a scripted mock for tests
//! and demonstration, and an rqrr-backed QR decoder behind the `qr`
//! feature.

mod format;
mod mock;
#[cfg(feature = "qr")]
mod qr;

pub use format::BarcodeFormat;
pub use mock::MockDecoder;
#[cfg(feature = "qr")]
pub use qr::QrDecoder;

/// A successfully decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeResult {
    text: String,
    format: BarcodeFormat,
}

impl DecodeResult {
    /// Creates a new result.
    pub fn new(text: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }

    /// Returns the decoded text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the symbology the barcode was decoded as.
    pub fn format(&self) -> BarcodeFormat {
        self.format
    }
}

/// Trait for barcode decoders.
///
/// A decoder attempt is best-effort: `None` means "no barcode found in
/// this frame", which is indistinguishable from (and treated the same
/// as) any internal decoding failure.
pub trait Decoder: Send + Sync {
    /// Attempts to locate and decode a barcode in a grayscale buffer.
    ///
    /// When `invert` is set the buffer is interpreted with inverted
    /// polarity (light-on-dark instead of dark-on-light).
    fn decode(&self, pixels: &[u8], width: u32, height: u32, invert: bool)
        -> Option<DecodeResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_accessors() {
        let result = DecodeResult::new("hello", BarcodeFormat::QrCode);
        assert_eq!(result.text(), "hello");
        assert_eq!(result.format(), BarcodeFormat::QrCode);
    }
}
