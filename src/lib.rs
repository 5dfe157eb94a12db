//! Scanloop Library
//!
//! The background decoding loop of a live barcode scanner: a dedicated
//! worker repeatedly pulls the most recent camera frame, preprocesses
//! it, and attempts a decode with alternating polarity, until a
//! barcode is found or the owner cancels.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! frame source → latest-frame slot → decode loop → result handoff
//!                                        ↓
//!                             preprocess → decode
//! ```
//!
//! # Design Principles
//!
//! - **Freshest frame wins**: the slot holds one frame, last write
//!   wins; nothing is queued, so the loop never decodes stale images
//! - **Cooperative cancellation**: the owner cancels and joins before
//!   touching shared resources; no result is delivered after cancel
//! - **Best-effort attempts**: a frame without a barcode is not an
//!   error, the loop simply tries the next one, indefinitely
//! - **Opaque collaborators**: preprocessing and decoding sit behind
//!   trait seams with mock implementations for testing
//!
//! # Example
//!
//! ```
//! use std::sync::{mpsc, Arc};
//! use scanloop::{
//!     BarcodeFormat, DecodeResult, DecodeSession, Frame, FrameGeometry,
//!     FrameSlot, MockDecoder, Orientation, RotationFactory,
//! };
//!
//! let slot = Arc::new(FrameSlot::new());
//! let decoder = Arc::new(MockDecoder::succeeding_after(
//!     3,
//!     DecodeResult::new("https://example.com", BarcodeFormat::QrCode),
//! ));
//! let mut session = DecodeSession::new(
//!     Arc::clone(&slot),
//!     decoder,
//!     Arc::new(RotationFactory),
//! );
//!
//! // Start the loop, then publish frames the way a camera preview
//! // callback would.
//! let (tx, rx) = mpsc::channel();
//! session
//!     .start(
//!         FrameGeometry::new(16, 16, Orientation::Deg0),
//!         move |result| {
//!             let _ = tx.send(result);
//!         },
//!     )
//!     .unwrap();
//! slot.publish(Frame::new(vec![0; 256], 16, 16, Orientation::Deg0, 1));
//!
//! let result = rx.recv().unwrap();
//! assert_eq!(result.text(), "https://example.com");
//! session.cancel();
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod decode;
pub mod metrics;
pub mod preprocess;
pub mod session;

// Re-export commonly used types at crate root
pub use capture::{
    CaptureConfig, FileConfig, Frame, FrameGeometry, FrameSlot, MockFrameSource, Orientation,
    SessionConfig,
};
pub use decode::{BarcodeFormat, DecodeResult, Decoder, MockDecoder};
#[cfg(feature = "qr")]
pub use decode::QrDecoder;
pub use preprocess::{Preprocessor, PreprocessorFactory, ProcessedFrame, RotationFactory};
pub use session::{DecodeSession, SessionError, SessionStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
