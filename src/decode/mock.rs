//! Scripted decoder for tests and demonstration.

use super::{BarcodeFormat, DecodeResult, Decoder};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Mock decoder that succeeds after a scripted number of attempts.
///
/// Every call is recorded, including the inversion flag it was made
/// with, so tests can assert on the exact attempt sequence the decode
/// loop produced.
#[derive(Debug)]
pub struct MockDecoder {
    /// Attempt number on which to report a hit (0 = never).
    succeed_after: u64,
    result: DecodeResult,
    calls: AtomicU64,
    inverts: Mutex<Vec<bool>>,
}

impl MockDecoder {
    /// Creates a decoder reporting `result` on the `n`th attempt.
    ///
    /// `n == 0` means the decoder never succeeds.
    pub fn succeeding_after(n: u64, result: DecodeResult) -> Self {
        Self {
            succeed_after: n,
            result,
            calls: AtomicU64::new(0),
            inverts: Mutex::new(Vec::new()),
        }
    }

    /// Creates a decoder that never finds a barcode.
    pub fn never() -> Self {
        Self::succeeding_after(0, DecodeResult::new("", BarcodeFormat::QrCode))
    }

    /// Returns the number of decode calls made so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Acquire)
    }

    /// Returns the inversion flags of every call, in order.
    pub fn recorded_inverts(&self) -> Vec<bool> {
        self.inverts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Decoder for MockDecoder {
    fn decode(
        &self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
        invert: bool,
    ) -> Option<DecodeResult> {
        self.inverts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invert);
        let call = self.calls.fetch_add(1, Ordering::AcqRel) + 1;

        if self.succeed_after != 0 && call >= self.succeed_after {
            Some(self.result.clone())
        } else {
            None
        }
    }
}
