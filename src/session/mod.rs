//! The decode session: one background loop per open camera preview.
//!
//! A [`DecodeSession`] ties together the latest-frame slot, the
//! session-scoped preprocessor and the decoder, and runs the decode
//! loop on a dedicated worker thread until a barcode is found or the
//! owner cancels. Cancellation is cooperative and joining: `cancel`
//! returns only once the worker has fully exited, which is what makes
//! it safe to tear down shared resources afterwards.

mod decode_loop;
mod stats;

pub use decode_loop::{DecodeSession, SessionError};
pub use stats::SessionStats;
