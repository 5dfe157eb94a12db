//! Frame acquisition and the latest-frame slot.
//!
//! This module provides the frame types, the single-slot cell the
//! decode loop reads from, capture configuration, and a mock frame
//! source for tests and demonstration. Real frame delivery is the
//! platform camera stack's job; it only needs to call
//! [`FrameSlot::publish`] from its delivery callback.

mod config;
mod frame;
mod slot;
mod source;

pub use config::{CaptureConfig, ConfigError, FileConfig, OutputConfig, SessionConfig};
pub use frame::{Frame, FrameGeometry, InvalidOrientation, Orientation};
pub use slot::FrameSlot;
pub use source::{spawn_publisher, MockFrameSource};
