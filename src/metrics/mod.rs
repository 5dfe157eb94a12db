//! Prometheus metrics exporter for decode loop monitoring.
//!
//! This module provides observability into scan sessions by exposing
//! metrics in Prometheus format, optionally via an HTTP endpoint
//! (behind the `metrics` feature).
//!
//! # Metrics Exposed
//!
//! - `scanloop_session_running` - Whether a decode loop is running (1/0)
//! - `scanloop_decode_attempts_total` - Preprocess-and-decode attempts
//! - `scanloop_empty_polls_total` - Polls that found no frame
//! - `scanloop_results_total` - Barcodes delivered to the caller
//! - `scanloop_panics_caught_total` - Panics caught inside attempts

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
