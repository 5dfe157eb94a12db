//! Metrics collection and registry.

use crate::session::DecodeSession;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// A snapshot of session state for metrics update.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    /// Whether a decode loop is currently running.
    pub session_running: bool,
    /// Preprocess-and-decode attempts made.
    pub decode_attempts: u64,
    /// Polls that found no frame in the slot.
    pub empty_polls: u64,
    /// Barcodes delivered to the caller.
    pub results_found: u64,
    /// Panics caught inside decode attempts.
    pub panics_caught: u64,
}

impl MetricsSnapshot {
    /// Captures the current state of a decode session.
    pub fn from_session(session: &DecodeSession) -> Self {
        let stats = session.stats();
        Self {
            session_running: session.is_running(),
            decode_attempts: stats.attempts(),
            empty_polls: stats.empty_polls(),
            results_found: stats.results(),
            panics_caught: stats.panics_caught(),
        }
    }
}

/// Prometheus metrics registry for scan monitoring.
pub struct MetricsRegistry {
    registry: Registry,

    session_running: IntGauge,
    decode_attempts_total: IntCounter,
    empty_polls_total: IntCounter,
    results_total: IntCounter,
    panics_caught_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let session_running = IntGauge::new(
            "scanloop_session_running",
            "Whether a decode loop is currently running (1=running, 0=idle)",
        )?;
        let decode_attempts_total = IntCounter::new(
            "scanloop_decode_attempts_total",
            "Total preprocess-and-decode attempts made",
        )?;
        let empty_polls_total = IntCounter::new(
            "scanloop_empty_polls_total",
            "Total polls that found no frame in the slot",
        )?;
        let results_total = IntCounter::new(
            "scanloop_results_total",
            "Total barcodes delivered to the caller",
        )?;
        let panics_caught_total = IntCounter::new(
            "scanloop_panics_caught_total",
            "Total panics caught inside decode attempts",
        )?;

        registry.register(Box::new(session_running.clone()))?;
        registry.register(Box::new(decode_attempts_total.clone()))?;
        registry.register(Box::new(empty_polls_total.clone()))?;
        registry.register(Box::new(results_total.clone()))?;
        registry.register(Box::new(panics_caught_total.clone()))?;

        Ok(Self {
            registry,
            session_running,
            decode_attempts_total,
            empty_polls_total,
            results_total,
            panics_caught_total,
        })
    }

    /// Updates all metrics from a snapshot of session state.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        self.session_running
            .set(if snapshot.session_running { 1 } else { 0 });

        // Counters advance by the delta against the snapshot.
        let current = self.decode_attempts_total.get();
        if snapshot.decode_attempts > current {
            self.decode_attempts_total
                .inc_by(snapshot.decode_attempts - current);
        }

        let current = self.empty_polls_total.get();
        if snapshot.empty_polls > current {
            self.empty_polls_total.inc_by(snapshot.empty_polls - current);
        }

        let current = self.results_total.get();
        if snapshot.results_found > current {
            self.results_total.inc_by(snapshot.results_found - current);
        }

        let current = self.panics_caught_total.get();
        if snapshot.panics_caught > current {
            self.panics_caught_total
                .inc_by(snapshot.panics_caught - current);
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
