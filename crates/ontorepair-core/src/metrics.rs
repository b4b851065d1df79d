//! Process-wide loop counters.
//!
//! Incremented at the call site without logging; [`Metrics::flush`]
//! reports all of them in one `info!` event when a loop run ends.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

pub static METRICS: Metrics = Metrics::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    ChecksRun,
    RepairsRequested,
    ReasonerFailures,
    BackendRetries,
}

impl Counter {
    const ALL: [Counter; 4] = [
        Counter::ChecksRun,
        Counter::RepairsRequested,
        Counter::ReasonerFailures,
        Counter::BackendRetries,
    ];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Point-in-time copy of every counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub checks_run: u64,
    pub repairs_requested: u64,
    pub reasoner_failures: u64,
    pub backend_retries: u64,
}

pub struct Metrics {
    slots: [AtomicU64; 4],
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            slots: [
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ],
        }
    }

    pub fn inc(&self, counter: Counter) {
        self.slots[counter.slot()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, counter: Counter) -> u64 {
        self.slots[counter.slot()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            checks_run: self.get(Counter::ChecksRun),
            repairs_requested: self.get(Counter::RepairsRequested),
            reasoner_failures: self.get(Counter::ReasonerFailures),
            backend_retries: self.get(Counter::BackendRetries),
        }
    }

    pub fn flush(&self) {
        let s = self.snapshot();
        tracing::info!(
            event = "metrics.flush",
            checks_run = s.checks_run,
            repairs_requested = s.repairs_requested,
            reasoner_failures = s.reasoner_failures,
            backend_retries = s.backend_retries,
        );
    }

    pub fn reset(&self) {
        for counter in Counter::ALL {
            self.slots[counter.slot()].store(0, Ordering::Relaxed);
        }
    }
}
