//! Counters shared between the driver task and wheel handles.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::wheel::TickReport;

/// Point-in-time copy of [`WheelMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Jobs accepted into the wheel (repeating jobs count once).
    pub scheduled: u64,
    /// Callback executions, including repeats.
    pub fired: u64,
    /// Callback executions that panicked.
    pub panicked: u64,
    /// Ticks processed by the driver.
    pub ticks: u64,
    /// Jobs currently placed and waiting.
    pub pending: u64,
}

/// Lock-free wheel counters. Cloning shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct WheelMetrics {
    inner: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    scheduled: AtomicU64,
    fired: AtomicU64,
    panicked: AtomicU64,
    ticks: AtomicU64,
    pending: AtomicU64,
}

impl WheelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_scheduled(&self, pending: usize) {
        self.inner.scheduled.fetch_add(1, Ordering::Relaxed);
        self.inner.pending.store(pending as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_tick(&self, report: &TickReport, pending: usize) {
        let c = &self.inner;
        c.ticks.fetch_add(1, Ordering::Relaxed);
        c.fired.fetch_add(report.fired as u64, Ordering::Relaxed);
        c.panicked.fetch_add(report.panicked as u64, Ordering::Relaxed);
        c.pending.store(pending as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            scheduled: c.scheduled.load(Ordering::Relaxed),
            fired: c.fired.load(Ordering::Relaxed),
            panicked: c.panicked.load(Ordering::Relaxed),
            ticks: c.ticks.load(Ordering::Relaxed),
            pending: c.pending.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_counters() {
        let metrics = WheelMetrics::new();
        let view = metrics.clone();

        metrics.record_scheduled(1);
        metrics.record_scheduled(2);
        metrics.record_tick(
            &TickReport {
                fired: 2,
                demoted: 1,
                panicked: 1,
            },
            0,
        );

        let snap = view.snapshot();
        assert_eq!(snap.scheduled, 2);
        assert_eq!(snap.fired, 2);
        assert_eq!(snap.panicked, 1);
        assert_eq!(snap.ticks, 1);
        assert_eq!(snap.pending, 0);
    }
}
