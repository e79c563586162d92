//! The control loop that owns the wheel.
//!
//! One tokio task holds the [`Wheel`] exclusively. Handles talk to it only
//! through channels, so the wheel itself needs no locking:
//! - a `watch` channel carries the stop flag,
//! - a bounded `mpsc` channel carries scheduling requests (backpressure),
//! - a [`TickSource`] drives the cascade.
//!
//! Callbacks run inline on this task. A slow callback delays every job due
//! after it, and the ticks behind it are processed late in a burst.
//!
//! The select is biased toward the intake queue over ticks. Producers that
//! keep the queue non-empty hold tick processing back until they pause, and
//! the missed ticks then run back to back.
//!
//! Only a stop request or an exhausted tick source ends the loop. Once every
//! handle is gone the driver keeps ticking until the placed jobs have fired.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::entry::Action;
use crate::metrics::WheelMetrics;
use crate::ticks::TickSource;
use crate::wheel::Wheel;

/// A scheduling request waiting in the intake queue.
pub(crate) struct Request {
    pub delay: Duration,
    pub ticks: u64,
    pub action: Action,
}

pub(crate) struct Driver {
    wheel: Wheel,
    requests: mpsc::Receiver<Request>,
    stop: watch::Receiver<bool>,
    metrics: WheelMetrics,
}

impl Driver {
    pub(crate) fn new(
        wheel: Wheel,
        requests: mpsc::Receiver<Request>,
        stop: watch::Receiver<bool>,
        metrics: WheelMetrics,
    ) -> Self {
        Self {
            wheel,
            requests,
            stop,
            metrics,
        }
    }

    /// Run until stopped or the tick source ends.
    ///
    /// Requests still queued at that point are dropped along with every job
    /// already placed in the wheel.
    pub(crate) async fn run<T: TickSource>(mut self, mut ticks: T) {
        let scale = self.wheel.scale();
        info!(
            interval = ?scale.interval(),
            horizon = ?scale.horizon(),
            levels = self.wheel.levels().len(),
            "timing wheel started"
        );

        let mut intake_open = true;
        let mut stop_open = true;
        loop {
            if *self.stop.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                changed = self.stop.changed(), if stop_open => {
                    if changed.is_err() {
                        debug!(pending = self.wheel.len(), "all wheel handles dropped");
                        stop_open = false;
                    }
                }
                request = self.requests.recv(), if intake_open => {
                    match request {
                        Some(request) => self.register(request),
                        None => intake_open = false,
                    }
                }
                alive = ticks.next_tick() => {
                    if !alive {
                        info!("tick source exhausted");
                        break;
                    }
                    let report = self.wheel.tick();
                    self.metrics.record_tick(&report, self.wheel.len());
                    if report.fired > 0 || report.demoted > 0 {
                        debug!(
                            fired = report.fired,
                            demoted = report.demoted,
                            panicked = report.panicked,
                            cursors = ?self.wheel.cursors(),
                            "tick processed"
                        );
                    }
                }
            }
        }

        let dropped = self.requests.len();
        info!(
            pending = self.wheel.len(),
            dropped_requests = dropped,
            "timing wheel stopped"
        );
    }

    fn register(&mut self, request: Request) {
        let Request {
            delay,
            ticks,
            action,
        } = request;
        match self.wheel.insert(ticks, action) {
            Ok(id) => {
                debug!(task = %id, ?delay, ticks, "job scheduled");
                self.metrics.record_scheduled(self.wheel.len());
            }
            Err(e) => warn!(?delay, ticks, error = %e, "job rejected"),
        }
    }
}
