//! Tick sources: where the driver's "one interval elapsed" signal comes from.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Produces one signal per wheel interval.
#[async_trait]
pub trait TickSource: Send {
    /// Wait for the next tick. Returns `false` once the source is exhausted,
    /// which ends the driver loop.
    async fn next_tick(&mut self) -> bool;
}

/// Wall-clock ticks from a tokio interval.
///
/// The first tick lands one full interval after creation. Missed ticks are
/// delivered in a burst so the wheel stays aligned with its start time.
pub struct IntervalTicks {
    interval: Interval,
}

impl IntervalTicks {
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
        Self { interval }
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    async fn next_tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Ticks delivered by hand through a [`ManualTicker`].
pub struct ManualTicks {
    rx: mpsc::UnboundedReceiver<()>,
}

/// Sending half of [`ManualTicks`].
#[derive(Clone)]
pub struct ManualTicker {
    tx: mpsc::UnboundedSender<()>,
}

impl ManualTicks {
    pub fn channel() -> (ManualTicker, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ManualTicker { tx }, Self { rx })
    }
}

impl ManualTicker {
    /// Queue one tick. Returns false if the wheel is gone.
    pub fn tick(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Queue `n` ticks.
    pub fn advance(&self, n: u64) -> bool {
        (0..n).all(|_| self.tick())
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    async fn next_tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn interval_ticks_skip_the_immediate_tick() {
        let start = Instant::now();
        let mut ticks = IntervalTicks::new(Duration::from_secs(1));
        assert!(ticks.next_tick().await);
        let first = start.elapsed();
        assert!(first >= Duration::from_secs(1) && first < Duration::from_millis(1_010), "{first:?}");
        assert!(ticks.next_tick().await);
        let second = start.elapsed();
        assert!(second >= Duration::from_secs(2) && second < Duration::from_millis(2_010), "{second:?}");
    }

    #[tokio::test]
    async fn manual_ticks_end_when_ticker_dropped() {
        let (ticker, mut ticks) = ManualTicks::channel();
        assert!(ticker.advance(2));
        drop(ticker);
        assert!(ticks.next_tick().await);
        assert!(ticks.next_tick().await);
        assert!(!ticks.next_tick().await);
    }
}
