//! Public scheduling surface.

use std::sync::Arc;
use std::time::Duration;

use tickwheel_core::{WheelConfig, WheelError};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::driver::{Driver, Request};
use crate::entry::Action;
use crate::metrics::{MetricsSnapshot, WheelMetrics};
use crate::placement::TickScale;
use crate::ticks::{IntervalTicks, TickSource};
use crate::wheel::Wheel;

/// Cheap, cloneable way to schedule onto a running wheel.
///
/// Dropping every handle (including the one inside [`TimingWheel`]) does not
/// stop a started driver: jobs already scheduled still fire. Call
/// [`stop`](Self::stop) to discard them.
#[derive(Clone)]
pub struct WheelHandle {
    requests: mpsc::Sender<Request>,
    stop: Arc<watch::Sender<bool>>,
    scale: TickScale,
    levels: usize,
    metrics: WheelMetrics,
}

impl WheelHandle {
    fn ticks_for(&self, delay: Duration) -> Result<u64, WheelError> {
        if self.levels == 0 {
            return Err(WheelError::NoLevels);
        }
        if self.is_stopped() {
            return Err(WheelError::Stopped);
        }
        self.scale.ticks_for(delay)
    }

    /// Run `callback` once, `delay` from when the driver picks the request up.
    ///
    /// The delay is rounded down to whole ticks (at least one) and counted
    /// from the next tick, so the job fires within one interval of `delay`
    /// and may fire early by less than one interval when the request lands
    /// between ticks.
    ///
    /// Waits while the intake queue is full, until [`stop`](Self::stop) is
    /// called. Never runs `callback` inline.
    pub async fn after<F>(&self, delay: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnOnce() + Send + 'static,
    {
        let ticks = self.ticks_for(delay)?;
        self.send(Request {
            delay,
            ticks,
            action: Action::once(callback),
        })
        .await
    }

    /// Like [`after`](Self::after) but fails with `IntakeFull` instead of waiting.
    ///
    /// Safe to call from inside a wheel callback.
    pub fn try_after<F>(&self, delay: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnOnce() + Send + 'static,
    {
        let ticks = self.ticks_for(delay)?;
        self.requests
            .try_send(Request {
                delay,
                ticks,
                action: Action::once(callback),
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => WheelError::IntakeFull,
                mpsc::error::TrySendError::Closed(_) => WheelError::Stopped,
            })
    }

    /// Like [`after`](Self::after) for callers outside async code. Blocks the
    /// current thread while the intake queue is full, and unlike `after` does
    /// not wake up when the wheel is stopped during that wait.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_after<F>(&self, delay: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnOnce() + Send + 'static,
    {
        let ticks = self.ticks_for(delay)?;
        self.requests
            .blocking_send(Request {
                delay,
                ticks,
                action: Action::once(callback),
            })
            .map_err(|_| WheelError::Stopped)
    }

    /// Run `callback` every `period` until the wheel stops.
    ///
    /// Each firing is re-placed one period after the tick it ran on, so the
    /// schedule does not drift with callback run time. There is no way to
    /// cancel a single repeating job.
    pub async fn every<F>(&self, period: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnMut() + Send + 'static,
    {
        let ticks = self.ticks_for(period)?;
        self.send(Request {
            delay: period,
            ticks,
            action: Action::every(ticks, callback),
        })
        .await
    }

    async fn send(&self, request: Request) -> Result<(), WheelError> {
        tokio::select! {
            biased;

            _ = stop_requested(self.stop.subscribe()) => Err(WheelError::Stopped),
            sent = self.requests.send(request) => sent.map_err(|_| WheelError::Stopped),
        }
    }

    /// Ask the driver to stop. Idempotent and never blocks.
    pub fn stop(&self) {
        if !self.stop.send_replace(true) {
            info!("timing wheel stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    pub fn interval(&self) -> Duration {
        self.scale.interval()
    }

    /// Longest span the wheel can represent; delays must stay below it.
    pub fn horizon(&self) -> Duration {
        self.scale.horizon()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Resolves once the stop flag is raised.
async fn stop_requested(mut stop: watch::Receiver<bool>) {
    loop {
        let stopped = *stop.borrow_and_update();
        if stopped || stop.changed().await.is_err() {
            return;
        }
    }
}

/// A hierarchical timing wheel plus the task that drives it.
///
/// ```ignore
/// let mut wheel = TimingWheel::new(Duration::from_millis(50), 1000, &[20, 60, 60])?;
/// wheel.start()?;
/// wheel.after(Duration::from_secs(60), || println!("a minute later")).await?;
/// wheel.every(Duration::from_secs(1), || println!("tick")).await?;
/// wheel.stop();
/// ```
pub struct TimingWheel {
    handle: WheelHandle,
    driver: Option<Driver>,
    task: Option<JoinHandle<()>>,
}

impl TimingWheel {
    /// Create a wheel ticking every `interval` with one level per entry of
    /// `slot_counts` (finest first) and an intake queue of `intake_capacity`.
    pub fn new(
        interval: Duration,
        intake_capacity: usize,
        slot_counts: &[usize],
    ) -> Result<Self, WheelError> {
        if intake_capacity == 0 {
            return Err(WheelError::InvalidConfig("intake capacity must be > 0".into()));
        }
        let wheel = Wheel::new(interval, slot_counts)?;
        let scale = wheel.scale();
        let (req_tx, req_rx) = mpsc::channel(intake_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let metrics = WheelMetrics::new();

        let handle = WheelHandle {
            requests: req_tx,
            stop: Arc::new(stop_tx),
            scale,
            levels: slot_counts.len(),
            metrics: metrics.clone(),
        };
        let driver = Driver::new(wheel, req_rx, stop_rx, metrics);

        Ok(Self {
            handle,
            driver: Some(driver),
            task: None,
        })
    }

    pub fn from_config(config: &WheelConfig) -> Result<Self, WheelError> {
        config.validate()?;
        Self::new(config.interval(), config.intake_capacity, &config.slots)
    }

    /// One-second ticks over 60 seconds, 60 minutes and 24 hours.
    pub fn seconds() -> Result<Self, WheelError> {
        Self::from_config(&WheelConfig::seconds())
    }

    /// Spawn the driver on the current tokio runtime with wall-clock ticks.
    ///
    /// A wheel with no levels does nothing.
    pub fn start(&mut self) -> Result<(), WheelError> {
        if self.handle.levels == 0 {
            debug!("timing wheel has no levels, not starting");
            return Ok(());
        }
        Handle::try_current().map_err(|_| WheelError::NoRuntime)?;
        let ticks = IntervalTicks::new(self.handle.interval());
        self.start_with(ticks)
    }

    /// Spawn the driver with a custom tick source.
    pub fn start_with<T>(&mut self, ticks: T) -> Result<(), WheelError>
    where
        T: TickSource + 'static,
    {
        if self.handle.levels == 0 {
            debug!("timing wheel has no levels, not starting");
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|_| WheelError::NoRuntime)?;
        let driver = self.driver.take().ok_or(WheelError::AlreadyStarted)?;
        self.task = Some(runtime.spawn(driver.run(ticks)));
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// A cloneable handle for scheduling from other tasks or from callbacks.
    pub fn handle(&self) -> WheelHandle {
        self.handle.clone()
    }

    pub async fn after<F>(&self, delay: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.after(delay, callback).await
    }

    pub fn try_after<F>(&self, delay: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.try_after(delay, callback)
    }

    pub fn blocking_after<F>(&self, delay: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.blocking_after(delay, callback)
    }

    pub async fn every<F>(&self, period: Duration, callback: F) -> Result<(), WheelError>
    where
        F: FnMut() + Send + 'static,
    {
        self.handle.every(period, callback).await
    }

    pub fn stop(&self) {
        self.handle.stop();
    }

    /// Stop the driver and wait for its task to finish.
    pub async fn shutdown(&mut self) {
        self.handle.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "timing wheel task ended abnormally");
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.handle.interval()
    }

    pub fn horizon(&self) -> Duration {
        self.handle.horizon()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.handle.metrics()
    }
}
