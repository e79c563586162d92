//! The multi-level wheel: owns every level, places jobs and runs the
//! per-tick cascade.
//!
//! Levels live in one contiguous arena, finest first. Each tick advances the
//! finest cursor; a wrap advances the next coarser level first, whose matured
//! slot is demoted one level down before the finer level looks at its own
//! slot. A job therefore reaches the finest level no later than the tick it is
//! due and fires there.

#[cfg(test)]
mod tests;

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use tickwheel_core::WheelError;
use tracing::{error, trace, warn};

use crate::entry::{Action, Entry, Job, TaskId};
use crate::level::Level;
use crate::placement::{coordinates, TickScale};

/// What a single tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Callbacks run on the finest level.
    pub fired: usize,
    /// Entries moved from a coarser level to a finer one.
    pub demoted: usize,
    /// Callbacks that panicked (counted in `fired` too).
    pub panicked: usize,
}

/// Hierarchical timing wheel state. Not thread-safe by itself; the driver
/// gives it a single owner.
#[derive(Debug)]
pub struct Wheel {
    levels: Vec<Level>,
    scale: TickScale,
    next_id: u64,
    pending: usize,
}

impl Wheel {
    /// Build a wheel with the given tick interval and per-level slot counts,
    /// finest first. An empty `slot_counts` gives a zero-level wheel.
    pub fn new(interval: Duration, slot_counts: &[usize]) -> Result<Self, WheelError> {
        if interval.is_zero() {
            return Err(WheelError::InvalidConfig("tick interval must be > 0".into()));
        }
        if let Some(pos) = slot_counts.iter().position(|&n| n == 0) {
            return Err(WheelError::InvalidConfig(format!("level {pos} has zero slots")));
        }
        let horizon_ticks = slot_counts
            .iter()
            .try_fold(1u64, |acc, &n| acc.checked_mul(n as u64))
            .ok_or_else(|| {
                WheelError::InvalidConfig(format!(
                    "slot counts {slot_counts:?} overflow the tick counter"
                ))
            })?;

        let last = slot_counts.len().saturating_sub(1);
        let levels = slot_counts
            .iter()
            .enumerate()
            .map(|(i, &n)| Level::new(i, n, last))
            .collect();

        Ok(Self {
            levels,
            scale: TickScale::new(interval, horizon_ticks),
            next_id: 0,
            pending: 0,
        })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn scale(&self) -> TickScale {
        self.scale
    }

    /// Cursor of each level, finest first.
    pub fn cursors(&self) -> Vec<usize> {
        self.levels.iter().map(Level::cursor).collect()
    }

    /// Jobs placed but not yet fired (a repeating job counts once).
    pub fn len(&self) -> usize {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.pending == 0
    }

    /// Place a job `ticks` ticks from now.
    ///
    /// Zero ticks is treated as one: the slot under the cursor has already
    /// been processed this tick.
    pub fn insert(&mut self, ticks: u64, action: Action) -> Result<TaskId, WheelError> {
        if self.levels.is_empty() {
            return Err(WheelError::NoLevels);
        }
        let ticks = ticks.max(1);
        if ticks >= self.scale.horizon_ticks() {
            return Err(WheelError::DelayOutOfRange {
                delay: self.scale.duration_of(ticks),
                horizon: self.scale.horizon(),
            });
        }

        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.place(Job { id, action }, ticks);
        self.pending += 1;
        Ok(id)
    }

    fn place(&mut self, job: Job, ticks: u64) {
        let mut coords = coordinates(&self.levels, ticks);
        let n = coords.len() - 1;
        let slot = coords[n];
        trace!(task = %job.id, ticks, level = n, slot, "placing job");
        if n == 0 {
            self.levels[0].push(slot, Entry::Ready(job));
        } else {
            coords.truncate(n);
            self.levels[n].push(slot, Entry::Pending { rest: coords, job });
        }
    }

    /// Advance the wheel by one tick, cascading and firing whatever is due.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if !self.levels.is_empty() {
            self.advance(0, &mut report);
        }
        report
    }

    fn advance(&mut self, index: usize, report: &mut TickReport) {
        if self.levels[index].advance() {
            if let Some(coarser) = self.levels[index].coarser() {
                self.advance(coarser, report);
            }
        }

        let due = self.levels[index].take_current();
        if due.is_empty() {
            return;
        }

        match self.levels[index].finer() {
            None => {
                for entry in due {
                    let job = match entry {
                        Entry::Ready(job) => job,
                        Entry::Pending { rest, job } => {
                            warn!(task = %job.id, ?rest, "pending entry reached the finest level");
                            job
                        }
                    };
                    self.run(job, report);
                }
            }
            Some(finer) => {
                for entry in due {
                    match entry.demote() {
                        (Some(slot), entry) => {
                            trace!(task = %entry.job().id, from = index, slot, "demoting job");
                            self.levels[finer].push(slot, entry);
                            report.demoted += 1;
                        }
                        (None, Entry::Ready(job)) => {
                            warn!(task = %job.id, level = index, "ready entry on a coarse level");
                            self.run(job, report);
                        }
                        (None, Entry::Pending { job, .. }) => {
                            warn!(task = %job.id, level = index, "pending entry without coordinates");
                            self.run(job, report);
                        }
                    }
                }
            }
        }
    }

    fn run(&mut self, job: Job, report: &mut TickReport) {
        let Job { id, action } = job;
        report.fired += 1;
        match action {
            Action::Once(callback) => {
                self.pending -= 1;
                if !invoke(id, callback) {
                    report.panicked += 1;
                }
            }
            Action::Every {
                mut callback,
                period_ticks,
            } => {
                if !invoke(id, || callback()) {
                    report.panicked += 1;
                }
                let ticks = period_ticks.clamp(1, self.scale.horizon_ticks().saturating_sub(1).max(1));
                self.place(
                    Job {
                        id,
                        action: Action::Every {
                            callback,
                            period_ticks,
                        },
                    },
                    ticks,
                );
            }
        }
    }
}

/// Run a callback, keeping a panic from unwinding into the wheel.
fn invoke<F: FnOnce()>(id: TaskId, callback: F) -> bool {
    trace!(task = %id, "firing job");
    match panic::catch_unwind(AssertUnwindSafe(callback)) {
        Ok(()) => true,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string());
            error!(task = %id, panic = %msg, "callback panicked");
            false
        }
    }
}
