//! What a slot holds: a scheduled job, either ready to fire or still
//! carrying the coordinates it must cascade through.

use std::fmt;

/// Identifier assigned to a job when it is first placed in the wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// The callback side of a job.
pub enum Action {
    /// Runs once, then the job is dropped.
    Once(Box<dyn FnOnce() + Send + 'static>),
    /// Runs every `period_ticks` ticks until the wheel stops.
    Every {
        callback: Box<dyn FnMut() + Send + 'static>,
        period_ticks: u64,
    },
}

impl Action {
    pub fn once<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Action::Once(Box::new(f))
    }

    pub fn every<F>(period_ticks: u64, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        Action::Every {
            callback: Box::new(f),
            period_ticks: period_ticks.max(1),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Once(_) => f.write_str("Once"),
            Action::Every { period_ticks, .. } => f
                .debug_struct("Every")
                .field("period_ticks", period_ticks)
                .finish(),
        }
    }
}

/// A placed job.
#[derive(Debug)]
pub struct Job {
    pub id: TaskId,
    pub action: Action,
}

/// One slot occupant.
#[derive(Debug)]
pub enum Entry {
    /// Fires when the finest level reaches its slot.
    Ready(Job),
    /// Still has finer levels to traverse. The last element of `rest` is the
    /// slot index in the next finer level.
    Pending { rest: Vec<usize>, job: Job },
}

impl Entry {
    pub fn job(&self) -> &Job {
        match self {
            Entry::Ready(job) | Entry::Pending { job, .. } => job,
        }
    }

    /// Demote one level: consume the last coordinate and return the slot index
    /// in the finer level together with the entry to store there.
    ///
    /// A `Ready` entry has nowhere to go and is returned unchanged with `None`.
    pub fn demote(self) -> (Option<usize>, Entry) {
        match self {
            Entry::Ready(job) => (None, Entry::Ready(job)),
            Entry::Pending { mut rest, job } => {
                let idx = rest.pop();
                if rest.is_empty() {
                    (idx, Entry::Ready(job))
                } else {
                    (idx, Entry::Pending { rest, job })
                }
            }
        }
    }
}
