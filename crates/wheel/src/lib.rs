//! Hierarchical (cascading) timing wheel for delayed and periodic callbacks.
//!
//! Jobs are placed in O(1) on the coarsest level they need and demoted one
//! level at a time as coarser cursors advance, so per-tick work does not
//! depend on how many jobs are pending. A single driver task owns all wheel
//! state; [`TimingWheel`] and [`WheelHandle`] reach it over channels.

mod driver;
pub mod entry;
pub mod handle;
pub mod level;
pub mod metrics;
pub mod placement;
pub mod ticks;
pub mod wheel;

pub use entry::{Action, Entry, Job, TaskId};
pub use handle::{TimingWheel, WheelHandle};
pub use level::Level;
pub use metrics::{MetricsSnapshot, WheelMetrics};
pub use placement::{coordinates, TickScale};
pub use ticks::{IntervalTicks, ManualTicker, ManualTicks, TickSource};
pub use tickwheel_core::{WheelConfig, WheelError};
pub use wheel::{TickReport, Wheel};
