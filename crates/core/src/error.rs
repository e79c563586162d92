use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by wheel construction, configuration and scheduling.
#[derive(Error, Debug)]
pub enum WheelError {
    #[error("invalid wheel config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The delay needs more ticks than the wheel can represent.
    #[error("delay {delay:?} exceeds the wheel horizon of {horizon:?}")]
    DelayOutOfRange { delay: Duration, horizon: Duration },

    #[error("intake queue is full")]
    IntakeFull,

    #[error("timing wheel is stopped")]
    Stopped,

    #[error("timing wheel has no levels")]
    NoLevels,

    #[error("timing wheel already started")]
    AlreadyStarted,

    #[error("no tokio runtime available to run the wheel")]
    NoRuntime,
}
