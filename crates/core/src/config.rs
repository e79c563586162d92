use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WheelError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Read a profiled key: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_opt<F>(lookup: &F, profile: &str, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = lookup(&prefixed).filter(|s| !s.is_empty()) {
            return Some(v);
        }
    }
    lookup(key).filter(|s| !s.is_empty())
}

fn parse_slots(raw: &str) -> Result<Vec<usize>, WheelError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>().map_err(|_| {
                WheelError::InvalidConfig(format!("slot count '{s}' is not a number"))
            })
        })
        .collect()
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, WheelError> {
    raw.trim()
        .parse()
        .map_err(|_| WheelError::InvalidConfig(format!("{key}='{raw}' is not a number")))
}

/// Timing wheel configuration, typically parsed from TOML or the environment.
///
/// ```toml
/// interval_ms = 50
/// intake_capacity = 1000
/// slots = [20, 60, 60]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelConfig {
    /// Tick interval in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Capacity of the intake queue for not-yet-placed requests.
    #[serde(default = "default_intake_capacity")]
    pub intake_capacity: usize,
    /// Slot count per level, finest first.
    #[serde(default = "default_slots")]
    pub slots: Vec<usize>,
}

fn default_interval_ms() -> u64 { 1000 }
fn default_intake_capacity() -> usize { 1000 }
fn default_slots() -> Vec<usize> { vec![60, 60, 24] }

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            intake_capacity: default_intake_capacity(),
            slots: default_slots(),
        }
    }
}

impl WheelConfig {
    /// One-second ticks over seconds, minutes and hours (horizon just under 24h).
    pub fn seconds() -> Self {
        Self::default()
    }

    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, WheelError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WheelError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from environment variables (call `load_dotenv()` first).
    ///
    /// Profile is read from `TICKWHEEL_PROFILE`. When set (e.g. `PROD`), every
    /// key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, WheelError> {
        let profile = env::var("TICKWHEEL_PROFILE").unwrap_or_default().to_uppercase();
        let mut config = Self::default();
        config.apply_overrides(&profile, &|k: &str| env::var(k).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TICKWHEEL_*` environment overrides on top of this config.
    pub fn apply_env_overrides(&mut self) -> Result<(), WheelError> {
        let profile = env::var("TICKWHEEL_PROFILE").unwrap_or_default().to_uppercase();
        self.apply_overrides(&profile, &|k: &str| env::var(k).ok())?;
        self.validate()
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, profile: &str, lookup: &F) -> Result<(), WheelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let p = profile.to_uppercase();
        if let Some(v) = profiled_opt(lookup, &p, "TICKWHEEL_INTERVAL_MS") {
            self.interval_ms = parse_num("TICKWHEEL_INTERVAL_MS", &v)?;
        }
        if let Some(v) = profiled_opt(lookup, &p, "TICKWHEEL_INTAKE_CAPACITY") {
            self.intake_capacity = parse_num("TICKWHEEL_INTAKE_CAPACITY", &v)?;
        }
        if let Some(v) = profiled_opt(lookup, &p, "TICKWHEEL_SLOTS") {
            self.slots = parse_slots(&v)?;
        }
        Ok(())
    }

    /// Validate interval, capacity and slot counts.
    pub fn validate(&self) -> Result<(), WheelError> {
        if self.interval_ms == 0 {
            return Err(WheelError::InvalidConfig("interval_ms must be > 0".into()));
        }
        if self.intake_capacity == 0 {
            return Err(WheelError::InvalidConfig("intake_capacity must be > 0".into()));
        }
        if let Some(pos) = self.slots.iter().position(|&n| n == 0) {
            return Err(WheelError::InvalidConfig(format!(
                "level {pos} has zero slots"
            )));
        }
        if self.horizon_ticks().is_none() {
            return Err(WheelError::InvalidConfig(format!(
                "slot counts {:?} overflow the tick counter",
                self.slots
            )));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Number of ticks the wheel can represent (product of slot counts).
    pub fn horizon_ticks(&self) -> Option<u64> {
        self.slots
            .iter()
            .try_fold(1u64, |acc, &n| acc.checked_mul(n as u64))
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!(
            interval_ms = self.interval_ms,
            intake_capacity = self.intake_capacity,
            slots = ?self.slots,
            "wheel config loaded"
        );
    }
}
