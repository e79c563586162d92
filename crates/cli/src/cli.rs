use std::time::Duration;

use clap::Parser;

/// Drive a hierarchical timing wheel from the command line.
///
/// Schedules one-shot and periodic jobs that log when they fire, runs the
/// wheel for a while, then stops it and prints the counters.
#[derive(Parser, Debug)]
#[command(name = "tickwheel", version, about)]
pub struct CliArgs {
    /// Path to a wheel config TOML file (defaults to the one-second wheel)
    #[arg(long, env = "TICKWHEEL_CONFIG")]
    pub config: Option<String>,

    /// Tick interval override, e.g. 50ms or 1s
    #[arg(long, value_parser = parse_duration)]
    pub interval: Option<Duration>,

    /// Slot counts per level override, finest first, e.g. 20,60,60
    #[arg(long, value_delimiter = ',')]
    pub slots: Option<Vec<usize>>,

    /// Intake queue capacity override
    #[arg(long)]
    pub intake_capacity: Option<usize>,

    /// One-shot delay to schedule (repeatable)
    #[arg(long = "after", value_parser = parse_duration)]
    pub after: Vec<Duration>,

    /// Repeating period to schedule (repeatable)
    #[arg(long = "every", value_parser = parse_duration)]
    pub every: Vec<Duration>,

    /// How long to run before stopping the wheel
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub run_for: Duration,
}

/// Parse `250ms`, `3s`, `2m`, `1h` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (num, unit) = raw.split_at(split);
    let value: u64 = num
        .parse()
        .map_err(|_| format!("'{raw}' does not start with a number"))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => scaled(raw, value, 60),
        "h" => scaled(raw, value, 3600),
        other => Err(format!("unknown duration unit '{other}' (use ms, s, m or h)")),
    }
}

fn scaled(raw: &str, value: u64, secs_per_unit: u64) -> Result<Duration, String> {
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("'{raw}' is too large"))
}
