mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use tickwheel::TimingWheel;
use tickwheel_core::WheelConfig;

use crate::cli::CliArgs;

/// Config file (or defaults), then `TICKWHEEL_*` env vars, then CLI flags.
fn resolve_config(args: &CliArgs) -> Result<WheelConfig> {
    let mut config = match &args.config {
        Some(path) => WheelConfig::from_file(path)
            .with_context(|| format!("failed to load wheel config from '{path}'"))?,
        None => WheelConfig::seconds(),
    };
    config
        .apply_env_overrides()
        .context("invalid TICKWHEEL_* environment override")?;

    if let Some(interval) = args.interval {
        config.interval_ms = interval.as_millis() as u64;
    }
    if let Some(slots) = &args.slots {
        config.slots = slots.clone();
    }
    if let Some(capacity) = args.intake_capacity {
        config.intake_capacity = capacity;
    }
    config.validate().context("invalid wheel configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tickwheel_core::load_dotenv();
    let args = CliArgs::parse();
    let config = resolve_config(&args)?;
    config.log_summary();

    let mut wheel = TimingWheel::from_config(&config).context("failed to build timing wheel")?;
    wheel.start().context("failed to start timing wheel")?;
    info!(horizon = ?wheel.horizon(), "wheel running");

    for delay in args.after.iter().copied() {
        wheel
            .after(delay, move || info!(?delay, "one-shot job fired"))
            .await
            .with_context(|| format!("failed to schedule job after {delay:?}"))?;
    }
    for period in args.every.iter().copied() {
        let mut count = 0u64;
        wheel
            .every(period, move || {
                count += 1;
                info!(?period, count, "periodic job fired");
            })
            .await
            .with_context(|| format!("failed to schedule job every {period:?}"))?;
    }

    tokio::select! {
        _ = tokio::time::sleep(args.run_for) => {
            info!(run_for = ?args.run_for, "run time elapsed");
        }
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "failed to listen for ctrl_c");
            }
            info!("interrupted");
        }
    }

    wheel.shutdown().await;
    let m = wheel.metrics();
    info!(
        scheduled = m.scheduled,
        fired = m.fired,
        panicked = m.panicked,
        ticks = m.ticks,
        pending = m.pending,
        "wheel stopped"
    );
    Ok(())
}
