use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use stride_core::{
    metrics, Config, ReplayProvider, RunEvent, RunRecord, RunSessionController, RunTracker,
};

use super::open_history;

#[derive(Args)]
pub struct ReplayArgs {
    /// JSON array of fixes: `[{"coords": {"latitude": .., "longitude": ..}, "timestamp": ms}]`
    file: PathBuf,
    /// Delay between replayed fixes (default: tracking.min_interval_ms)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    interval_ms: Option<u64>,
    /// Ticker period; every tick still counts as one second of run time
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: Option<u64>,
    /// Pause the run after this many fixes have been replayed
    #[arg(long)]
    pause_after: Option<usize>,
    /// How long to stay paused
    #[arg(long, default_value_t = 1000)]
    pause_ms: u64,
    /// Print the full record as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

pub fn run(args: ReplayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(tick_ms) = args.tick_ms {
        config.tracking.tick_interval_ms = tick_ms;
    }

    let mut provider = ReplayProvider::from_path(&args.file)?;
    if provider.is_empty() {
        return Err(format!("{} contains no fixes", args.file.display()).into());
    }
    if let Some(interval_ms) = args.interval_ms {
        provider = provider.with_interval(Duration::from_millis(interval_ms));
    }
    let store = open_history(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let record = runtime.block_on(record_run(provider, store, &config, &args))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_summary(&record);
    }
    Ok(())
}

async fn record_run(
    provider: ReplayProvider,
    store: stride_core::RunHistoryStore,
    config: &Config,
    args: &ReplayArgs,
) -> Result<RunRecord, Box<dyn std::error::Error>> {
    let mut replay = provider.status();
    let (controller, inputs) = RunSessionController::new(Box::new(provider), store, config);
    let (tracker, task) = RunTracker::spawn(controller, inputs);

    let started = tracker.start_run().await?;
    tracing::info!(event = %serde_json::to_string(&started)?, "replay started");

    if let Some(count) = args.pause_after {
        replay
            .wait_for(|s| s.emitted >= count || s.exhausted)
            .await?;
        if !replay.borrow().exhausted {
            let paused = tracker.pause_run().await?;
            tracing::info!(event = %serde_json::to_string(&paused)?, "replay paused");
            tokio::time::sleep(Duration::from_millis(args.pause_ms)).await;
            tracker.resume_run().await?;
        }
    }

    replay.wait_for(|s| s.exhausted).await?;
    let record = tracker.finish_run().await?;
    tracing::info!(
        event = %serde_json::to_string(&RunEvent::finished(&record))?,
        skipped = replay.borrow().skipped,
        "replay finished"
    );

    tracker.shutdown().await?;
    task.await?;
    Ok(record)
}

fn print_summary(record: &RunRecord) {
    println!("Run:       {}", record.id);
    println!("Distance:  {:.2} km", record.distance_meters / 1000.0);
    println!("Duration:  {}", metrics::format_duration(record.duration_seconds));
    println!("Pace:      {}/km", record.pace());
    println!(
        "Avg speed: {:.1} km/h",
        metrics::mps_to_kmh(record.average_speed_meters_per_second)
    );
    println!(
        "Max speed: {:.1} km/h",
        metrics::mps_to_kmh(record.max_speed_meters_per_second)
    );
    println!("Calories:  {} kcal", record.estimated_calories);
    println!("Samples:   {}", record.samples.len());
}
