use chrono::Utc;
use clap::Subcommand;
use stride_core::{metrics, stats, Config};

use super::open_history;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded runs, oldest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one run as JSON
    Show {
        /// Run ID
        id: String,
    },
    /// Delete one run
    Delete {
        /// Run ID
        id: String,
    },
    /// Totals over recent runs
    Stats {
        /// Window in days
        #[arg(long, default_value_t = stats::DEFAULT_WINDOW_DAYS)]
        days: i64,
        /// Include every run regardless of date
        #[arg(long, conflicts_with = "days")]
        all: bool,
    },
    /// Export a run's track as GeoJSON
    Export {
        /// Run ID
        id: String,
    },
    /// Delete every run
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = open_history(&config)?;

    match action {
        HistoryAction::List { json } => {
            let records = store.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No runs recorded.");
            } else {
                for r in &records {
                    println!(
                        "{}  {}  {:>7.2} km  {:>8}  {}/km",
                        r.id,
                        r.start_time.format("%Y-%m-%d %H:%M"),
                        r.distance_meters / 1000.0,
                        metrics::format_duration(r.duration_seconds),
                        r.pace(),
                    );
                }
            }
        }
        HistoryAction::Show { id } => {
            let record = store.get(&id)?.ok_or_else(|| format!("run not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        HistoryAction::Delete { id } => {
            store.delete(&id)?;
            println!("deleted {id}");
        }
        HistoryAction::Stats { days, all } => {
            let records = store.load()?;
            let summary = if all {
                stats::summarize(&records, None)
            } else {
                stats::last_days(&records, days, Utc::now())
            };
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        HistoryAction::Export { id } => {
            let record = store.get(&id)?.ok_or_else(|| format!("run not found: {id}"))?;
            let feature = record
                .to_geojson()
                .ok_or_else(|| format!("run {id} has no recorded track"))?;
            println!("{}", serde_json::to_string_pretty(&feature)?);
        }
        HistoryAction::Clear => {
            store.clear()?;
            println!("history cleared");
        }
    }
    Ok(())
}
