// Status command - summarize a history directory
use anyhow::Result;
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

use sizetrack::{Config, FileHistoryStore, HistoryStore};

#[derive(Args)]
#[command(
    about = "Show history store status",
    long_about = "Summarize the history directory: tracked buckets, record counts, current
aggregates, and peak observed sizes. Use --json for machine-readable output."
)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(cmd: StatusCommand, dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = dir {
        config.history_dir = dir;
    }

    let store = FileHistoryStore::open(&config.history_dir)?;
    let buckets = store.buckets()?;

    if cmd.json {
        let mut entries = Vec::with_capacity(buckets.len());
        for bucket in &buckets {
            let latest = store.latest(bucket)?;
            let peak = store.max_size(bucket)?;
            entries.push(json!({
                "bucket": bucket,
                "records": store.range(bucket, None, None)?.len(),
                "latest": latest,
                "peak": peak,
            }));
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "history_dir": config.history_dir.display().to_string(),
                "record_count": store.record_count(),
                "buckets": entries,
            }))?
        );
        return Ok(());
    }

    println!("History: {}", config.history_dir.display());
    if buckets.is_empty() {
        println!("  no records yet");
        return Ok(());
    }

    println!("  {} buckets, {} records", buckets.len(), store.record_count());
    for bucket in &buckets {
        let latest = store.latest(bucket)?;
        let peak = store.max_size(bucket)?;
        if let (Some(latest), Some(peak)) = (latest, peak) {
            println!(
                "  {:<40} {:>12} bytes  {:>6} objects  (peak {} bytes)",
                bucket, latest.size_bytes, latest.object_count, peak.size_bytes
            );
        }
    }

    Ok(())
}
