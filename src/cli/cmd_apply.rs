// Apply command - replay an event stream into the history store
use anyhow::{Context, Result};
use clap::{Args, ValueHint};
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use sizetrack::{ApplyStatus, Config, FileHistoryStore, ObjectChangeEvent, SizeAggregator};

#[derive(Args)]
#[command(
    about = "Apply object-change events from a JSONL stream",
    long_about = "Read object-change notification envelopes (one JSON object per line) from a
file or stdin and apply them to the history store directly, without going
through the HTTP server.

Useful for replaying a notification backlog or seeding a history directory
for inspection. Duplicate delivery ids are recognized and skipped exactly as
the server would skip them; lines that fail to parse are reported and do not
stop the run."
)]
pub struct ApplyCommand {
    /// Input file (defaults to stdin)
    #[arg(value_hint = ValueHint::FilePath)]
    pub file: Option<PathBuf>,
}

pub fn run(cmd: ApplyCommand, dir: Option<PathBuf>, quiet: bool) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = dir {
        config.history_dir = dir;
    }

    let history = Arc::new(FileHistoryStore::open(&config.history_dir)?);
    let aggregator = SizeAggregator::new(history);

    let reader: Box<dyn BufRead> = match &cmd.file {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut recorded = 0usize;
    let mut duplicates = 0usize;
    let mut flagged = 0usize;
    let mut failed = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let event: ObjectChangeEvent = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                log::warn!("line {}: malformed envelope: {}", lineno + 1, e);
                failed += 1;
                continue;
            }
        };

        match aggregator.apply(&event) {
            Ok(applied) => match applied.status {
                ApplyStatus::Duplicate => duplicates += 1,
                ApplyStatus::Recorded => recorded += 1,
                ApplyStatus::RemovalUnresolved | ApplyStatus::Clamped => {
                    recorded += 1;
                    flagged += 1;
                }
            },
            Err(e) => {
                log::warn!("line {}: {}", lineno + 1, e);
                failed += 1;
            }
        }
    }

    if !quiet {
        eprintln!(
            "applied {} events ({} duplicates, {} flagged, {} failed)",
            recorded, duplicates, flagged, failed
        );
    }

    if failed > 0 {
        anyhow::bail!("{} events failed to apply", failed);
    }
    Ok(())
}
