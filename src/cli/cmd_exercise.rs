// Exercise command - scripted workload against a running server
use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Args;
use std::time::Duration;

use sizetrack::{ChangeKind, Config, ObjectChangeEvent, PlotRequest, RenderDriver, constants};

#[derive(Args)]
#[command(
    about = "Run a scripted create/overwrite/remove workload, then render",
    long_about = "Post a short scripted sequence of object-change events to a running
server's ingest endpoint (create a file, overwrite it, remove it, create
another), pausing between steps, and finally trigger a render through the
orchestrator. Prints the resulting artifact location.

This is an end-to-end smoke test of the whole pipeline: ingestion,
aggregation, history persistence, rendering, and orchestration."
)]
pub struct ExerciseCommand {
    /// Server base URL (overrides SIZETRACK_RENDER_URL)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Bucket to exercise
    #[arg(short, long, default_value = "demo-bucket")]
    pub bucket: String,

    /// Pause between steps (milliseconds)
    #[arg(long, default_value = "250")]
    pub pause_ms: u64,
}

pub fn run(cmd: ExerciseCommand) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(server) = cmd.server {
        config.render_url = server;
    }
    let base_url = config.render_url.trim_end_matches('/').to_string();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::RENDER_TIMEOUT_SECS))
            .user_agent(constants::user_agent())
            .build()?;

        let run_id = Utc::now().timestamp_millis();
        let steps = [
            ("create step-1.txt (18 bytes)", ChangeKind::Created, "step-1.txt", Some(18u64)),
            ("overwrite step-1.txt (27 bytes)", ChangeKind::Created, "step-1.txt", Some(27)),
            ("remove step-1.txt", ChangeKind::Removed, "step-1.txt", None),
            ("create step-2.txt (2 bytes)", ChangeKind::Created, "step-2.txt", Some(2)),
        ];

        for (i, (label, kind, key, size)) in steps.iter().enumerate() {
            let event = ObjectChangeEvent {
                bucket: cmd.bucket.clone(),
                key: (*key).to_string(),
                change_type: *kind,
                size: *size,
                event_time: sizetrack::EventTime::Millis(Utc::now().timestamp_millis()),
                delivery_id: format!("exercise-{}-{}", run_id, i),
            };

            eprintln!("[{}/{}] {}", i + 1, steps.len(), label);
            let response = client
                .post(format!("{}/events", base_url))
                .json(&event)
                .send()
                .await
                .with_context(|| format!("failed to reach {}", base_url))?;
            if !response.status().is_success() {
                bail!(
                    "event rejected ({}): {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                );
            }

            tokio::time::sleep(Duration::from_millis(cmd.pause_ms)).await;
        }

        let driver =
            RenderDriver::with_policy(&base_url, config.render_timeout, config.retry_limit)?;
        let artifact = driver
            .trigger_render(&PlotRequest {
                bucket: Some(cmd.bucket.clone()),
                start: None,
                end: None,
            })
            .await?;

        eprintln!("plot ready: {}", artifact.location);
        println!("{}", artifact.location);
        Ok(())
    })
}
