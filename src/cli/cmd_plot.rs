// Plot command - trigger a render through the orchestrator
use anyhow::{Context, Result};
use clap::{Args, ValueHint};
use std::path::PathBuf;
use std::sync::Arc;

use sizetrack::{
    Config, FileArtifactStore, FileHistoryStore, PlotRenderer, PlotRequest, RenderDriver,
};

#[derive(Args)]
#[command(
    about = "Render a size chart and print the artifact location",
    long_about = "Trigger a render of the stored size history. By default this goes through
the orchestration path: an HTTP call to a running server's /plot endpoint
with the configured timeout and retry policy. With --local the chart is
rendered in-process from the history directory instead, which is handy when
no server is running.

Transient failures (timeouts, 5xx responses) are retried up to the
configured bound; an empty range is terminal and reported as such."
)]
pub struct PlotCommand {
    /// Bucket to plot (defaults to every known bucket)
    #[arg(short, long)]
    pub bucket: Option<String>,

    /// Range start, epoch milliseconds (inclusive)
    #[arg(long)]
    pub start: Option<i64>,

    /// Range end, epoch milliseconds (inclusive)
    #[arg(long)]
    pub end: Option<i64>,

    /// Server base URL (overrides SIZETRACK_RENDER_URL)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Render in-process instead of calling a server
    #[arg(long)]
    pub local: bool,

    /// Artifact directory for --local (overrides SIZETRACK_ARTIFACT_DIR)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub artifact_dir: Option<PathBuf>,
}

pub fn run(cmd: PlotCommand, dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = dir {
        config.history_dir = dir;
    }
    if let Some(artifact_dir) = cmd.artifact_dir {
        config.artifact_dir = artifact_dir;
    }
    if let Some(server) = cmd.server {
        config.render_url = server;
    }

    let request = PlotRequest {
        bucket: cmd.bucket,
        start: cmd.start,
        end: cmd.end,
    };

    let artifact = if cmd.local {
        let history = Arc::new(FileHistoryStore::open(&config.history_dir)?);
        let artifacts = Arc::new(FileArtifactStore::open(&config.artifact_dir)?);
        PlotRenderer::new(history, artifacts)
            .render(&request)
            .context("local render failed")?
    } else {
        let driver =
            RenderDriver::with_policy(&config.render_url, config.render_timeout, config.retry_limit)?;
        let runtime = tokio::runtime::Runtime::new()?;
        runtime
            .block_on(driver.trigger_render(&request))
            .context("render trigger failed")?
    };

    println!("{}", artifact.location);
    Ok(())
}
