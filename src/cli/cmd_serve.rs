// Serve command - start the HTTP server
use anyhow::{Context, Result};
use clap::{Args, ValueHint};
use std::path::PathBuf;
use std::sync::Arc;

use sizetrack::server::{Server, ServerConfig};
use sizetrack::{
    Config, FileArtifactStore, FileHistoryStore, PlotRenderer, SizeAggregator, TrackerRuntime,
    constants,
};

#[derive(Args)]
#[command(
    about = "Start the HTTP server",
    long_about = "Start the HTTP server that ingests object-change notifications, answers
history queries, and renders size charts on demand.

Configuration comes from the environment (SIZETRACK_* variables) with any
flags given here applied on top. The server keeps no mutable state outside
the history directory; several instances pointed at different directories
are fully independent."
)]
pub struct ServeCommand {
    /// Listen address (overrides SIZETRACK_LISTEN_ADDR)
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Directory charts are published into (overrides SIZETRACK_ARTIFACT_DIR)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub artifact_dir: Option<PathBuf>,
}

pub fn run(cmd: ServeCommand, dir: Option<PathBuf>) -> Result<()> {
    let mut config = Config::from_env()?;
    if let Some(dir) = dir {
        config.history_dir = dir;
    }
    if let Some(listen) = cmd.listen {
        config.listen_addr = listen;
    }
    if let Some(artifact_dir) = cmd.artifact_dir {
        config.artifact_dir = artifact_dir;
    }

    let history = Arc::new(
        FileHistoryStore::open(&config.history_dir).with_context(|| {
            format!("failed to open history dir {}", config.history_dir.display())
        })?,
    );
    let artifacts = Arc::new(
        FileArtifactStore::open(&config.artifact_dir).with_context(|| {
            format!("failed to open artifact dir {}", config.artifact_dir.display())
        })?,
    );
    let aggregator = Arc::new(SizeAggregator::new(Arc::clone(&history)));
    let renderer = Arc::new(PlotRenderer::new(Arc::clone(&history), artifacts));

    let server = Server::new(
        history,
        aggregator,
        renderer,
        ServerConfig {
            version: constants::VERSION.to_string(),
        },
    );
    let app = server.router();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;

        eprintln!(
            "{} v{} listening on http://{}",
            constants::BINARY_NAME,
            constants::VERSION,
            listener.local_addr()?
        );
        eprintln!("  history:   {}", config.history_dir.display());
        eprintln!("  artifacts: {}", config.artifact_dir.display());

        let tracker = TrackerRuntime::new();
        axum::serve(listener, app)
            .with_graceful_shutdown(tracker.create_shutdown_future())
            .await
            .context("server error")
    })?;

    eprintln!("Server stopped");
    Ok(())
}
