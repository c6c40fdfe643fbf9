// HTTP server for event ingestion, history queries, and on-demand plots

mod config;
pub mod error;
mod handlers;
mod routes;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;

use crate::aggregator::SizeAggregator;
use crate::artifact::FileArtifactStore;
use crate::plot::PlotRenderer;
use crate::store::FileHistoryStore;

pub use config::ServerConfig;
pub use handlers::ServerState;

pub struct Server {
    state: ServerState,
}

impl Server {
    pub fn new(
        history: Arc<FileHistoryStore>,
        aggregator: Arc<SizeAggregator<FileHistoryStore>>,
        renderer: Arc<PlotRenderer<FileHistoryStore, FileArtifactStore>>,
        config: ServerConfig,
    ) -> Self {
        Self {
            state: ServerState {
                history,
                aggregator,
                renderer,
                config,
                start_time: Instant::now(),
            },
        }
    }

    pub fn router(&self) -> Router {
        routes::create_router(self.state.clone())
    }

    pub fn start_time(&self) -> Instant {
        self.state.start_time
    }
}
