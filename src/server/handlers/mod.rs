// HTTP handlers module

mod handle_event;
mod handle_history;
mod handle_plot;
mod handle_root;
mod handle_status;

use std::sync::Arc;
use std::time::Instant;

use crate::aggregator::SizeAggregator;
use crate::artifact::FileArtifactStore;
use crate::plot::PlotRenderer;
use crate::server::config::ServerConfig;
use crate::store::FileHistoryStore;

#[derive(Clone)]
pub struct ServerState {
    pub history: Arc<FileHistoryStore>,
    pub aggregator: Arc<SizeAggregator<FileHistoryStore>>,
    pub renderer: Arc<PlotRenderer<FileHistoryStore, FileArtifactStore>>,
    pub config: ServerConfig,
    pub start_time: Instant,
}

pub use handle_event::*;
pub use handle_history::*;
pub use handle_plot::*;
pub use handle_root::*;
pub use handle_status::*;
