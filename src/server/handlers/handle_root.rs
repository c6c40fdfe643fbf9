// Root page handler

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::constants;
use crate::history::HistoryStore;
use crate::server::ServerState;

pub async fn handle_root(State(state): State<ServerState>) -> impl IntoResponse {
    let bucket_count = state.history.buckets().map(|b| b.len()).unwrap_or(0);
    let record_count = state.history.record_count();
    let uptime = state.start_time.elapsed().as_secs();

    let mut response = String::new();
    response.push('\n');
    response.push_str(&format!(
        "  {} server v{}\n\n",
        constants::BINARY_NAME,
        state.config.version
    ));
    response.push_str("Tracks an object store's aggregate size over time and\n");
    response.push_str("renders the history as an on-demand chart.\n\n");
    response.push_str(&format!(
        "  buckets: {}   records: {}   uptime: {}s\n\n",
        bucket_count, record_count, uptime
    ));
    response.push_str("Endpoints:\n");
    response.push_str("  POST /events              apply an object-change notification\n");
    response.push_str("  GET  /plot?bucket&start&end  render a size chart, returns the artifact\n");
    response.push_str("  GET  /history/{bucket}    records, ascending by timestamp\n");
    response.push_str("  GET  /latest/{bucket}     current aggregate\n");
    response.push_str("  GET  /max/{bucket}        peak observed size\n");
    response.push_str("  GET  /status              server and store overview\n");

    (StatusCode::OK, response)
}
