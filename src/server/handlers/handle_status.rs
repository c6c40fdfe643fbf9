// Status handler

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::history::HistoryStore;
use crate::server::ServerState;
use crate::server::error::unavailable;

/// GET /status: server and store overview
pub async fn handle_status(State(state): State<ServerState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    let buckets = match state.history.buckets() {
        Ok(buckets) => buckets,
        Err(e) => return unavailable("store_unavailable", &e.to_string()).into_response(),
    };

    let mut bucket_stats = Vec::with_capacity(buckets.len());
    for bucket in &buckets {
        let latest = state.history.latest(bucket).ok().flatten();
        let peak = state.history.max_size(bucket).ok().flatten();
        bucket_stats.push(json!({
            "bucket": bucket,
            "sizeBytes": latest.as_ref().map(|r| r.size_bytes),
            "objectCount": latest.as_ref().map(|r| r.object_count),
            "updatedAt": latest.as_ref().map(|r| r.timestamp),
            "peakSizeBytes": peak.as_ref().map(|r| r.size_bytes),
        }));
    }

    let response = json!({
        "server": {
            "version": state.config.version,
            "uptime_seconds": uptime,
            "history_dir": state.history.dir().display().to_string(),
            "pending_deliveries": state.aggregator.window_len(),
        },
        "history": {
            "bucket_count": buckets.len(),
            "record_count": state.history.record_count(),
            "buckets": bucket_stats,
        }
    });

    (StatusCode::OK, axum::Json(response)).into_response()
}
