// Event ingestion handler

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;

use crate::aggregator::AggregationError;
use crate::event::ObjectChangeEvent;
use crate::server::ServerState;
use crate::server::error::{task_join_error, unavailable, unprocessable};

/// POST /events: apply one object-change notification
///
/// 200 carries the resulting record, including for recognized duplicate
/// replays. 503 tells the at-least-once deliverer to redeliver; 422 means
/// the envelope itself is unusable and redelivery cannot help.
pub async fn handle_event(
    State(state): State<ServerState>,
    body: String,
) -> impl IntoResponse {
    let event: ObjectChangeEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(e) => {
            return unprocessable("invalid_event", &format!("malformed envelope: {}", e))
                .into_response();
        }
    };

    // apply() re-reads the baseline and may block on retry backoff
    let result = tokio::task::spawn_blocking({
        let aggregator = Arc::clone(&state.aggregator);
        move || aggregator.apply(&event)
    })
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => return task_join_error(e).into_response(),
    };

    match result {
        Ok(applied) => (
            StatusCode::OK,
            axum::Json(json!({
                "record": applied.record,
                "status": applied.status,
            })),
        )
            .into_response(),
        Err(AggregationError::InvalidEvent(reason)) => {
            unprocessable("invalid_event", &reason).into_response()
        }
        Err(e @ AggregationError::RetriesExhausted { .. }) => {
            unavailable("aggregation_conflict", &e.to_string()).into_response()
        }
        Err(AggregationError::Store(e)) => {
            unavailable("store_unavailable", &e.to_string()).into_response()
        }
    }
}
