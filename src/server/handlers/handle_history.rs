// History query handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use crate::constants;
use crate::history::HistoryStore;
use crate::server::ServerState;
use crate::server::error::{no_data, unavailable, unprocessable};

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    start: Option<i64>,
    end: Option<i64>,
}

fn check_bucket(bucket: &str) -> Result<(), axum::response::Response> {
    if constants::validate_bucket_name(bucket) {
        Ok(())
    } else {
        Err(
            unprocessable("invalid_bucket", &format!("invalid bucket name: {:?}", bucket))
                .into_response(),
        )
    }
}

/// GET /history/{bucket}?start=&end=: records ascending by timestamp
pub async fn handle_history(
    State(state): State<ServerState>,
    Path(bucket): Path<String>,
    Query(params): Query<RangeParams>,
) -> impl IntoResponse {
    if let Err(resp) = check_bucket(&bucket) {
        return resp;
    }
    if let (Some(start), Some(end)) = (params.start, params.end)
        && start > end
    {
        return unprocessable(
            "invalid_range",
            &format!("start {} is after end {}", start, end),
        )
        .into_response();
    }

    match state.history.range(&bucket, params.start, params.end) {
        Ok(records) => (StatusCode::OK, axum::Json(records)).into_response(),
        Err(e) => unavailable("store_unavailable", &e.to_string()).into_response(),
    }
}

/// GET /latest/{bucket}: the authoritative current aggregate
pub async fn handle_latest(
    State(state): State<ServerState>,
    Path(bucket): Path<String>,
) -> impl IntoResponse {
    if let Err(resp) = check_bucket(&bucket) {
        return resp;
    }

    match state.history.latest(&bucket) {
        Ok(Some(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(None) => no_data(&format!("no records for bucket {}", bucket)).into_response(),
        Err(e) => unavailable("store_unavailable", &e.to_string()).into_response(),
    }
}

/// GET /max/{bucket}: the peak observed size, from the secondary index
pub async fn handle_max(
    State(state): State<ServerState>,
    Path(bucket): Path<String>,
) -> impl IntoResponse {
    if let Err(resp) = check_bucket(&bucket) {
        return resp;
    }

    match state.history.max_size(&bucket) {
        Ok(Some(record)) => (StatusCode::OK, axum::Json(record)).into_response(),
        Ok(None) => no_data(&format!("no records for bucket {}", bucket)).into_response(),
        Err(e) => unavailable("store_unavailable", &e.to_string()).into_response(),
    }
}
