// Plot trigger handler

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::constants;
use crate::plot::{PlotRequest, RenderError};
use crate::server::ServerState;
use crate::server::error::{internal_error, no_data, task_join_error, unavailable, unprocessable};

#[derive(Debug, Deserialize)]
pub struct PlotParams {
    bucket: Option<String>,
    start: Option<i64>,
    end: Option<i64>,
}

/// GET /plot?bucket=&start=&end=: render and publish a chart
///
/// All parameters optional: no bucket means every known bucket, no range
/// means all time. Responds 200 with `{location, generatedAt}` only after
/// the artifact is durably stored.
pub async fn handle_plot(
    State(state): State<ServerState>,
    Query(params): Query<PlotParams>,
) -> impl IntoResponse {
    if let Some(bucket) = &params.bucket
        && !constants::validate_bucket_name(bucket)
    {
        return unprocessable("invalid_bucket", &format!("invalid bucket name: {:?}", bucket))
            .into_response();
    }

    let request = PlotRequest {
        bucket: params.bucket,
        start: params.start,
        end: params.end,
    };

    // rendering does file IO and chart drawing; keep it off the async workers
    let result = tokio::task::spawn_blocking({
        let renderer = Arc::clone(&state.renderer);
        move || renderer.render(&request)
    })
    .await;

    let result = match result {
        Ok(result) => result,
        Err(e) => return task_join_error(e).into_response(),
    };

    match result {
        Ok(artifact) => (StatusCode::OK, axum::Json(artifact)).into_response(),
        Err(RenderError::NoData) => {
            no_data("no history records in the requested range").into_response()
        }
        Err(e @ RenderError::InvalidRange { .. }) => {
            unprocessable("invalid_range", &e.to_string()).into_response()
        }
        Err(RenderError::Store(e)) => {
            unavailable("store_unavailable", &e.to_string()).into_response()
        }
        Err(e) => internal_error(&e.to_string()).into_response(),
    }
}
