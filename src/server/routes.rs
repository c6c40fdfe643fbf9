// Route setup and configuration

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::server::ServerState;
use crate::server::handlers::{
    handle_event, handle_history, handle_latest, handle_max, handle_plot, handle_root,
    handle_status,
};

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", axum::routing::get(handle_root))
        .route("/status", axum::routing::get(handle_status))
        .route("/plot", axum::routing::get(handle_plot))
        .route("/events", axum::routing::post(handle_event))
        .route("/history/{bucket}", axum::routing::get(handle_history))
        .route("/latest/{bucket}", axum::routing::get(handle_latest))
        .route("/max/{bucket}", axum::routing::get(handle_max))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(state)
}
