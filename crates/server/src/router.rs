// crates/server/src/router.rs

use crate::dispatch::serve_feed;
use crate::state::AppState;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/feed/:name", get(serve_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
