mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_test))
        .route("/:test_id", get(handlers::get_test))
        .route("/:test_id/generate", post(handlers::generate_sets))
        .route("/:test_id/analytics", get(handlers::test_analytics))
}
