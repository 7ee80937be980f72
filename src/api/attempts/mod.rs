mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/tests/:test_id/start", post(handlers::start_attempt))
        .route("/tests/:test_id/submit", post(handlers::submit_attempt))
        .route("/tests/:test_id/:attempt_number/analysis", get(handlers::attempt_analysis))
}
