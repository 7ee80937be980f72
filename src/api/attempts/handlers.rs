use axum::extract::{Path, State};
use axum::Json;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentStudent;
use crate::core::state::AppState;
use crate::schemas::analytics::AttemptAnalysisResponse;
use crate::schemas::attempt::{StartAttemptResponse, SubmitAttemptRequest, SubmitAttemptResponse};
use crate::services::{analytics, attempts};

pub(super) async fn start_attempt(
    Path(test_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<StartAttemptResponse>, ApiError> {
    let started = attempts::start_attempt(state.store(), &user, &test_id).await?;
    Ok(Json(started.into()))
}

pub(super) async fn submit_attempt(
    Path(test_id): Path<String>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<Json<SubmitAttemptResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let outcome = attempts::submit_attempt(
        state.store(),
        state.settings().exam(),
        &user,
        &test_id,
        payload.into(),
    )
    .await?;

    Ok(Json(SubmitAttemptResponse::new(test_id, outcome)))
}

pub(super) async fn attempt_analysis(
    Path((test_id, attempt_number)): Path<(String, i32)>,
    CurrentStudent(user): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AttemptAnalysisResponse>, ApiError> {
    let analysis =
        analytics::attempt_analysis(state.store(), &user, &test_id, attempt_number).await?;
    Ok(Json(analysis))
}
