use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentTeacher;
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::TestDefinition;
use crate::schemas::analytics::TestAnalyticsResponse;
use crate::schemas::test_definition::{TestDefinitionCreate, TestDefinitionResponse};
use crate::services::analytics;
use crate::services::marking::default_scheme;
use crate::services::test_generation::{self, GenerationReport};

pub(super) async fn create_test(
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
    Json(payload): Json<TestDefinitionCreate>,
) -> Result<(StatusCode, Json<TestDefinitionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let limit = state.settings().exam().max_questions_per_section;
    if let Some(index) = payload.sections.iter().position(|s| s.num_questions > limit) {
        return Err(ApiError::BadRequest(format!(
            "section {index} exceeds the limit of {limit} questions"
        )));
    }

    let now = primitive_now_utc();
    let marking_scheme =
        payload.marking_scheme.unwrap_or_else(|| default_scheme(payload.exam_type));
    let test = TestDefinition {
        id: Uuid::new_v4().to_string(),
        institute_id: user.institute_id.clone(),
        title: payload.title.trim().to_string(),
        mode: payload.mode,
        exam_type: payload.exam_type,
        batch_ids: SqlJson(payload.batch_ids),
        sections: SqlJson(payload.sections),
        blocks: SqlJson(payload.blocks),
        marking_scheme: SqlJson(marking_scheme),
        distribution: payload.distribution,
        duration_minutes: payload.duration_minutes,
        max_attempts: payload.max_attempts,
        start_time: to_primitive_utc(payload.start_time),
        end_time: to_primitive_utc(payload.end_time),
        created_by: user.sub.clone(),
        created_at: now,
        updated_at: now,
    };

    state
        .store()
        .create_test_definition(&test)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to create test"))?;

    tracing::info!(test_id = %test.id, created_by = %user.sub, "test definition created");
    Ok((StatusCode::CREATED, Json(test.into())))
}

pub(super) async fn get_test(
    Path(test_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TestDefinitionResponse>, ApiError> {
    let test = test_generation::load_owned_test(state.store(), &user, &test_id).await?;
    Ok(Json(test.into()))
}

pub(super) async fn generate_sets(
    Path(test_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<GenerationReport>, ApiError> {
    let report = test_generation::generate_test_sets(state.store(), &user, &test_id).await?;
    Ok(Json(report))
}

pub(super) async fn test_analytics(
    Path(test_id): Path<String>,
    CurrentTeacher(user): CurrentTeacher,
    State(state): State<AppState>,
) -> Result<Json<TestAnalyticsResponse>, ApiError> {
    let analytics = analytics::test_analytics(state.store(), &user, &test_id).await?;
    Ok(Json(analytics))
}
