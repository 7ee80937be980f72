use sqlx::types::Json;
use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::{Attempt, GradedAnswer};
use crate::db::types::AttemptStatus;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, attempt_number, assigned_set, status, answers, score, \
    time_taken_seconds, started_at, completed_at, updated_at";

pub(crate) struct CompleteAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) answers: &'a [GradedAnswer],
    pub(crate) score: i32,
    pub(crate) time_taken_seconds: i32,
    pub(crate) completed_at: PrimitiveDateTime,
}

pub(crate) async fn find_active(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE test_id = $1 AND student_id = $2 AND status = $3 \
         ORDER BY attempt_number DESC LIMIT 1"
    ))
    .bind(test_id)
    .bind(student_id)
    .bind(AttemptStatus::Started)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_latest(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts \
         WHERE test_id = $1 AND student_id = $2 \
         ORDER BY attempt_number DESC LIMIT 1"
    ))
    .bind(test_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn max_attempt_number(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COALESCE(MAX(attempt_number), 0) FROM attempts \
         WHERE test_id = $1 AND student_id = $2",
    )
    .bind(test_id)
    .bind(student_id)
    .fetch_one(pool)
    .await
}

/// Plain insert so that a racing start surfaces as a unique violation on
/// `uq_attempts_test_student_number` or `uq_attempts_one_started`.
pub(crate) async fn create(pool: &PgPool, attempt: &Attempt) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO attempts (
            id, test_id, student_id, attempt_number, assigned_set, status, answers,
            score, time_taken_seconds, started_at, completed_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
    )
    .bind(&attempt.id)
    .bind(&attempt.test_id)
    .bind(&attempt.student_id)
    .bind(attempt.attempt_number)
    .bind(attempt.assigned_set)
    .bind(attempt.status)
    .bind(Json(&attempt.answers.0))
    .bind(attempt.score)
    .bind(attempt.time_taken_seconds)
    .bind(attempt.started_at)
    .bind(attempt.completed_at)
    .bind(attempt.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Moves a started attempt to completed. Returns `false` when the attempt was no longer
/// in the started state.
pub(crate) async fn complete(
    executor: impl sqlx::PgExecutor<'_>,
    params: CompleteAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE attempts
         SET status = $1,
             answers = $2,
             score = $3,
             time_taken_seconds = $4,
             completed_at = $5,
             updated_at = $5
         WHERE id = $6 AND status = $7",
    )
    .bind(AttemptStatus::Completed)
    .bind(Json(params.answers))
    .bind(params.score)
    .bind(params.time_taken_seconds)
    .bind(params.completed_at)
    .bind(params.id)
    .bind(AttemptStatus::Started)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}
