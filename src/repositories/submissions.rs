use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::Submission;
use crate::repositories::attempts::{self, CompleteAttempt};

pub(crate) const COLUMNS: &str = "\
    id, attempt_id, test_id, student_id, attempt_number, answers, score, max_score, \
    time_taken_seconds, violations, submitted_at";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FinalizeOutcome {
    Finalized,
    AlreadyFinalized,
}

/// Writes the submission and completes its attempt in one transaction.
///
/// The unique index on `(test_id, student_id, attempt_number)` decides the winner of
/// concurrent submits; the loser rolls back and observes `AlreadyFinalized`.
pub(crate) async fn finalize(
    pool: &PgPool,
    submission: &Submission,
) -> Result<FinalizeOutcome, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO submissions (
            id, attempt_id, test_id, student_id, attempt_number, answers, score,
            max_score, time_taken_seconds, violations, submitted_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)",
    )
    .bind(&submission.id)
    .bind(&submission.attempt_id)
    .bind(&submission.test_id)
    .bind(&submission.student_id)
    .bind(submission.attempt_number)
    .bind(Json(&submission.answers.0))
    .bind(submission.score)
    .bind(submission.max_score)
    .bind(submission.time_taken_seconds)
    .bind(submission.violations)
    .bind(submission.submitted_at)
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
            tx.rollback().await?;
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }
        Err(err) => return Err(err),
    }

    let completed = attempts::complete(
        &mut *tx,
        CompleteAttempt {
            id: &submission.attempt_id,
            answers: &submission.answers.0,
            score: submission.score,
            time_taken_seconds: submission.time_taken_seconds,
            completed_at: submission.submitted_at,
        },
    )
    .await?;

    if !completed {
        tx.rollback().await?;
        return Ok(FinalizeOutcome::AlreadyFinalized);
    }

    tx.commit().await?;
    Ok(FinalizeOutcome::Finalized)
}

pub(crate) async fn find(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
    attempt_number: i32,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions \
         WHERE test_id = $1 AND student_id = $2 AND attempt_number = $3"
    ))
    .bind(test_id)
    .bind(student_id)
    .bind(attempt_number)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_by_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE test_id = $1 \
         ORDER BY student_id, attempt_number"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}
