use std::collections::HashMap;

use rand::seq::SliceRandom;
use sqlx::types::Json;
use uuid::Uuid;

use crate::core::config::ExamSettings;
use crate::core::metrics::{ATTEMPTS_STARTED, ATTEMPTS_SUBMITTED, SUBMISSION_CONFLICTS};
use crate::core::security::Claims;
use crate::core::time::primitive_now_utc;
use crate::db::models::{
    Attempt, AttemptQuestionSet, LeaderboardEntry, Question, Submission, TestDefinition,
};
use crate::db::types::{AttemptStatus, Distribution, SetLabel};
use crate::repositories::submissions::FinalizeOutcome;
use crate::repositories::{ExamStore, StoreError};
use crate::services::marking::{grade, GradeReport};
use crate::services::test_generation::{bind_question_set, load_test};
use crate::services::{EngineError, EngineResult};

/// An attempt in progress together with its bound paper.
#[derive(Debug)]
pub(crate) struct StartedAttempt {
    pub(crate) attempt: Attempt,
    pub(crate) question_set: AttemptQuestionSet,
    /// Questions in bound order.
    pub(crate) questions: Vec<Question>,
    pub(crate) resumed: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmitInput {
    /// Question id to selected option; unanswered questions are absent.
    pub(crate) selections: HashMap<String, i32>,
    pub(crate) time_taken_seconds: i32,
    pub(crate) violations: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmitOutcome {
    pub(crate) attempt_number: i32,
    pub(crate) report: GradeReport,
}

/// First batch shared by the student and the test; `Forbidden` when there is none.
async fn enrolled_batch(
    store: &dyn ExamStore,
    test: &TestDefinition,
    student_id: &str,
) -> EngineResult<String> {
    let student_batches = store.batch_ids_for_student(student_id).await?;
    test.batch_ids
        .0
        .iter()
        .find(|batch| student_batches.contains(batch))
        .cloned()
        .ok_or(EngineError::Forbidden("Student is not enrolled in this test"))
}

fn pick_set_label(distribution: Distribution) -> SetLabel {
    distribution
        .set_labels()
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SetLabel::A)
}

async fn questions_in_order(
    store: &dyn ExamStore,
    ids: &[String],
) -> EngineResult<Vec<Question>> {
    let mut by_id: HashMap<String, Question> = store
        .find_questions_by_ids(ids)
        .await?
        .into_iter()
        .map(|question| (question.id.clone(), question))
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
}

/// Starts or resumes the student's attempt at a test.
///
/// A STARTED attempt is returned as is, with its original paper. A new attempt is numbered
/// `max + 1`; a racing start that loses the unique insert adopts the winner's attempt.
pub(crate) async fn start_attempt(
    store: &dyn ExamStore,
    user: &Claims,
    test_id: &str,
) -> EngineResult<StartedAttempt> {
    let test = load_test(store, user, test_id).await?;
    enrolled_batch(store, &test, &user.sub).await?;

    let (attempt, resumed) = match store.find_active_attempt(&test.id, &user.sub).await? {
        Some(active) => (active, true),
        None => create_attempt(store, &test, &user.sub).await?,
    };

    let question_set = bind_question_set(
        store,
        &test,
        &user.sub,
        attempt.attempt_number,
        attempt.assigned_set,
    )
    .await?;
    let questions = questions_in_order(store, &question_set.question_ids.0).await?;

    metrics::counter!(
        ATTEMPTS_STARTED,
        "outcome" => if resumed { "resumed" } else { "created" }
    )
    .increment(1);
    tracing::info!(
        test_id = %test.id,
        student_id = %user.sub,
        attempt_number = attempt.attempt_number,
        set_label = attempt.assigned_set.as_str(),
        resumed,
        "attempt started"
    );

    Ok(StartedAttempt { attempt, question_set, questions, resumed })
}

async fn create_attempt(
    store: &dyn ExamStore,
    test: &TestDefinition,
    student_id: &str,
) -> EngineResult<(Attempt, bool)> {
    let now = primitive_now_utc();
    if now < test.start_time {
        return Err(EngineError::InvalidState("Test has not started yet".to_string()));
    }
    if now > test.end_time {
        return Err(EngineError::InvalidState("Test has already ended".to_string()));
    }

    let previous = store.max_attempt_number(&test.id, student_id).await?;
    if let Some(limit) = test.max_attempts {
        if previous >= limit {
            return Err(EngineError::InvalidState(format!(
                "Attempt limit of {limit} reached"
            )));
        }
    }

    let attempt = Attempt {
        id: Uuid::new_v4().to_string(),
        test_id: test.id.clone(),
        student_id: student_id.to_string(),
        attempt_number: previous + 1,
        assigned_set: pick_set_label(test.distribution),
        status: AttemptStatus::Started,
        answers: Json(Vec::new()),
        score: None,
        time_taken_seconds: None,
        started_at: now,
        completed_at: None,
        updated_at: now,
    };

    match store.insert_attempt(&attempt).await {
        Ok(()) => Ok((attempt, false)),
        Err(StoreError::UniqueViolation(constraint)) => {
            tracing::debug!(
                test_id = %test.id,
                student_id,
                constraint = %constraint,
                "attempt created concurrently, re-reading"
            );
            store
                .find_active_attempt(&test.id, student_id)
                .await?
                .map(|active| (active, true))
                .ok_or_else(|| {
                    EngineError::InvalidState("Attempt changed concurrently, retry".to_string())
                })
        }
        Err(err) => Err(err.into()),
    }
}

/// Scores the active attempt exactly once.
///
/// Repeat submits of a scored attempt get `Conflict` with the recorded score. The leaderboard
/// entry (first attempt only) and question-set cleanup are best effort.
pub(crate) async fn submit_attempt(
    store: &dyn ExamStore,
    settings: &ExamSettings,
    user: &Claims,
    test_id: &str,
    input: SubmitInput,
) -> EngineResult<SubmitOutcome> {
    let test = load_test(store, user, test_id).await?;

    let Some(attempt) = store.find_active_attempt(&test.id, &user.sub).await? else {
        return Err(match store.find_latest_attempt(&test.id, &user.sub).await? {
            Some(latest) if latest.status == AttemptStatus::Completed => {
                conflict(&test.id, &user.sub, latest.attempt_number, latest.score.unwrap_or(0))
            }
            _ => EngineError::InvalidState("No active session".to_string()),
        });
    };

    let question_set =
        match store.find_question_set(&test.id, &user.sub, attempt.attempt_number).await? {
            Some(set) => set,
            None => {
                // Sets are only deleted after scoring, so a missing set may mean a racing
                // submit already won.
                if let Some(recorded) =
                    store.find_submission(&test.id, &user.sub, attempt.attempt_number).await?
                {
                    return Err(conflict(
                        &test.id,
                        &user.sub,
                        recorded.attempt_number,
                        recorded.score,
                    ));
                }
                bind_question_set(
                    store,
                    &test,
                    &user.sub,
                    attempt.attempt_number,
                    attempt.assigned_set,
                )
                .await?
            }
        };
    let bound_ids = &question_set.question_ids.0;
    let questions: HashMap<String, Question> = store
        .find_questions_by_ids(bound_ids)
        .await?
        .into_iter()
        .map(|question| (question.id.clone(), question))
        .collect();

    let report = grade(&test.marking_scheme.0, bound_ids, &questions, &input.selections);
    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        attempt_id: attempt.id.clone(),
        test_id: test.id.clone(),
        student_id: user.sub.clone(),
        attempt_number: attempt.attempt_number,
        answers: Json(report.answers.clone()),
        score: report.score,
        max_score: report.max_score,
        time_taken_seconds: input.time_taken_seconds.max(0),
        violations: input.violations.max(0),
        submitted_at: primitive_now_utc(),
    };

    match store.finalize_attempt(&submission).await? {
        FinalizeOutcome::Finalized => {}
        FinalizeOutcome::AlreadyFinalized => {
            let recorded = store
                .find_submission(&test.id, &user.sub, attempt.attempt_number)
                .await?
                .ok_or_else(|| {
                    EngineError::InvalidState("Attempt is no longer active".to_string())
                })?;
            return Err(conflict(&test.id, &user.sub, recorded.attempt_number, recorded.score));
        }
    }

    metrics::counter!(ATTEMPTS_SUBMITTED).increment(1);
    tracing::info!(
        test_id = %test.id,
        student_id = %user.sub,
        attempt_number = submission.attempt_number,
        score = submission.score,
        max_score = submission.max_score,
        violations = submission.violations,
        "attempt submitted"
    );

    if submission.attempt_number == 1 {
        record_leaderboard(store, &test, &submission).await;
    }

    if settings.cleanup_question_sets {
        if let Err(err) =
            store.delete_question_set(&test.id, &user.sub, submission.attempt_number).await
        {
            tracing::warn!(error = %err, test_id = %test.id, "question set cleanup failed");
        }
    }

    Ok(SubmitOutcome { attempt_number: submission.attempt_number, report })
}

fn conflict(test_id: &str, student_id: &str, attempt_number: i32, score: i32) -> EngineError {
    metrics::counter!(SUBMISSION_CONFLICTS).increment(1);
    tracing::info!(test_id, student_id, attempt_number, score, "repeat submit rejected");
    EngineError::Conflict { score, attempt_number }
}

async fn record_leaderboard(store: &dyn ExamStore, test: &TestDefinition, submission: &Submission) {
    let batch_id = match enrolled_batch(store, test, &submission.student_id).await {
        Ok(batch) => Some(batch),
        Err(err) => {
            tracing::warn!(error = %err, test_id = %test.id, "leaderboard batch lookup failed");
            None
        }
    };

    let entry = LeaderboardEntry {
        id: Uuid::new_v4().to_string(),
        test_id: test.id.clone(),
        student_id: submission.student_id.clone(),
        batch_id,
        score: submission.score,
        time_taken_seconds: submission.time_taken_seconds,
        created_at: submission.submitted_at,
    };

    match store.insert_leaderboard_entry(&entry).await {
        Ok(true) => {}
        Ok(false) => tracing::debug!(test_id = %test.id, "leaderboard entry already present"),
        Err(err) => {
            tracing::warn!(
                error = %err,
                test_id = %test.id,
                student_id = %submission.student_id,
                "leaderboard update failed"
            );
        }
    }
}
