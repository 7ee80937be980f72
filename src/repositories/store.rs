use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::db::models::{
    Attempt, AttemptQuestionSet, LeaderboardEntry, Question, Submission, TestDefinition, TestSet,
};
use crate::db::types::SetLabel;
use crate::repositories::questions::QuestionFilter;
use crate::repositories::submissions::FinalizeOutcome;

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::UniqueViolation(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub(crate) type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations the exam engine depends on.
///
/// Inserts of attempts, attempt question sets and test sets are plain inserts: a second
/// writer for the same key must get `StoreError::UniqueViolation`, never an overwrite.
#[async_trait]
pub(crate) trait ExamStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // Question repository
    /// Every match, in a stable `(created_at, id)` order.
    async fn find_questions(&self, filter: &QuestionFilter) -> StoreResult<Vec<Question>>;
    /// Up to `count` distinct matches drawn with `rng`; fewer when the bank runs short.
    ///
    /// The same seed over the same bank yields the same draw.
    async fn sample_questions(
        &self,
        filter: &QuestionFilter,
        count: u32,
        rng: &mut StdRng,
    ) -> StoreResult<Vec<Question>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let matches = self.find_questions(filter).await?;
        Ok(matches.choose_multiple(rng, count as usize).cloned().collect())
    }
    async fn find_questions_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Question>>;

    // Batch membership
    async fn batch_ids_for_student(&self, student_id: &str) -> StoreResult<Vec<String>>;
    async fn students_in_batches(&self, batch_ids: &[String]) -> StoreResult<Vec<String>>;

    // Test definitions and parallel sets
    async fn create_test_definition(&self, test: &TestDefinition) -> StoreResult<()>;
    async fn find_test_definition(&self, test_id: &str) -> StoreResult<Option<TestDefinition>>;
    async fn find_test_set(
        &self,
        test_id: &str,
        set_label: SetLabel,
    ) -> StoreResult<Option<TestSet>>;
    async fn insert_test_set(&self, set: &TestSet) -> StoreResult<()>;
    async fn replace_test_set(&self, set: &TestSet) -> StoreResult<()>;

    // Attempt question sets
    async fn find_question_set(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<Option<AttemptQuestionSet>>;
    async fn insert_question_set(&self, set: &AttemptQuestionSet) -> StoreResult<()>;
    async fn delete_question_set(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<()>;

    // Attempts
    async fn find_active_attempt(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Attempt>>;
    async fn find_latest_attempt(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Attempt>>;
    async fn max_attempt_number(&self, test_id: &str, student_id: &str) -> StoreResult<i32>;
    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()>;

    // Submissions
    /// Atomically records the submission and completes its attempt.
    async fn finalize_attempt(&self, submission: &Submission) -> StoreResult<FinalizeOutcome>;
    async fn find_submission(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<Option<Submission>>;
    async fn list_submissions(&self, test_id: &str) -> StoreResult<Vec<Submission>>;

    // Leaderboard
    async fn insert_leaderboard_entry(&self, entry: &LeaderboardEntry) -> StoreResult<bool>;
    async fn list_leaderboard(&self, test_id: &str) -> StoreResult<Vec<LeaderboardEntry>>;
}
