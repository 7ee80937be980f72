use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::{
    Attempt, AttemptQuestionSet, LeaderboardEntry, Question, Submission, TestDefinition, TestSet,
};
use crate::db::types::SetLabel;
use crate::repositories::questions::QuestionFilter;
use crate::repositories::store::{ExamStore, StoreResult};
use crate::repositories::submissions::FinalizeOutcome;
use crate::repositories::{
    attempts, batches, leaderboard, question_sets, questions, submissions, test_definitions,
    test_sets,
};

#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExamStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_questions(&self, filter: &QuestionFilter) -> StoreResult<Vec<Question>> {
        Ok(questions::find_by_filter(&self.pool, filter).await?)
    }

    async fn find_questions_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Question>> {
        Ok(questions::find_by_ids(&self.pool, ids).await?)
    }

    async fn batch_ids_for_student(&self, student_id: &str) -> StoreResult<Vec<String>> {
        Ok(batches::list_batch_ids_for_student(&self.pool, student_id).await?)
    }

    async fn students_in_batches(&self, batch_ids: &[String]) -> StoreResult<Vec<String>> {
        Ok(batches::list_students_in_batches(&self.pool, batch_ids).await?)
    }

    async fn create_test_definition(&self, test: &TestDefinition) -> StoreResult<()> {
        Ok(test_definitions::create(&self.pool, test).await?)
    }

    async fn find_test_definition(&self, test_id: &str) -> StoreResult<Option<TestDefinition>> {
        Ok(test_definitions::find_by_id(&self.pool, test_id).await?)
    }

    async fn find_test_set(
        &self,
        test_id: &str,
        set_label: SetLabel,
    ) -> StoreResult<Option<TestSet>> {
        Ok(test_sets::find(&self.pool, test_id, set_label).await?)
    }

    async fn insert_test_set(&self, set: &TestSet) -> StoreResult<()> {
        Ok(test_sets::create(&self.pool, set).await?)
    }

    async fn replace_test_set(&self, set: &TestSet) -> StoreResult<()> {
        Ok(test_sets::replace(&self.pool, set).await?)
    }

    async fn find_question_set(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<Option<AttemptQuestionSet>> {
        Ok(question_sets::find(&self.pool, test_id, student_id, attempt_number).await?)
    }

    async fn insert_question_set(&self, set: &AttemptQuestionSet) -> StoreResult<()> {
        Ok(question_sets::create(&self.pool, set).await?)
    }

    async fn delete_question_set(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<()> {
        Ok(question_sets::delete(&self.pool, test_id, student_id, attempt_number).await?)
    }

    async fn find_active_attempt(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Attempt>> {
        Ok(attempts::find_active(&self.pool, test_id, student_id).await?)
    }

    async fn find_latest_attempt(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Attempt>> {
        Ok(attempts::find_latest(&self.pool, test_id, student_id).await?)
    }

    async fn max_attempt_number(&self, test_id: &str, student_id: &str) -> StoreResult<i32> {
        Ok(attempts::max_attempt_number(&self.pool, test_id, student_id).await?)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()> {
        Ok(attempts::create(&self.pool, attempt).await?)
    }

    async fn finalize_attempt(&self, submission: &Submission) -> StoreResult<FinalizeOutcome> {
        Ok(submissions::finalize(&self.pool, submission).await?)
    }

    async fn find_submission(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<Option<Submission>> {
        Ok(submissions::find(&self.pool, test_id, student_id, attempt_number).await?)
    }

    async fn list_submissions(&self, test_id: &str) -> StoreResult<Vec<Submission>> {
        Ok(submissions::list_by_test(&self.pool, test_id).await?)
    }

    async fn insert_leaderboard_entry(&self, entry: &LeaderboardEntry) -> StoreResult<bool> {
        Ok(leaderboard::create_if_absent(&self.pool, entry).await?)
    }

    async fn list_leaderboard(&self, test_id: &str) -> StoreResult<Vec<LeaderboardEntry>> {
        Ok(leaderboard::list_by_test(&self.pool, test_id).await?)
    }
}
