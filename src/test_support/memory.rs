use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::db::models::{
    Attempt, AttemptQuestionSet, LeaderboardEntry, Question, Submission, TestDefinition, TestSet,
};
use crate::db::types::{AttemptStatus, SetLabel};
use crate::repositories::store::StoreResult;
use crate::repositories::submissions::FinalizeOutcome;
use crate::repositories::{ExamStore, QuestionFilter, StoreError};

type AttemptKey = (String, String, i32);

/// In-process `ExamStore` enforcing the same unique keys as the Postgres schema.
#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    questions: Vec<Question>,
    /// `(batch_id, student_id)`
    enrollments: Vec<(String, String)>,
    tests: HashMap<String, TestDefinition>,
    test_sets: HashMap<(String, SetLabel), TestSet>,
    question_sets: HashMap<AttemptKey, AttemptQuestionSet>,
    attempts: Vec<Attempt>,
    submissions: Vec<Submission>,
    leaderboard: Vec<LeaderboardEntry>,
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_string())
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store lock")
    }

    pub(crate) fn add_question(&self, question: Question) {
        self.lock().questions.push(question);
    }

    pub(crate) fn questions(&self) -> Vec<Question> {
        self.lock().questions.clone()
    }

    pub(crate) fn enroll(&self, student_id: &str, batch_id: &str) {
        self.lock().enrollments.push((batch_id.to_string(), student_id.to_string()));
    }

    pub(crate) fn attempt_count(&self) -> usize {
        self.lock().attempts.len()
    }

    pub(crate) fn question_set_count(&self) -> usize {
        self.lock().question_sets.len()
    }

    /// Records a submission as-is, without touching attempts or the leaderboard.
    pub(crate) fn add_submission(&self, submission: Submission) {
        self.lock().submissions.push(submission);
    }

    pub(crate) fn submission_count(&self) -> usize {
        self.lock().submissions.len()
    }
}

#[async_trait]
impl ExamStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_questions(&self, filter: &QuestionFilter) -> StoreResult<Vec<Question>> {
        let mut found: Vec<Question> =
            self.lock().questions.iter().filter(|q| filter.matches(q)).cloned().collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn find_questions_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Question>> {
        Ok(self.lock().questions.iter().filter(|q| ids.contains(&q.id)).cloned().collect())
    }

    async fn batch_ids_for_student(&self, student_id: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .lock()
            .enrollments
            .iter()
            .filter(|(_, student)| student == student_id)
            .map(|(batch, _)| batch.clone())
            .collect())
    }

    async fn students_in_batches(&self, batch_ids: &[String]) -> StoreResult<Vec<String>> {
        let students: BTreeSet<String> = self
            .lock()
            .enrollments
            .iter()
            .filter(|(batch, _)| batch_ids.contains(batch))
            .map(|(_, student)| student.clone())
            .collect();
        Ok(students.into_iter().collect())
    }

    async fn create_test_definition(&self, test: &TestDefinition) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.tests.contains_key(&test.id) {
            return Err(unique("test_definitions_pkey"));
        }
        inner.tests.insert(test.id.clone(), test.clone());
        Ok(())
    }

    async fn find_test_definition(&self, test_id: &str) -> StoreResult<Option<TestDefinition>> {
        Ok(self.lock().tests.get(test_id).cloned())
    }

    async fn find_test_set(
        &self,
        test_id: &str,
        set_label: SetLabel,
    ) -> StoreResult<Option<TestSet>> {
        Ok(self.lock().test_sets.get(&(test_id.to_string(), set_label)).cloned())
    }

    async fn insert_test_set(&self, set: &TestSet) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        let key = (set.test_id.clone(), set.set_label);
        if inner.test_sets.contains_key(&key) {
            return Err(unique("uq_test_sets_test_label"));
        }
        inner.test_sets.insert(key, set.clone());
        Ok(())
    }

    async fn replace_test_set(&self, set: &TestSet) -> StoreResult<()> {
        self.lock().test_sets.insert((set.test_id.clone(), set.set_label), set.clone());
        Ok(())
    }

    async fn find_question_set(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<Option<AttemptQuestionSet>> {
        let key = (test_id.to_string(), student_id.to_string(), attempt_number);
        Ok(self.lock().question_sets.get(&key).cloned())
    }

    async fn insert_question_set(&self, set: &AttemptQuestionSet) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        let key = (set.test_id.clone(), set.student_id.clone(), set.attempt_number);
        if inner.question_sets.contains_key(&key) {
            return Err(unique("uq_attempt_question_sets_attempt"));
        }
        inner.question_sets.insert(key, set.clone());
        Ok(())
    }

    async fn delete_question_set(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<()> {
        let key = (test_id.to_string(), student_id.to_string(), attempt_number);
        self.lock().question_sets.remove(&key);
        Ok(())
    }

    async fn find_active_attempt(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Attempt>> {
        Ok(self
            .lock()
            .attempts
            .iter()
            .find(|a| {
                a.test_id == test_id
                    && a.student_id == student_id
                    && a.status == AttemptStatus::Started
            })
            .cloned())
    }

    async fn find_latest_attempt(
        &self,
        test_id: &str,
        student_id: &str,
    ) -> StoreResult<Option<Attempt>> {
        Ok(self
            .lock()
            .attempts
            .iter()
            .filter(|a| a.test_id == test_id && a.student_id == student_id)
            .max_by_key(|a| a.attempt_number)
            .cloned())
    }

    async fn max_attempt_number(&self, test_id: &str, student_id: &str) -> StoreResult<i32> {
        Ok(self
            .lock()
            .attempts
            .iter()
            .filter(|a| a.test_id == test_id && a.student_id == student_id)
            .map(|a| a.attempt_number)
            .max()
            .unwrap_or(0))
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<()> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();
        let same_student =
            |a: &&Attempt| a.test_id == attempt.test_id && a.student_id == attempt.student_id;

        if inner
            .attempts
            .iter()
            .filter(same_student)
            .any(|a| a.attempt_number == attempt.attempt_number)
        {
            return Err(unique("uq_attempts_test_student_number"));
        }
        if attempt.status == AttemptStatus::Started
            && inner.attempts.iter().filter(same_student).any(|a| a.status == AttemptStatus::Started)
        {
            return Err(unique("uq_attempts_one_started"));
        }

        inner.attempts.push(attempt.clone());
        Ok(())
    }

    async fn finalize_attempt(&self, submission: &Submission) -> StoreResult<FinalizeOutcome> {
        tokio::task::yield_now().await;
        let mut inner = self.lock();

        if inner.submissions.iter().any(|s| {
            s.test_id == submission.test_id
                && s.student_id == submission.student_id
                && s.attempt_number == submission.attempt_number
        }) {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        }

        let Some(attempt) = inner
            .attempts
            .iter_mut()
            .find(|a| a.id == submission.attempt_id && a.status == AttemptStatus::Started)
        else {
            return Ok(FinalizeOutcome::AlreadyFinalized);
        };

        attempt.status = AttemptStatus::Completed;
        attempt.answers = submission.answers.clone();
        attempt.score = Some(submission.score);
        attempt.time_taken_seconds = Some(submission.time_taken_seconds);
        attempt.completed_at = Some(submission.submitted_at);
        attempt.updated_at = submission.submitted_at;

        inner.submissions.push(submission.clone());
        Ok(FinalizeOutcome::Finalized)
    }

    async fn find_submission(
        &self,
        test_id: &str,
        student_id: &str,
        attempt_number: i32,
    ) -> StoreResult<Option<Submission>> {
        Ok(self
            .lock()
            .submissions
            .iter()
            .find(|s| {
                s.test_id == test_id
                    && s.student_id == student_id
                    && s.attempt_number == attempt_number
            })
            .cloned())
    }

    async fn list_submissions(&self, test_id: &str) -> StoreResult<Vec<Submission>> {
        let mut found: Vec<Submission> =
            self.lock().submissions.iter().filter(|s| s.test_id == test_id).cloned().collect();
        found.sort_by(|a, b| {
            a.student_id.cmp(&b.student_id).then(a.attempt_number.cmp(&b.attempt_number))
        });
        Ok(found)
    }

    async fn insert_leaderboard_entry(&self, entry: &LeaderboardEntry) -> StoreResult<bool> {
        let mut inner = self.lock();
        if inner
            .leaderboard
            .iter()
            .any(|e| e.test_id == entry.test_id && e.student_id == entry.student_id)
        {
            return Ok(false);
        }
        inner.leaderboard.push(entry.clone());
        Ok(true)
    }

    async fn list_leaderboard(&self, test_id: &str) -> StoreResult<Vec<LeaderboardEntry>> {
        let mut found: Vec<LeaderboardEntry> =
            self.lock().leaderboard.iter().filter(|e| e.test_id == test_id).cloned().collect();
        found.sort_by(|a, b| {
            b.score.cmp(&a.score).then(a.time_taken_seconds.cmp(&b.time_taken_seconds))
        });
        Ok(found)
    }
}
