use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Question, QuestionOption};
use crate::db::types::{AttemptStatus, SetLabel};
use crate::services::attempts::{StartedAttempt, SubmitInput, SubmitOutcome};

/// A question as shown during an attempt. Carries no answer key.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestion {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) chapter_id: String,
    pub(crate) topic_id: String,
    pub(crate) text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) options: Vec<QuestionOption>,
    pub(crate) marks: i32,
}

impl From<Question> for StudentQuestion {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            subject_id: question.subject_id,
            chapter_id: question.chapter_id,
            topic_id: question.topic_id,
            text: question.text,
            image_url: question.image_url,
            options: question.options.0,
            marks: question.marks,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StartAttemptResponse {
    pub(crate) test_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) set_label: SetLabel,
    pub(crate) status: AttemptStatus,
    pub(crate) resumed: bool,
    pub(crate) started_at: String,
    pub(crate) section_time_budgets: BTreeMap<String, i64>,
    pub(crate) questions: Vec<StudentQuestion>,
}

impl From<StartedAttempt> for StartAttemptResponse {
    fn from(started: StartedAttempt) -> Self {
        Self {
            test_id: started.attempt.test_id,
            attempt_number: started.attempt.attempt_number,
            set_label: started.attempt.assigned_set,
            status: started.attempt.status,
            resumed: started.resumed,
            started_at: format_primitive(started.attempt.started_at),
            section_time_budgets: started.question_set.section_time_budgets.0,
            questions: started.questions.into_iter().map(StudentQuestion::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSubmission {
    #[serde(alias = "questionId")]
    pub(crate) question_id: String,
    #[serde(default, alias = "selectedOption")]
    pub(crate) selected_option: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmitAttemptRequest {
    #[serde(default)]
    pub(crate) answers: Vec<AnswerSubmission>,
    #[serde(alias = "timeTaken")]
    #[validate(range(min = 0, message = "time_taken must be non-negative"))]
    pub(crate) time_taken: i32,
    #[serde(default)]
    #[validate(range(min = 0, message = "violations must be non-negative"))]
    pub(crate) violations: i32,
}

impl From<SubmitAttemptRequest> for SubmitInput {
    /// Later entries for the same question win; null selections count as unanswered.
    fn from(request: SubmitAttemptRequest) -> Self {
        let mut selections = HashMap::new();
        for answer in request.answers {
            match answer.selected_option {
                Some(option) => {
                    selections.insert(answer.question_id, option);
                }
                None => {
                    selections.remove(&answer.question_id);
                }
            }
        }

        Self {
            selections,
            time_taken_seconds: request.time_taken,
            violations: request.violations,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitAttemptResponse {
    pub(crate) test_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) correct: u32,
    pub(crate) incorrect: u32,
    pub(crate) unattempted: u32,
}

impl SubmitAttemptResponse {
    pub(crate) fn new(test_id: String, outcome: SubmitOutcome) -> Self {
        Self {
            test_id,
            attempt_number: outcome.attempt_number,
            score: outcome.report.score,
            max_score: outcome.report.max_score,
            correct: outcome.report.correct,
            incorrect: outcome.report.incorrect,
            unattempted: outcome.report.unattempted,
        }
    }
}
