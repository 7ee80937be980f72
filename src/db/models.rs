use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    AttemptStatus, DifficultyLevel, Distribution, ExamType, SetLabel, TestMode,
};

/// One answer choice. Ingestion normalizes both plain-string and `{text, imageUrl}` option
/// shapes into this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionOption {
    #[serde(alias = "text")]
    pub(crate) label: String,
    #[serde(default, alias = "imageUrl")]
    pub(crate) image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) subject_id: String,
    pub(crate) chapter_id: String,
    pub(crate) topic_id: String,
    pub(crate) text: String,
    pub(crate) image_url: Option<String>,
    pub(crate) options: Json<Vec<QuestionOption>>,
    pub(crate) correct_option: i32,
    pub(crate) explanation: Option<String>,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) marks: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Percent of a section drawn from each difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct DifficultyMix {
    #[serde(default)]
    pub(crate) easy: u32,
    #[serde(default)]
    pub(crate) medium: u32,
    #[serde(default)]
    pub(crate) hard: u32,
}

impl DifficultyMix {
    pub(crate) fn percent(&self, level: DifficultyLevel) -> u32 {
        match level {
            DifficultyLevel::Easy => self.easy,
            DifficultyLevel::Medium => self.medium,
            DifficultyLevel::Hard => self.hard,
        }
    }

    /// `None` when the percentages overflow `u32`.
    pub(crate) fn checked_total(&self) -> Option<u32> {
        self.easy.checked_add(self.medium)?.checked_add(self.hard)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Section {
    pub(crate) subject_id: String,
    pub(crate) num_questions: u32,
    /// `None` samples across every difficulty.
    #[serde(default)]
    pub(crate) difficulty: Option<DifficultyMix>,
    #[serde(default)]
    pub(crate) chapter_ids: Vec<String>,
    #[serde(default)]
    pub(crate) topic_ids: Vec<String>,
    #[serde(default)]
    pub(crate) fixed_question_ids: Vec<String>,
}

/// Timing group: the sections listed share one countdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Block {
    pub(crate) name: String,
    pub(crate) section_indices: Vec<usize>,
    pub(crate) duration_minutes: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SubjectMarks {
    #[serde(default)]
    pub(crate) correct_marks: Option<i32>,
    #[serde(default)]
    pub(crate) negative_marks: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct MarkingScheme {
    #[serde(default)]
    pub(crate) negative_marking: bool,
    /// `None` awards each question its own `marks`.
    #[serde(default)]
    pub(crate) correct_marks: Option<i32>,
    #[serde(default)]
    pub(crate) negative_marks: i32,
    #[serde(default)]
    pub(crate) subject_overrides: HashMap<String, SubjectMarks>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestDefinition {
    pub(crate) id: String,
    pub(crate) institute_id: String,
    pub(crate) title: String,
    pub(crate) mode: TestMode,
    pub(crate) exam_type: ExamType,
    pub(crate) batch_ids: Json<Vec<String>>,
    pub(crate) sections: Json<Vec<Section>>,
    pub(crate) blocks: Json<Vec<Block>>,
    pub(crate) marking_scheme: Json<MarkingScheme>,
    pub(crate) distribution: Distribution,
    pub(crate) duration_minutes: i32,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: PrimitiveDateTime,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A materialized parallel paper (set A–D) of a test.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestSet {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) set_label: SetLabel,
    pub(crate) question_ids: Json<Vec<String>>,
    pub(crate) generation_seed: i64,
    pub(crate) created_at: PrimitiveDateTime,
}

/// The question list bound to one student's attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct AttemptQuestionSet {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) set_label: SetLabel,
    pub(crate) question_ids: Json<Vec<String>>,
    pub(crate) section_time_budgets: Json<BTreeMap<String, i64>>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_option: Option<i32>,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Attempt {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) assigned_set: SetLabel,
    pub(crate) status: AttemptStatus,
    pub(crate) answers: Json<Vec<GradedAnswer>>,
    pub(crate) score: Option<i32>,
    pub(crate) time_taken_seconds: Option<i32>,
    pub(crate) started_at: PrimitiveDateTime,
    pub(crate) completed_at: Option<PrimitiveDateTime>,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Write-once graded record of a finished attempt.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) answers: Json<Vec<GradedAnswer>>,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) time_taken_seconds: i32,
    pub(crate) violations: i32,
    pub(crate) submitted_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct LeaderboardEntry {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) batch_id: Option<String>,
    pub(crate) score: i32,
    pub(crate) time_taken_seconds: i32,
    pub(crate) created_at: PrimitiveDateTime,
}
