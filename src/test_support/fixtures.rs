use sqlx::types::Json;
use time::Duration;

use crate::core::security::Claims;
use crate::core::time::primitive_now_utc;
use crate::db::models::{MarkingScheme, Question, QuestionOption, Section, TestDefinition};
use crate::db::types::{DifficultyLevel, Distribution, ExamType, TestMode, UserRole};

pub(crate) const INSTITUTE_ID: &str = "inst-1";
pub(crate) const BATCH_ID: &str = "batch-1";

pub(crate) fn claims(sub: &str, role: UserRole) -> Claims {
    Claims {
        sub: sub.to_string(),
        role,
        institute_id: INSTITUTE_ID.to_string(),
        exp: (time::OffsetDateTime::now_utc() + Duration::hours(1)).unix_timestamp(),
    }
}

/// Four options, answer key 0, one mark.
pub(crate) fn question(id: &str, subject_id: &str, difficulty: DifficultyLevel) -> Question {
    Question {
        id: id.to_string(),
        subject_id: subject_id.to_string(),
        chapter_id: format!("{subject_id}-chapter"),
        topic_id: format!("{subject_id}-topic"),
        text: format!("Question {id}"),
        image_url: None,
        options: Json(
            ["A", "B", "C", "D"]
                .iter()
                .map(|label| QuestionOption { label: label.to_string(), image_url: None })
                .collect(),
        ),
        correct_option: 0,
        explanation: Some(format!("Explanation for {id}")),
        difficulty,
        marks: 1,
        created_at: primitive_now_utc(),
    }
}

pub(crate) fn section(subject_id: &str, num_questions: u32) -> Section {
    Section {
        subject_id: subject_id.to_string(),
        num_questions,
        difficulty: None,
        chapter_ids: Vec::new(),
        topic_ids: Vec::new(),
        fixed_question_ids: Vec::new(),
    }
}

/// An open, single-set, sixty-minute test for `BATCH_ID` without negative marking.
pub(crate) fn test_definition(created_by: &str, sections: Vec<Section>) -> TestDefinition {
    let now = primitive_now_utc();
    TestDefinition {
        id: uuid::Uuid::new_v4().to_string(),
        institute_id: INSTITUTE_ID.to_string(),
        title: "Mock test".to_string(),
        mode: TestMode::Bank,
        exam_type: ExamType::Other,
        batch_ids: Json(vec![BATCH_ID.to_string()]),
        sections: Json(sections),
        blocks: Json(Vec::new()),
        marking_scheme: Json(MarkingScheme::default()),
        distribution: Distribution::SingleSet,
        duration_minutes: 60,
        max_attempts: None,
        start_time: now - Duration::hours(1),
        end_time: now + Duration::hours(2),
        created_by: created_by.to_string(),
        created_at: now,
        updated_at: now,
    }
}
