use std::borrow::Cow;
use std::collections::HashSet;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use validator::{Validate, ValidationError};

use crate::core::time::format_primitive;
use crate::db::models::{Block, MarkingScheme, Section, TestDefinition};
use crate::db::types::{Distribution, ExamType, TestMode};
use crate::services::timing::validate_blocks;

#[derive(Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_structure"))]
pub(crate) struct TestDefinitionCreate {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub(crate) title: String,
    #[serde(default = "default_mode")]
    pub(crate) mode: TestMode,
    #[serde(alias = "examType")]
    pub(crate) exam_type: ExamType,
    #[serde(alias = "batchIds")]
    #[validate(length(min = 1, message = "at least one batch is required"))]
    pub(crate) batch_ids: Vec<String>,
    #[validate(length(min = 1, message = "at least one section is required"))]
    pub(crate) sections: Vec<Section>,
    #[serde(default)]
    pub(crate) blocks: Vec<Block>,
    /// Derived from `exam_type` when omitted.
    #[serde(default, alias = "markingScheme")]
    pub(crate) marking_scheme: Option<MarkingScheme>,
    #[serde(default = "default_distribution")]
    pub(crate) distribution: Distribution,
    #[serde(alias = "durationMinutes")]
    #[validate(range(min = 1, message = "duration_minutes must be positive"))]
    pub(crate) duration_minutes: i32,
    #[serde(default, alias = "maxAttempts")]
    #[validate(range(min = 1, message = "max_attempts must be positive"))]
    pub(crate) max_attempts: Option<i32>,
    #[serde(alias = "startTime", deserialize_with = "deserialize_datetime")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_datetime")]
    pub(crate) end_time: OffsetDateTime,
}

fn invalid(message: String) -> ValidationError {
    ValidationError::new("test_structure").with_message(Cow::Owned(message))
}

fn validate_structure(payload: &TestDefinitionCreate) -> Result<(), ValidationError> {
    if payload.end_time <= payload.start_time {
        return Err(invalid("end_time must be after start_time".to_string()));
    }

    for (index, section) in payload.sections.iter().enumerate() {
        if section.subject_id.trim().is_empty() {
            return Err(invalid(format!("section {index} needs a subject_id")));
        }
        if section.num_questions == 0 {
            return Err(invalid(format!("section {index} must request at least one question")));
        }
        if let Some(mix) = &section.difficulty {
            if [mix.easy, mix.medium, mix.hard].iter().any(|&percent| percent > 100) {
                return Err(invalid(format!(
                    "section {index} difficulty percentages must each be at most 100"
                )));
            }
            match mix.checked_total() {
                Some(100) => {}
                total => {
                    return Err(invalid(format!(
                        "section {index} difficulty percentages must sum to 100, got {}",
                        total.unwrap_or(u32::MAX)
                    )));
                }
            }
        }

        let unique: HashSet<&String> = section.fixed_question_ids.iter().collect();
        if unique.len() != section.fixed_question_ids.len() {
            return Err(invalid(format!("section {index} repeats a fixed question")));
        }
        if unique.len() > section.num_questions as usize {
            return Err(invalid(format!(
                "section {index} has more fixed questions than num_questions"
            )));
        }
    }

    if let Some(scheme) = &payload.marking_scheme {
        validate_marking(scheme).map_err(invalid)?;
    }

    validate_blocks(payload.sections.len(), &payload.blocks).map_err(invalid)
}

/// Upper bound on any per-question award or deduction.
const MAX_MARKS: i32 = 100;

fn check_marks(label: &str, value: i32) -> Result<(), String> {
    if (0..=MAX_MARKS).contains(&value) {
        Ok(())
    } else {
        Err(format!("{label} must be between 0 and {MAX_MARKS}, got {value}"))
    }
}

fn validate_marking(scheme: &MarkingScheme) -> Result<(), String> {
    if let Some(marks) = scheme.correct_marks {
        check_marks("correct_marks", marks)?;
    }
    check_marks("negative_marks", scheme.negative_marks)?;

    for (subject, marks) in &scheme.subject_overrides {
        if let Some(value) = marks.correct_marks {
            check_marks(&format!("{subject} correct_marks"), value)?;
        }
        if let Some(value) = marks.negative_marks {
            check_marks(&format!("{subject} negative_marks"), value)?;
        }
    }
    Ok(())
}

fn default_mode() -> TestMode {
    TestMode::Bank
}

fn default_distribution() -> Distribution {
    Distribution::SingleSet
}

fn deserialize_datetime<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(value) = OffsetDateTime::parse(&raw, &Rfc3339) {
        return Ok(value);
    }

    // Zone-less input is taken as UTC.
    OffsetDateTime::parse(&format!("{raw}Z"), &Rfc3339)
        .map_err(|_| D::Error::custom(format!("invalid datetime: {raw}")))
}

#[derive(Debug, Serialize)]
pub(crate) struct TestDefinitionResponse {
    pub(crate) id: String,
    pub(crate) institute_id: String,
    pub(crate) title: String,
    pub(crate) mode: TestMode,
    pub(crate) exam_type: ExamType,
    pub(crate) batch_ids: Vec<String>,
    pub(crate) sections: Vec<Section>,
    pub(crate) blocks: Vec<Block>,
    pub(crate) marking_scheme: MarkingScheme,
    pub(crate) distribution: Distribution,
    pub(crate) duration_minutes: i32,
    pub(crate) max_attempts: Option<i32>,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<TestDefinition> for TestDefinitionResponse {
    fn from(test: TestDefinition) -> Self {
        Self {
            id: test.id,
            institute_id: test.institute_id,
            title: test.title,
            mode: test.mode,
            exam_type: test.exam_type,
            batch_ids: test.batch_ids.0,
            sections: test.sections.0,
            blocks: test.blocks.0,
            marking_scheme: test.marking_scheme.0,
            distribution: test.distribution,
            duration_minutes: test.duration_minutes,
            max_attempts: test.max_attempts,
            start_time: format_primitive(test.start_time),
            end_time: format_primitive(test.end_time),
            created_by: test.created_by,
            created_at: format_primitive(test.created_at),
            updated_at: format_primitive(test.updated_at),
        }
    }
}
