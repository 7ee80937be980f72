use std::collections::HashMap;

use crate::db::models::{GradedAnswer, MarkingScheme, Question, SubjectMarks};
use crate::db::types::ExamType;

/// Scheme applied when a test is created without one.
pub(crate) fn default_scheme(exam_type: ExamType) -> MarkingScheme {
    match exam_type {
        ExamType::Jee | ExamType::Neet => MarkingScheme {
            negative_marking: true,
            correct_marks: Some(4),
            negative_marks: 1,
            subject_overrides: HashMap::new(),
        },
        ExamType::Pcm | ExamType::Pcb => MarkingScheme {
            negative_marking: false,
            correct_marks: Some(1),
            negative_marks: 0,
            subject_overrides: HashMap::new(),
        },
        ExamType::Other => MarkingScheme::default(),
    }
}

fn subject_marks<'a>(scheme: &'a MarkingScheme, subject_id: &str) -> Option<&'a SubjectMarks> {
    scheme.subject_overrides.get(subject_id)
}

/// Marks for a correct answer: subject override, then scheme default, then the question's own.
pub(crate) fn correct_marks(scheme: &MarkingScheme, question: &Question) -> i32 {
    subject_marks(scheme, &question.subject_id)
        .and_then(|marks| marks.correct_marks)
        .or(scheme.correct_marks)
        .unwrap_or(question.marks)
}

/// Magnitude deducted for a wrong attempted answer; zero when negative marking is off.
pub(crate) fn negative_marks(scheme: &MarkingScheme, question: &Question) -> i32 {
    if !scheme.negative_marking {
        return 0;
    }

    subject_marks(scheme, &question.subject_id)
        .and_then(|marks| marks.negative_marks)
        .unwrap_or(scheme.negative_marks)
        .saturating_abs()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradeReport {
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) correct: u32,
    pub(crate) incorrect: u32,
    pub(crate) unattempted: u32,
}

/// Grades `selections` (question id to chosen option) against the bound question list.
///
/// Only ids in `bound_ids` are graded, in that order; selections for other ids are ignored.
/// Correctness comes from the stored answer key, never from the client.
pub(crate) fn grade(
    scheme: &MarkingScheme,
    bound_ids: &[String],
    questions: &HashMap<String, Question>,
    selections: &HashMap<String, i32>,
) -> GradeReport {
    let mut report = GradeReport {
        answers: Vec::with_capacity(bound_ids.len()),
        score: 0,
        max_score: 0,
        correct: 0,
        incorrect: 0,
        unattempted: 0,
    };

    for question_id in bound_ids {
        let selected_option = selections.get(question_id).copied();

        let Some(question) = questions.get(question_id) else {
            tracing::warn!(question_id = %question_id, "bound question missing from bank");
            report.unattempted += 1;
            report.answers.push(GradedAnswer {
                question_id: question_id.clone(),
                selected_option,
                is_correct: false,
                marks_awarded: 0,
            });
            continue;
        };

        report.max_score = report.max_score.saturating_add(correct_marks(scheme, question));

        let (is_correct, marks_awarded) = match selected_option {
            None => {
                report.unattempted += 1;
                (false, 0)
            }
            Some(option) if option == question.correct_option => {
                report.correct += 1;
                (true, correct_marks(scheme, question))
            }
            Some(_) => {
                report.incorrect += 1;
                (false, -negative_marks(scheme, question))
            }
        };

        report.score = report.score.saturating_add(marks_awarded);
        report.answers.push(GradedAnswer {
            question_id: question_id.clone(),
            selected_option,
            is_correct,
            marks_awarded,
        });
    }

    report
}
