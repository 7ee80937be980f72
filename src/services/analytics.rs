use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::core::security::Claims;
use crate::core::time::format_primitive;
use crate::db::models::{GradedAnswer, LeaderboardEntry, Question, Submission};
use crate::repositories::ExamStore;
use crate::schemas::analytics::{
    AccuracyBreakdown, AttemptAnalysisResponse, QuestionReview, RankedEntry,
    TestAnalyticsResponse,
};
use crate::services::test_generation::{load_owned_test, load_test};
use crate::services::{EngineError, EngineResult};

#[derive(Default)]
struct Tally {
    total: u32,
    attempted: u32,
    correct: u32,
    score: i32,
}

/// Groups graded answers by `key_of(question)` and reports `correct / total` per group.
///
/// Answers whose question is no longer in the bank are skipped.
pub(crate) fn breakdown<'a, F>(
    answers: impl IntoIterator<Item = &'a GradedAnswer>,
    questions: &HashMap<String, Question>,
    key_of: F,
) -> Vec<AccuracyBreakdown>
where
    F: Fn(&Question) -> &str,
{
    let mut groups: BTreeMap<String, Tally> = BTreeMap::new();
    for answer in answers {
        let Some(question) = questions.get(&answer.question_id) else {
            continue;
        };
        let tally = groups.entry(key_of(question).to_string()).or_default();
        tally.total += 1;
        tally.attempted += u32::from(answer.selected_option.is_some());
        tally.correct += u32::from(answer.is_correct);
        tally.score = tally.score.saturating_add(answer.marks_awarded);
    }

    groups
        .into_iter()
        .map(|(key, tally)| AccuracyBreakdown {
            key,
            total: tally.total,
            attempted: tally.attempted,
            correct: tally.correct,
            score: tally.score,
            accuracy: ratio(tally.correct, tally.total),
        })
        .collect()
}

fn ratio(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        f64::from(part) / f64::from(whole)
    }
}

/// Orders by score descending then time ascending; identical results share a rank.
pub(crate) fn rank_entries(mut entries: Vec<LeaderboardEntry>) -> Vec<RankedEntry> {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.time_taken_seconds.cmp(&b.time_taken_seconds))
            .then(a.student_id.cmp(&b.student_id))
    });

    let mut ranked: Vec<RankedEntry> = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        let rank = match ranked.last() {
            Some(prev)
                if prev.score == entry.score
                    && prev.time_taken_seconds == entry.time_taken_seconds =>
            {
                prev.rank
            }
            _ => position as u32 + 1,
        };
        ranked.push(RankedEntry {
            rank,
            student_id: entry.student_id,
            batch_id: entry.batch_id,
            score: entry.score,
            time_taken_seconds: entry.time_taken_seconds,
        });
    }
    ranked
}

/// Mean score, zero when nobody attended.
pub(crate) fn average_score(scores: &[i32]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&score| f64::from(score)).sum::<f64>() / scores.len() as f64
}

async fn question_index(
    store: &dyn ExamStore,
    ids: Vec<String>,
) -> EngineResult<HashMap<String, Question>> {
    Ok(store
        .find_questions_by_ids(&ids)
        .await?
        .into_iter()
        .map(|question| (question.id.clone(), question))
        .collect())
}

/// Per-question review of the caller's own scored attempt.
pub(crate) async fn attempt_analysis(
    store: &dyn ExamStore,
    user: &Claims,
    test_id: &str,
    attempt_number: i32,
) -> EngineResult<AttemptAnalysisResponse> {
    let test = load_test(store, user, test_id).await?;
    let submission = store
        .find_submission(&test.id, &user.sub, attempt_number)
        .await?
        .ok_or(EngineError::NotFound("submission"))?;

    let ids = submission.answers.0.iter().map(|answer| answer.question_id.clone()).collect();
    let questions = question_index(store, ids).await?;

    let reviews = submission
        .answers
        .0
        .iter()
        .map(|answer| {
            let question = questions.get(&answer.question_id);
            QuestionReview {
                question_id: answer.question_id.clone(),
                subject_id: question.map(|q| q.subject_id.clone()),
                topic_id: question.map(|q| q.topic_id.clone()),
                text: question.map(|q| q.text.clone()),
                selected_option: answer.selected_option,
                correct_option: question.map(|q| q.correct_option),
                is_correct: answer.is_correct,
                marks_awarded: answer.marks_awarded,
                explanation: question.and_then(|q| q.explanation.clone()),
            }
        })
        .collect();

    Ok(AttemptAnalysisResponse {
        test_id: test.id,
        attempt_number: submission.attempt_number,
        score: submission.score,
        max_score: submission.max_score,
        time_taken_seconds: submission.time_taken_seconds,
        violations: submission.violations,
        submitted_at: format_primitive(submission.submitted_at),
        questions: reviews,
        subjects: breakdown(&submission.answers.0, &questions, |q| q.subject_id.as_str()),
        topics: breakdown(&submission.answers.0, &questions, |q| q.topic_id.as_str()),
    })
}

/// Cohort view of a test for its author.
pub(crate) async fn test_analytics(
    store: &dyn ExamStore,
    user: &Claims,
    test_id: &str,
) -> EngineResult<TestAnalyticsResponse> {
    let test = load_owned_test(store, user, test_id).await?;

    let eligible: BTreeSet<String> =
        store.students_in_batches(&test.batch_ids.0).await?.into_iter().collect();
    let submissions = store.list_submissions(&test.id).await?;
    let attended: BTreeSet<String> =
        submissions.iter().map(|submission| submission.student_id.clone()).collect();
    let absentees: Vec<String> = eligible.difference(&attended).cloned().collect();

    let leaderboard = rank_entries(store.list_leaderboard(&test.id).await?);

    // Every attendee has a first attempt, so these cover the same cohort as `attended`.
    let first_submissions: Vec<&Submission> =
        submissions.iter().filter(|submission| submission.attempt_number == 1).collect();
    let scores: Vec<i32> = first_submissions.iter().map(|submission| submission.score).collect();
    let first_attempts: Vec<&GradedAnswer> =
        first_submissions.iter().flat_map(|submission| submission.answers.0.iter()).collect();
    let ids: BTreeSet<String> =
        first_attempts.iter().map(|answer| answer.question_id.clone()).collect();
    let questions = question_index(store, ids.into_iter().collect()).await?;

    Ok(TestAnalyticsResponse {
        test_id: test.id,
        eligible_count: eligible.len(),
        attended_count: attended.len(),
        absentees,
        average_score: average_score(&scores),
        highest_score: scores.iter().copied().max(),
        lowest_score: scores.iter().copied().min(),
        leaderboard,
        subjects: breakdown(first_attempts, &questions, |q| q.subject_id.as_str()),
    })
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;

    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::db::types::{DifficultyLevel, UserRole};
    use crate::test_support::fixtures;
    use crate::test_support::memory::MemoryStore;

    fn entry(student: &str, score: i32, time: i32) -> LeaderboardEntry {
        LeaderboardEntry {
            id: format!("lb-{student}"),
            test_id: "test-1".to_string(),
            student_id: student.to_string(),
            batch_id: None,
            score,
            time_taken_seconds: time,
            created_at: primitive_now_utc(),
        }
    }

    fn graded(id: &str, selected: Option<i32>, is_correct: bool, marks: i32) -> GradedAnswer {
        GradedAnswer {
            question_id: id.to_string(),
            selected_option: selected,
            is_correct,
            marks_awarded: marks,
        }
    }

    #[test]
    fn ranking_orders_by_score_then_time_with_shared_ranks() {
        let ranked = rank_entries(vec![
            entry("slow", 10, 900),
            entry("fast", 10, 300),
            entry("low", 4, 100),
            entry("twin", 10, 300),
        ]);

        let order: Vec<(&str, u32)> =
            ranked.iter().map(|e| (e.student_id.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("fast", 1), ("twin", 1), ("slow", 3), ("low", 4)]);
    }

    fn submission(student: &str, attempt_number: i32, score: i32) -> Submission {
        Submission {
            id: format!("sub-{student}-{attempt_number}"),
            attempt_id: format!("att-{student}-{attempt_number}"),
            test_id: String::new(),
            student_id: student.to_string(),
            attempt_number,
            answers: Json(vec![graded("p1", Some(0), score > 0, score)]),
            score,
            max_score: 10,
            time_taken_seconds: 300,
            violations: 0,
            submitted_at: primitive_now_utc(),
        }
    }

    #[tokio::test]
    async fn cohort_scores_follow_first_attempt_submissions() {
        let store = MemoryStore::default();
        store.add_question(fixtures::question("p1", "physics", DifficultyLevel::Easy));
        for student in ["student-1", "student-2", "student-3"] {
            store.enroll(student, fixtures::BATCH_ID);
        }
        let test = fixtures::test_definition("teacher-1", vec![fixtures::section("physics", 1)]);
        store.create_test_definition(&test).await.expect("test");

        // student-2 has no leaderboard row; student-1's retake must not count.
        for (student, attempt_number, score) in
            [("student-1", 1, 6), ("student-2", 1, 2), ("student-1", 2, 10)]
        {
            let mut sub = submission(student, attempt_number, score);
            sub.test_id = test.id.clone();
            store.add_submission(sub);
        }
        let mut first = entry("student-1", 6, 300);
        first.test_id = test.id.clone();
        store.insert_leaderboard_entry(&first).await.expect("leaderboard");

        let teacher = fixtures::claims("teacher-1", UserRole::Teacher);
        let report = test_analytics(&store, &teacher, &test.id).await.expect("analytics");

        assert_eq!(report.attended_count, 2);
        assert_eq!(report.absentees, vec!["student-3".to_string()]);
        assert_eq!(report.average_score, 4.0);
        assert_eq!(report.highest_score, Some(6));
        assert_eq!(report.lowest_score, Some(2));
        assert_eq!(report.leaderboard.len(), 1);
        assert_eq!(report.subjects[0].total, 2);
    }

    #[test]
    fn average_guards_empty_cohort() {
        assert_eq!(average_score(&[]), 0.0);
        assert_eq!(average_score(&[3, 4, 5]), 4.0);
    }

    #[test]
    fn breakdown_groups_by_subject() {
        let mut chem = fixtures::question("c1", "chemistry", DifficultyLevel::Easy);
        chem.topic_id = "organic".to_string();
        let questions: HashMap<String, Question> = [
            fixtures::question("p1", "physics", DifficultyLevel::Easy),
            fixtures::question("p2", "physics", DifficultyLevel::Hard),
            chem,
        ]
        .into_iter()
        .map(|q| (q.id.clone(), q))
        .collect();
        let answers = vec![
            graded("p1", Some(0), true, 4),
            graded("p2", Some(1), false, -1),
            graded("c1", None, false, 0),
            graded("deleted", Some(0), true, 4),
        ];

        let subjects = breakdown(&answers, &questions, |q| q.subject_id.as_str());

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].key, "chemistry");
        assert_eq!(subjects[0].attempted, 0);
        assert_eq!(subjects[0].accuracy, 0.0);
        assert_eq!(subjects[1].key, "physics");
        assert_eq!(subjects[1].total, 2);
        assert_eq!(subjects[1].correct, 1);
        assert_eq!(subjects[1].score, 3);
        assert_eq!(subjects[1].accuracy, 0.5);
    }
}
