use serde::Serialize;

/// Accuracy of a group of answers sharing a subject or topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct AccuracyBreakdown {
    pub(crate) key: String,
    pub(crate) total: u32,
    pub(crate) attempted: u32,
    pub(crate) correct: u32,
    pub(crate) score: i32,
    pub(crate) accuracy: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionReview {
    pub(crate) question_id: String,
    pub(crate) subject_id: Option<String>,
    pub(crate) topic_id: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) selected_option: Option<i32>,
    pub(crate) correct_option: Option<i32>,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: i32,
    pub(crate) explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptAnalysisResponse {
    pub(crate) test_id: String,
    pub(crate) attempt_number: i32,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) time_taken_seconds: i32,
    pub(crate) violations: i32,
    pub(crate) submitted_at: String,
    pub(crate) questions: Vec<QuestionReview>,
    pub(crate) subjects: Vec<AccuracyBreakdown>,
    pub(crate) topics: Vec<AccuracyBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct RankedEntry {
    pub(crate) rank: u32,
    pub(crate) student_id: String,
    pub(crate) batch_id: Option<String>,
    pub(crate) score: i32,
    pub(crate) time_taken_seconds: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestAnalyticsResponse {
    pub(crate) test_id: String,
    pub(crate) eligible_count: usize,
    pub(crate) attended_count: usize,
    pub(crate) absentees: Vec<String>,
    pub(crate) average_score: f64,
    pub(crate) highest_score: Option<i32>,
    pub(crate) lowest_score: Option<i32>,
    pub(crate) leaderboard: Vec<RankedEntry>,
    pub(crate) subjects: Vec<AccuracyBreakdown>,
}
