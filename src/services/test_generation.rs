use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

use crate::core::security::Claims;
use crate::core::time::primitive_now_utc;
use crate::db::models::{AttemptQuestionSet, TestDefinition, TestSet};
use crate::db::types::SetLabel;
use crate::repositories::{ExamStore, StoreError};
use crate::services::question_selection::{select_section, SectionShortfall};
use crate::services::timing::section_time_budgets;
use crate::services::{EngineError, EngineResult};

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GeneratedSetSummary {
    pub(crate) set_label: SetLabel,
    pub(crate) question_count: usize,
    pub(crate) generation_seed: i64,
    pub(crate) shortfalls: Vec<SectionShortfall>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerationReport {
    pub(crate) test_id: String,
    pub(crate) sets: Vec<GeneratedSetSummary>,
}

/// Loads a test the caller may see; tests of other institutes read as missing.
pub(crate) async fn load_test(
    store: &dyn ExamStore,
    user: &Claims,
    test_id: &str,
) -> EngineResult<TestDefinition> {
    store
        .find_test_definition(test_id)
        .await?
        .filter(|test| test.institute_id == user.institute_id)
        .ok_or(EngineError::NotFound("test"))
}

/// Loads a test owned by the calling teacher.
pub(crate) async fn load_owned_test(
    store: &dyn ExamStore,
    user: &Claims,
    test_id: &str,
) -> EngineResult<TestDefinition> {
    let test = load_test(store, user, test_id).await?;
    if test.created_by != user.sub {
        return Err(EngineError::Forbidden("Only the test author can do this"));
    }
    Ok(test)
}

/// Builds one parallel paper from a fresh seed.
pub(crate) async fn build_test_set(
    store: &dyn ExamStore,
    test: &TestDefinition,
    set_label: SetLabel,
) -> Result<(TestSet, Vec<SectionShortfall>), StoreError> {
    build_test_set_from_seed(store, test, set_label, rand::random()).await
}

/// Runs section selection over every section in order with an rng seeded from `seed`.
///
/// The seed is stored as `generation_seed`; rebuilding from it over an unchanged bank yields
/// the same question list.
pub(crate) async fn build_test_set_from_seed(
    store: &dyn ExamStore,
    test: &TestDefinition,
    set_label: SetLabel,
    seed: u64,
) -> Result<(TestSet, Vec<SectionShortfall>), StoreError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut taken = HashSet::new();
    let mut question_ids = Vec::new();
    let mut shortfalls = Vec::new();

    for (index, section) in test.sections.0.iter().enumerate() {
        let selection = select_section(store, &mut rng, index, section, &taken).await?;
        taken.extend(selection.question_ids.iter().cloned());
        question_ids.extend(selection.question_ids);
        shortfalls.extend(selection.shortfall);
    }

    tracing::info!(
        test_id = %test.id,
        set_label = set_label.as_str(),
        seed,
        questions = question_ids.len(),
        "test set generated"
    );

    let set = TestSet {
        id: Uuid::new_v4().to_string(),
        test_id: test.id.clone(),
        set_label,
        question_ids: Json(question_ids),
        generation_seed: seed as i64,
        created_at: primitive_now_utc(),
    };

    Ok((set, shortfalls))
}

/// Materializes every parallel set of a test, replacing earlier generations.
///
/// Attempts already bound keep their own copy of the question list.
pub(crate) async fn generate_test_sets(
    store: &dyn ExamStore,
    user: &Claims,
    test_id: &str,
) -> EngineResult<GenerationReport> {
    let test = load_owned_test(store, user, test_id).await?;

    let mut sets = Vec::new();
    for &label in test.distribution.set_labels() {
        let (set, shortfalls) = build_test_set(store, &test, label).await?;
        store.replace_test_set(&set).await?;
        sets.push(GeneratedSetSummary {
            set_label: label,
            question_count: set.question_ids.0.len(),
            generation_seed: set.generation_seed,
            shortfalls,
        });
    }

    Ok(GenerationReport { test_id: test.id, sets })
}

/// Returns the stored set, generating it first when no teacher ran generation.
pub(crate) async fn ensure_test_set(
    store: &dyn ExamStore,
    test: &TestDefinition,
    set_label: SetLabel,
) -> EngineResult<TestSet> {
    if let Some(set) = store.find_test_set(&test.id, set_label).await? {
        return Ok(set);
    }

    let (set, _) = build_test_set(store, test, set_label).await?;
    match store.insert_test_set(&set).await {
        Ok(()) => Ok(set),
        Err(StoreError::UniqueViolation(_)) => store
            .find_test_set(&test.id, set_label)
            .await?
            .ok_or(EngineError::NotFound("test set")),
        Err(err) => Err(err.into()),
    }
}

/// Binds the question list of one attempt, at most once per
/// `(test, student, attempt_number)`.
///
/// A caller that loses the insert race re-reads and returns the winner's list.
pub(crate) async fn bind_question_set(
    store: &dyn ExamStore,
    test: &TestDefinition,
    student_id: &str,
    attempt_number: i32,
    set_label: SetLabel,
) -> EngineResult<AttemptQuestionSet> {
    if let Some(existing) = store.find_question_set(&test.id, student_id, attempt_number).await? {
        return Ok(existing);
    }

    let source = ensure_test_set(store, test, set_label).await?;
    let bound = AttemptQuestionSet {
        id: Uuid::new_v4().to_string(),
        test_id: test.id.clone(),
        student_id: student_id.to_string(),
        attempt_number,
        set_label,
        question_ids: source.question_ids,
        section_time_budgets: Json(section_time_budgets(test)),
        created_at: primitive_now_utc(),
    };

    match store.insert_question_set(&bound).await {
        Ok(()) => Ok(bound),
        Err(StoreError::UniqueViolation(_)) => {
            tracing::debug!(
                test_id = %test.id,
                student_id,
                attempt_number,
                "question set bound concurrently, re-reading"
            );
            store
                .find_question_set(&test.id, student_id, attempt_number)
                .await?
                .ok_or(EngineError::NotFound("question set"))
        }
        Err(err) => Err(err.into()),
    }
}
