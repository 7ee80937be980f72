use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::core::metrics::QUESTION_SHORTFALL;
use crate::db::models::{DifficultyMix, Section};
use crate::db::types::DifficultyLevel;
use crate::repositories::{ExamStore, QuestionFilter, StoreError};

/// A section that came out shorter than requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SectionShortfall {
    pub(crate) section_index: usize,
    pub(crate) subject_id: String,
    pub(crate) requested: u32,
    pub(crate) selected: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct SectionSelection {
    pub(crate) question_ids: Vec<String>,
    pub(crate) shortfall: Option<SectionShortfall>,
}

/// Per-tier targets, `round(percent / 100 * num_questions)` each, capped by `slots` in
/// easy, medium, hard order.
pub(crate) fn tier_targets(
    mix: &DifficultyMix,
    num_questions: u32,
    slots: u32,
) -> Vec<(DifficultyLevel, u32)> {
    let mut remaining = slots;
    DifficultyLevel::TIERS
        .iter()
        .map(|&level| {
            let wanted = mix.percent(level).saturating_mul(num_questions).saturating_add(50) / 100;
            let target = wanted.min(remaining);
            remaining -= target;
            (level, target)
        })
        .collect()
}

fn base_filter(section: &Section, exclude_ids: Vec<String>) -> QuestionFilter {
    QuestionFilter {
        subject_id: section.subject_id.clone(),
        difficulty: None,
        chapter_ids: section.chapter_ids.clone(),
        topic_ids: section.topic_ids.clone(),
        exclude_ids,
    }
}

/// Picks the questions of one section.
///
/// Fixed questions come first and count toward `num_questions`. Each difficulty tier is then
/// sampled up to its target, and any remaining slots are backfilled from every tier. Ids in
/// `taken` (earlier sections) are never picked again. A short bank yields a shorter section.
///
/// Every random choice goes through `rng`, so a fixed seed over an unchanged bank reproduces
/// the selection.
pub(crate) async fn select_section(
    store: &dyn ExamStore,
    rng: &mut StdRng,
    section_index: usize,
    section: &Section,
    taken: &HashSet<String>,
) -> Result<SectionSelection, StoreError> {
    let requested = section.num_questions;
    let mut picked: Vec<String> = Vec::with_capacity(requested as usize);
    let mut seen: HashSet<String> = taken.clone();

    if !section.fixed_question_ids.is_empty() {
        let found: HashSet<String> = store
            .find_questions_by_ids(&section.fixed_question_ids)
            .await?
            .into_iter()
            .map(|question| question.id)
            .collect();

        for id in &section.fixed_question_ids {
            if picked.len() as u32 >= requested {
                break;
            }
            if !found.contains(id) {
                tracing::warn!(section_index, question_id = %id, "fixed question not in bank");
                continue;
            }
            if seen.insert(id.clone()) {
                picked.push(id.clone());
            }
        }
    }

    let slots = requested.saturating_sub(picked.len() as u32);
    let targets = match &section.difficulty {
        Some(mix) => tier_targets(mix, requested, slots),
        None => Vec::new(),
    };

    for (level, target) in targets {
        if target == 0 {
            continue;
        }
        let mut filter = base_filter(section, seen.iter().cloned().collect());
        filter.difficulty = Some(level);

        let drawn = store.sample_questions(&filter, target, rng).await?;
        if (drawn.len() as u32) < target {
            tracing::debug!(
                section_index,
                tier = level.as_str(),
                target,
                drawn = drawn.len(),
                "difficulty tier short, backfilling"
            );
        }
        for question in drawn {
            if seen.insert(question.id.clone()) {
                picked.push(question.id);
            }
        }
    }

    let missing = requested.saturating_sub(picked.len() as u32);
    if missing > 0 {
        let filter = base_filter(section, seen.iter().cloned().collect());
        let mut pool = store.find_questions(&filter).await?;
        pool.shuffle(rng);

        for question in pool.into_iter().take(missing as usize) {
            if seen.insert(question.id.clone()) {
                picked.push(question.id);
            }
        }
    }

    picked.shuffle(rng);

    let selected = picked.len() as u32;
    let shortfall = (selected < requested).then(|| {
        tracing::warn!(
            section_index,
            subject_id = %section.subject_id,
            requested,
            selected,
            "question bank short for section"
        );
        metrics::counter!(QUESTION_SHORTFALL).increment(1);
        SectionShortfall {
            section_index,
            subject_id: section.subject_id.clone(),
            requested,
            selected,
        }
    });

    Ok(SectionSelection { question_ids: picked, shortfall })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::collections::HashMap;

    use crate::test_support::fixtures;
    use crate::test_support::memory::MemoryStore;

    fn tier_counts(
        ids: &[String],
        difficulty_of: &HashMap<String, DifficultyLevel>,
    ) -> HashMap<DifficultyLevel, u32> {
        let mut counts = HashMap::new();
        for id in ids {
            if let Some(level) = difficulty_of.get(id) {
                *counts.entry(*level).or_insert(0) += 1;
            }
        }
        counts
    }

    fn stocked_store(subject: &str, easy: usize, medium: usize, hard: usize) -> MemoryStore {
        let store = MemoryStore::default();
        for (level, count) in [
            (DifficultyLevel::Easy, easy),
            (DifficultyLevel::Medium, medium),
            (DifficultyLevel::Hard, hard),
        ] {
            for n in 0..count {
                store.add_question(fixtures::question(
                    &format!("{subject}-{}-{n}", level.as_str()),
                    subject,
                    level,
                ));
            }
        }
        store
    }

    fn difficulty_index(store: &MemoryStore) -> HashMap<String, DifficultyLevel> {
        store.questions().into_iter().map(|q| (q.id, q.difficulty)).collect()
    }

    fn mixed_section(subject: &str, num: u32, easy: u32, medium: u32, hard: u32) -> Section {
        let mut section = fixtures::section(subject, num);
        section.difficulty = Some(DifficultyMix { easy, medium, hard });
        section
    }

    #[test]
    fn tier_targets_round_and_cap() {
        let mix = DifficultyMix { easy: 50, medium: 30, hard: 20 };
        assert_eq!(
            tier_targets(&mix, 20, 20),
            vec![(DifficultyLevel::Easy, 10), (DifficultyLevel::Medium, 6), (DifficultyLevel::Hard, 4)]
        );

        let thirds = DifficultyMix { easy: 34, medium: 33, hard: 33 };
        let total: u32 = tier_targets(&thirds, 10, 10).iter().map(|(_, n)| n).sum();
        assert!(total <= 10);

        assert_eq!(
            tier_targets(&mix, 20, 12),
            vec![(DifficultyLevel::Easy, 10), (DifficultyLevel::Medium, 2), (DifficultyLevel::Hard, 0)]
        );
    }

    #[tokio::test]
    async fn stocked_section_matches_difficulty_mix() {
        let store = stocked_store("physics", 30, 30, 30);
        let section = mixed_section("physics", 20, 50, 30, 20);
        let mut rng = StdRng::seed_from_u64(7);

        let selection = select_section(&store, &mut rng, 0, &section, &HashSet::new())
            .await
            .expect("selection");

        assert_eq!(selection.question_ids.len(), 20);
        assert!(selection.shortfall.is_none());
        let unique: HashSet<_> = selection.question_ids.iter().collect();
        assert_eq!(unique.len(), 20);

        let counts = tier_counts(&selection.question_ids, &difficulty_index(&store));
        assert_eq!(counts.get(&DifficultyLevel::Easy), Some(&10));
        assert_eq!(counts.get(&DifficultyLevel::Medium), Some(&6));
        assert_eq!(counts.get(&DifficultyLevel::Hard), Some(&4));
    }

    #[tokio::test]
    async fn sparse_tier_is_backfilled_from_other_tiers() {
        let store = stocked_store("physics", 30, 30, 1);
        let section = mixed_section("physics", 20, 50, 30, 20);
        let mut rng = StdRng::seed_from_u64(11);

        let selection = select_section(&store, &mut rng, 0, &section, &HashSet::new())
            .await
            .expect("selection");

        assert_eq!(selection.question_ids.len(), 20);
        assert!(selection.shortfall.is_none());
    }

    #[tokio::test]
    async fn thin_bank_degrades_to_everything_available() {
        let store = stocked_store("physics", 2, 1, 1);
        let section = mixed_section("physics", 10, 50, 30, 20);
        let mut rng = StdRng::seed_from_u64(3);

        let selection = select_section(&store, &mut rng, 2, &section, &HashSet::new())
            .await
            .expect("selection");

        assert_eq!(selection.question_ids.len(), 4);
        assert_eq!(
            selection.shortfall,
            Some(SectionShortfall {
                section_index: 2,
                subject_id: "physics".to_string(),
                requested: 10,
                selected: 4,
            })
        );
    }

    #[tokio::test]
    async fn fixed_questions_count_toward_section() {
        let store = stocked_store("physics", 10, 0, 0);
        let mut section = fixtures::section("physics", 4);
        section.fixed_question_ids =
            vec!["physics-easy-0".to_string(), "physics-easy-1".to_string(), "ghost".to_string()];
        let mut rng = StdRng::seed_from_u64(5);

        let selection = select_section(&store, &mut rng, 0, &section, &HashSet::new())
            .await
            .expect("selection");

        assert_eq!(selection.question_ids.len(), 4);
        assert!(selection.question_ids.contains(&"physics-easy-0".to_string()));
        assert!(selection.question_ids.contains(&"physics-easy-1".to_string()));
        assert!(!selection.question_ids.contains(&"ghost".to_string()));
    }

    #[tokio::test]
    async fn ids_from_earlier_sections_are_excluded() {
        let store = stocked_store("physics", 5, 0, 0);
        let section = fixtures::section("physics", 5);
        let taken: HashSet<String> =
            ["physics-easy-0", "physics-easy-1"].iter().map(|id| id.to_string()).collect();
        let mut rng = StdRng::seed_from_u64(9);

        let selection =
            select_section(&store, &mut rng, 1, &section, &taken).await.expect("selection");

        assert_eq!(selection.question_ids.len(), 3);
        assert!(selection.question_ids.iter().all(|id| !taken.contains(id)));
    }

    #[tokio::test]
    async fn same_seed_reproduces_selection() {
        let store = stocked_store("physics", 30, 30, 30);
        let section = mixed_section("physics", 20, 50, 30, 20);

        let mut first_rng = StdRng::seed_from_u64(42);
        let first = select_section(&store, &mut first_rng, 0, &section, &HashSet::new())
            .await
            .expect("first");
        let mut second_rng = StdRng::seed_from_u64(42);
        let second = select_section(&store, &mut second_rng, 0, &section, &HashSet::new())
            .await
            .expect("second");

        assert_eq!(first.question_ids, second.question_ids);
    }

    #[tokio::test]
    async fn chapter_scope_filters_candidates() {
        let store = stocked_store("physics", 6, 0, 0);
        let mut optics = fixtures::question("optics-1", "physics", DifficultyLevel::Easy);
        optics.chapter_id = "optics".to_string();
        store.add_question(optics);

        let mut section = fixtures::section("physics", 3);
        section.chapter_ids = vec!["optics".to_string()];
        let mut rng = StdRng::seed_from_u64(1);

        let selection = select_section(&store, &mut rng, 0, &section, &HashSet::new())
            .await
            .expect("selection");

        assert_eq!(selection.question_ids, vec!["optics-1".to_string()]);
    }
}
