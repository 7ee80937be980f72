use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::Question;
use crate::db::types::DifficultyLevel;

pub(crate) const COLUMNS: &str = "\
    id, subject_id, chapter_id, topic_id, text, image_url, options, \
    correct_option, explanation, difficulty, marks, created_at";

/// Scope of a bank lookup. Empty chapter/topic lists mean "any".
#[derive(Debug, Clone, Default)]
pub(crate) struct QuestionFilter {
    pub(crate) subject_id: String,
    pub(crate) difficulty: Option<DifficultyLevel>,
    pub(crate) chapter_ids: Vec<String>,
    pub(crate) topic_ids: Vec<String>,
    pub(crate) exclude_ids: Vec<String>,
}

#[cfg(test)]
impl QuestionFilter {
    pub(crate) fn matches(&self, question: &Question) -> bool {
        question.subject_id == self.subject_id
            && self.difficulty.map_or(true, |level| question.difficulty == level)
            && (self.chapter_ids.is_empty() || self.chapter_ids.contains(&question.chapter_id))
            && (self.topic_ids.is_empty() || self.topic_ids.contains(&question.topic_id))
            && !self.exclude_ids.contains(&question.id)
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuestionFilter) {
    builder.push(" WHERE subject_id = ");
    builder.push_bind(filter.subject_id.clone());

    if let Some(difficulty) = filter.difficulty {
        builder.push(" AND difficulty = ");
        builder.push_bind(difficulty);
    }
    if !filter.chapter_ids.is_empty() {
        builder.push(" AND chapter_id = ANY(");
        builder.push_bind(filter.chapter_ids.clone());
        builder.push(")");
    }
    if !filter.topic_ids.is_empty() {
        builder.push(" AND topic_id = ANY(");
        builder.push_bind(filter.topic_ids.clone());
        builder.push(")");
    }
    if !filter.exclude_ids.is_empty() {
        builder.push(" AND NOT (id = ANY(");
        builder.push_bind(filter.exclude_ids.clone());
        builder.push("))");
    }
}

pub(crate) async fn find_by_filter(
    pool: &PgPool,
    filter: &QuestionFilter,
) -> Result<Vec<Question>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM questions"));
    push_filter(&mut builder, filter);
    builder.push(" ORDER BY created_at, id");

    builder.build_query_as::<Question>().fetch_all(pool).await
}

pub(crate) async fn find_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await
}
