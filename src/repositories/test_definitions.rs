use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::TestDefinition;

pub(crate) const COLUMNS: &str = "\
    id, institute_id, title, mode, exam_type, batch_ids, sections, blocks, marking_scheme, \
    distribution, duration_minutes, max_attempts, start_time, end_time, created_by, \
    created_at, updated_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<TestDefinition>, sqlx::Error> {
    sqlx::query_as::<_, TestDefinition>(&format!(
        "SELECT {COLUMNS} FROM test_definitions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn create(pool: &PgPool, test: &TestDefinition) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO test_definitions (
            id, institute_id, title, mode, exam_type, batch_ids, sections, blocks,
            marking_scheme, distribution, duration_minutes, max_attempts, start_time,
            end_time, created_by, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)",
    )
    .bind(&test.id)
    .bind(&test.institute_id)
    .bind(&test.title)
    .bind(test.mode)
    .bind(test.exam_type)
    .bind(Json(&test.batch_ids.0))
    .bind(Json(&test.sections.0))
    .bind(Json(&test.blocks.0))
    .bind(Json(&test.marking_scheme.0))
    .bind(test.distribution)
    .bind(test.duration_minutes)
    .bind(test.max_attempts)
    .bind(test.start_time)
    .bind(test.end_time)
    .bind(&test.created_by)
    .bind(test.created_at)
    .bind(test.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}
