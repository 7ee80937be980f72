use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::TestSet;
use crate::db::types::SetLabel;

pub(crate) const COLUMNS: &str = "id, test_id, set_label, question_ids, generation_seed, created_at";

pub(crate) async fn find(
    pool: &PgPool,
    test_id: &str,
    set_label: SetLabel,
) -> Result<Option<TestSet>, sqlx::Error> {
    sqlx::query_as::<_, TestSet>(&format!(
        "SELECT {COLUMNS} FROM test_sets WHERE test_id = $1 AND set_label = $2"
    ))
    .bind(test_id)
    .bind(set_label)
    .fetch_optional(pool)
    .await
}

/// Plain insert; a second writer for the same label hits `uq_test_sets_test_label`.
pub(crate) async fn create(pool: &PgPool, set: &TestSet) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO test_sets (id, test_id, set_label, question_ids, generation_seed, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)",
    )
    .bind(&set.id)
    .bind(&set.test_id)
    .bind(set.set_label)
    .bind(Json(&set.question_ids.0))
    .bind(set.generation_seed)
    .bind(set.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn replace(pool: &PgPool, set: &TestSet) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO test_sets (id, test_id, set_label, question_ids, generation_seed, created_at)
         VALUES ($1,$2,$3,$4,$5,$6)
         ON CONFLICT (test_id, set_label) DO UPDATE
         SET question_ids = EXCLUDED.question_ids,
             generation_seed = EXCLUDED.generation_seed,
             created_at = EXCLUDED.created_at",
    )
    .bind(&set.id)
    .bind(&set.test_id)
    .bind(set.set_label)
    .bind(Json(&set.question_ids.0))
    .bind(set.generation_seed)
    .bind(set.created_at)
    .execute(pool)
    .await?;

    Ok(())
}
