use sqlx::PgPool;

pub(crate) async fn list_batch_ids_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT batch_id FROM batch_students WHERE student_id = $1 ORDER BY joined_at, batch_id",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_students_in_batches(
    pool: &PgPool,
    batch_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if batch_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar(
        "SELECT DISTINCT student_id FROM batch_students WHERE batch_id = ANY($1) ORDER BY student_id",
    )
    .bind(batch_ids)
    .fetch_all(pool)
    .await
}
