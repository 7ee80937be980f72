use sqlx::types::Json;
use sqlx::PgPool;

use crate::db::models::AttemptQuestionSet;

pub(crate) const COLUMNS: &str = "\
    id, test_id, student_id, attempt_number, set_label, question_ids, \
    section_time_budgets, created_at";

pub(crate) async fn find(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
    attempt_number: i32,
) -> Result<Option<AttemptQuestionSet>, sqlx::Error> {
    sqlx::query_as::<_, AttemptQuestionSet>(&format!(
        "SELECT {COLUMNS} FROM attempt_question_sets \
         WHERE test_id = $1 AND student_id = $2 AND attempt_number = $3"
    ))
    .bind(test_id)
    .bind(student_id)
    .bind(attempt_number)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn create(pool: &PgPool, set: &AttemptQuestionSet) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO attempt_question_sets (
            id, test_id, student_id, attempt_number, set_label, question_ids,
            section_time_budgets, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(&set.id)
    .bind(&set.test_id)
    .bind(&set.student_id)
    .bind(set.attempt_number)
    .bind(set.set_label)
    .bind(Json(&set.question_ids.0))
    .bind(Json(&set.section_time_budgets.0))
    .bind(set.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

pub(crate) async fn delete(
    pool: &PgPool,
    test_id: &str,
    student_id: &str,
    attempt_number: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM attempt_question_sets \
         WHERE test_id = $1 AND student_id = $2 AND attempt_number = $3",
    )
    .bind(test_id)
    .bind(student_id)
    .bind(attempt_number)
    .execute(pool)
    .await?;

    Ok(())
}
