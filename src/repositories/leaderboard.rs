use sqlx::PgPool;

use crate::db::models::LeaderboardEntry;

pub(crate) const COLUMNS: &str =
    "id, test_id, student_id, batch_id, score, time_taken_seconds, created_at";

/// First result per student wins; later writes for the same `(test_id, student_id)` are
/// ignored.
pub(crate) async fn create_if_absent(
    pool: &PgPool,
    entry: &LeaderboardEntry,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO leaderboard_entries (
            id, test_id, student_id, batch_id, score, time_taken_seconds, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        ON CONFLICT (test_id, student_id) DO NOTHING",
    )
    .bind(&entry.id)
    .bind(&entry.test_id)
    .bind(&entry.student_id)
    .bind(&entry.batch_id)
    .bind(entry.score)
    .bind(entry.time_taken_seconds)
    .bind(entry.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn list_by_test(
    pool: &PgPool,
    test_id: &str,
) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
    sqlx::query_as::<_, LeaderboardEntry>(&format!(
        "SELECT {COLUMNS} FROM leaderboard_entries WHERE test_id = $1 \
         ORDER BY score DESC, time_taken_seconds ASC, created_at ASC"
    ))
    .bind(test_id)
    .fetch_all(pool)
    .await
}
