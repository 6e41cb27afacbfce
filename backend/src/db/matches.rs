use crate::models::MatchRecord;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::millis;

const MATCH_COLUMNS: &str = "id, user_low, user_high, low_reached, high_reached, status, \
     created_at, ended_at, end_reason, end_reason_by";

pub async fn insert_active_match(
    conn: &mut SqliteConnection,
    user_a: i64,
    user_b: i64,
    now: DateTime<Utc>,
) -> Result<MatchRecord, sqlx::Error> {
    let (low, high) = MatchRecord::canonical_pair(user_a, user_b);

    sqlx::query_as::<_, MatchRecord>(&format!(
        r#"
        INSERT INTO matches (user_low, user_high, status, created_at)
        VALUES (?, ?, 'active', ?)
        RETURNING {MATCH_COLUMNS}
        "#
    ))
    .bind(low)
    .bind(high)
    .bind(millis(now))
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_match(conn: &mut SqliteConnection, match_id: i64) -> Result<Option<MatchRecord>, sqlx::Error> {
    sqlx::query_as::<_, MatchRecord>(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = ?"))
        .bind(match_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn get_active_match_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<MatchRecord>, sqlx::Error> {
    sqlx::query_as::<_, MatchRecord>(&format!(
        r#"
        SELECT {MATCH_COLUMNS}
        FROM matches
        WHERE status = 'active' AND (user_low = ? OR user_high = ?)
        ORDER BY id DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn get_active_match_for_pair(
    conn: &mut SqliteConnection,
    user_a: i64,
    user_b: i64,
) -> Result<Option<MatchRecord>, sqlx::Error> {
    let (low, high) = MatchRecord::canonical_pair(user_a, user_b);

    sqlx::query_as::<_, MatchRecord>(&format!(
        r#"
        SELECT {MATCH_COLUMNS}
        FROM matches
        WHERE user_low = ? AND user_high = ? AND status = 'active'
        "#
    ))
    .bind(low)
    .bind(high)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn latest_ended_match_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Option<MatchRecord>, sqlx::Error> {
    sqlx::query_as::<_, MatchRecord>(&format!(
        r#"
        SELECT {MATCH_COLUMNS}
        FROM matches
        WHERE status = 'ended' AND (user_low = ? OR user_high = ?)
        ORDER BY ended_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn latest_ended_match_for_pair(
    conn: &mut SqliteConnection,
    user_a: i64,
    user_b: i64,
) -> Result<Option<MatchRecord>, sqlx::Error> {
    let (low, high) = MatchRecord::canonical_pair(user_a, user_b);

    sqlx::query_as::<_, MatchRecord>(&format!(
        r#"
        SELECT {MATCH_COLUMNS}
        FROM matches
        WHERE user_low = ? AND user_high = ? AND status = 'ended'
        ORDER BY ended_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(low)
    .bind(high)
    .fetch_optional(&mut *conn)
    .await
}

/// Set one side's reached flag on an active match.
pub async fn set_reached(
    conn: &mut SqliteConnection,
    match_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE matches
        SET low_reached = CASE WHEN user_low = ? THEN 1 ELSE low_reached END,
            high_reached = CASE WHEN user_high = ? THEN 1 ELSE high_reached END
        WHERE id = ? AND status = 'active' AND (user_low = ? OR user_high = ?)
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .bind(match_id)
    .bind(user_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// End an active match. A reason already recorded is kept when `reason` is `None`.
///
/// Returns false when the match was no longer active.
pub async fn end_active_match(
    conn: &mut SqliteConnection,
    match_id: i64,
    ended_by: i64,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE matches
        SET status = 'ended',
            ended_at = ?,
            end_reason = COALESCE(?, end_reason),
            end_reason_by = CASE WHEN ? IS NULL THEN end_reason_by ELSE ? END
        WHERE id = ? AND status = 'active'
        "#,
    )
    .bind(millis(now))
    .bind(reason)
    .bind(reason)
    .bind(ended_by)
    .bind(match_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Claim the end notice of an ended match. Only the first caller gets true.
pub async fn claim_end_notice(conn: &mut SqliteConnection, match_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE matches SET end_notice_seen = 1 WHERE id = ? AND status = 'ended' AND end_notice_seen = 0",
    )
    .bind(match_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn count_active_matches_for_user(conn: &mut SqliteConnection, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM matches WHERE status = 'active' AND (user_low = ? OR user_high = ?)",
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_one(&mut *conn)
    .await
}
