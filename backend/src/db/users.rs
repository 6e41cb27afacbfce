use crate::models::User;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::millis;

const USER_COLUMNS: &str =
    "id, username, bio, vibe_tags, trust_score, is_active, is_matched, matched_with, created_at";

pub async fn create_user(
    conn: &mut SqliteConnection,
    username: &str,
    bio: &str,
    vibe_tags: &str,
    trust_score: i64,
    now: DateTime<Utc>,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (username, bio, vibe_tags, trust_score, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(username)
    .bind(bio)
    .bind(vibe_tags)
    .bind(trust_score)
    .bind(millis(now))
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_user_by_id(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
}

/// Flip one user into the matched state. Returns false when the user was
/// already matched, which means a concurrent accept won.
pub async fn set_matched(
    conn: &mut SqliteConnection,
    user_id: i64,
    partner_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_matched = 1, matched_with = ?
        WHERE id = ? AND is_matched = 0
        "#,
    )
    .bind(partner_id)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Clear the matched state of `user_id`, but only while it still points at `partner_id`.
pub async fn clear_matched(
    conn: &mut SqliteConnection,
    user_id: i64,
    partner_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_matched = 0, matched_with = NULL
        WHERE id = ? AND (matched_with = ? OR matched_with IS NULL)
        "#,
    )
    .bind(user_id)
    .bind(partner_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Store an already clamped trust score.
pub async fn set_trust_score(conn: &mut SqliteConnection, user_id: i64, score: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET trust_score = ? WHERE id = ?")
        .bind(score)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn update_bio(conn: &mut SqliteConnection, user_id: i64, bio: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET bio = ? WHERE id = ?")
        .bind(bio)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn set_active(conn: &mut SqliteConnection, user_id: i64, active: bool) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Total user count, used by the maintenance binary's summary line.
pub async fn count_users(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&mut *conn)
        .await
}
