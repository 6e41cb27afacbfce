use crate::models::{Request, RequestStatus};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::millis;

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at";

pub async fn insert_pending_request(
    conn: &mut SqliteConnection,
    sender_id: i64,
    receiver_id: i64,
    now: DateTime<Utc>,
) -> Result<Request, sqlx::Error> {
    sqlx::query_as::<_, Request>(&format!(
        r#"
        INSERT INTO requests (sender_id, receiver_id, status, created_at)
        VALUES (?, ?, 'pending', ?)
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(sender_id)
    .bind(receiver_id)
    .bind(millis(now))
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_request(conn: &mut SqliteConnection, request_id: i64) -> Result<Option<Request>, sqlx::Error> {
    sqlx::query_as::<_, Request>(&format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"))
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn get_pending_request(
    conn: &mut SqliteConnection,
    sender_id: i64,
    receiver_id: i64,
) -> Result<Option<Request>, sqlx::Error> {
    sqlx::query_as::<_, Request>(&format!(
        r#"
        SELECT {REQUEST_COLUMNS}
        FROM requests
        WHERE sender_id = ? AND receiver_id = ? AND status = 'pending'
        "#
    ))
    .bind(sender_id)
    .bind(receiver_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Newest pending request addressed to `receiver_id`; ties go to the later insert.
pub async fn newest_pending_for_receiver(
    conn: &mut SqliteConnection,
    receiver_id: i64,
) -> Result<Option<Request>, sqlx::Error> {
    sqlx::query_as::<_, Request>(
        r#"
        SELECT r.id, r.sender_id, r.receiver_id, r.status, r.created_at
        FROM requests r
        JOIN users u ON u.id = r.sender_id
        WHERE r.receiver_id = ?
          AND r.status = 'pending'
          AND u.is_active = 1
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT 1
        "#,
    )
    .bind(receiver_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Move a pending request addressed to `receiver_id` into a terminal status.
///
/// Returns false when the request is gone, addressed elsewhere, or no longer pending.
pub async fn resolve_pending_request(
    conn: &mut SqliteConnection,
    request_id: i64,
    receiver_id: i64,
    status: RequestStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = ?
        WHERE id = ? AND receiver_id = ? AND status = 'pending'
        "#,
    )
    .bind(status.as_str())
    .bind(request_id)
    .bind(receiver_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Decline every pending request where either user is sender or receiver.
pub async fn decline_pending_involving(
    conn: &mut SqliteConnection,
    user_a: i64,
    user_b: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = 'declined'
        WHERE status = 'pending'
          AND (sender_id IN (?, ?) OR receiver_id IN (?, ?))
        "#,
    )
    .bind(user_a)
    .bind(user_b)
    .bind(user_a)
    .bind(user_b)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

/// Delete pending requests created at or before `cutoff` that involve either user.
pub async fn purge_stale_pending_involving(
    conn: &mut SqliteConnection,
    user_a: i64,
    user_b: i64,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM requests
        WHERE status = 'pending'
          AND created_at <= ?
          AND (sender_id IN (?, ?) OR receiver_id IN (?, ?))
        "#,
    )
    .bind(millis(cutoff))
    .bind(user_a)
    .bind(user_b)
    .bind(user_a)
    .bind(user_b)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn purge_all_stale_pending(conn: &mut SqliteConnection, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM requests WHERE status = 'pending' AND created_at <= ?")
        .bind(millis(cutoff))
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_stale_pending(conn: &mut SqliteConnection, cutoff: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE status = 'pending' AND created_at <= ?")
        .bind(millis(cutoff))
        .fetch_one(&mut *conn)
        .await
}

pub async fn count_requests_between(
    conn: &mut SqliteConnection,
    sender_id: i64,
    receiver_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM requests WHERE sender_id = ? AND receiver_id = ?")
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_one(&mut *conn)
        .await
}
