use crate::models::{Page, Review, ReviewView};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use super::millis;

const REVIEW_COLUMNS: &str = "id, reviewer_id, reviewed_id, rating, comment, applied_delta, created_at";

pub async fn insert_review(
    conn: &mut SqliteConnection,
    reviewer_id: i64,
    reviewed_id: i64,
    rating: i64,
    comment: &str,
    applied_delta: i64,
    now: DateTime<Utc>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        r#"
        INSERT INTO reviews (reviewer_id, reviewed_id, rating, comment, applied_delta, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(reviewer_id)
    .bind(reviewed_id)
    .bind(rating)
    .bind(comment)
    .bind(applied_delta)
    .bind(millis(now))
    .fetch_one(&mut *conn)
    .await
}

/// Most recent review from `reviewer_id` to `reviewed_id` created after `since`.
pub async fn recent_review_between(
    conn: &mut SqliteConnection,
    reviewer_id: i64,
    reviewed_id: i64,
    since: DateTime<Utc>,
) -> Result<Option<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        r#"
        SELECT {REVIEW_COLUMNS}
        FROM reviews
        WHERE reviewer_id = ? AND reviewed_id = ? AND created_at > ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#
    ))
    .bind(reviewer_id)
    .bind(reviewed_id)
    .bind(millis(since))
    .fetch_optional(&mut *conn)
    .await
}

pub async fn revise_review(
    conn: &mut SqliteConnection,
    review_id: i64,
    rating: i64,
    comment: &str,
    applied_delta: i64,
    now: DateTime<Utc>,
) -> Result<Review, sqlx::Error> {
    sqlx::query_as::<_, Review>(&format!(
        r#"
        UPDATE reviews
        SET rating = ?, comment = ?, applied_delta = ?, created_at = ?
        WHERE id = ?
        RETURNING {REVIEW_COLUMNS}
        "#
    ))
    .bind(rating)
    .bind(comment)
    .bind(applied_delta)
    .bind(millis(now))
    .bind(review_id)
    .fetch_one(&mut *conn)
    .await
}

/// Count and mean rating of every review about `reviewed_id`.
pub async fn rating_stats(conn: &mut SqliteConnection, reviewed_id: i64) -> Result<(i64, Option<f64>), sqlx::Error> {
    sqlx::query_as::<_, (i64, Option<f64>)>(
        "SELECT COUNT(*), AVG(rating) FROM reviews WHERE reviewed_id = ?",
    )
    .bind(reviewed_id)
    .fetch_one(&mut *conn)
    .await
}

/// Reviews about `reviewed_id`, newest first. Without a page every review is returned.
pub async fn list_reviews_for(
    conn: &mut SqliteConnection,
    reviewed_id: i64,
    page: Option<Page>,
) -> Result<Vec<ReviewView>, sqlx::Error> {
    let (limit, offset) = match page {
        Some(page) => (page.limit(), page.offset()),
        None => (-1, 0),
    };

    sqlx::query_as::<_, ReviewView>(
        r#"
        SELECT r.rating, r.comment, r.created_at, u.username
        FROM reviews r
        JOIN users u ON u.id = r.reviewer_id
        WHERE r.reviewed_id = ?
        ORDER BY r.created_at DESC, r.id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(reviewed_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&mut *conn)
    .await
}

pub async fn count_reviews_between(
    conn: &mut SqliteConnection,
    reviewer_id: i64,
    reviewed_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reviews WHERE reviewer_id = ? AND reviewed_id = ?")
        .bind(reviewer_id)
        .bind(reviewed_id)
        .fetch_one(&mut *conn)
        .await
}
