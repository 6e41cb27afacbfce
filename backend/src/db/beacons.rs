use crate::models::Beacon;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use super::millis;

const BEACON_COLUMNS: &str =
    "id, owner_id, lat, lon, place, intent, meet_time, clue, created_at, expires_at";

/// A live beacon joined with the owner's public fields.
#[derive(Debug, Clone)]
pub struct BeaconWithOwner {
    pub beacon: Beacon,
    pub username: String,
    pub trust_score: i64,
    pub bio: String,
    pub vibe_tags: String,
}

impl<'r> FromRow<'r, SqliteRow> for BeaconWithOwner {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            beacon: Beacon::from_row(row)?,
            username: row.try_get("username")?,
            trust_score: row.try_get("trust_score")?,
            bio: row.try_get("bio")?,
            vibe_tags: row.try_get("vibe_tags")?,
        })
    }
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_beacon(
    conn: &mut SqliteConnection,
    owner_id: i64,
    lat: f64,
    lon: f64,
    place: &str,
    intent: &str,
    meet_time: Option<&str>,
    clue: &str,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<Beacon, sqlx::Error> {
    sqlx::query_as::<_, Beacon>(&format!(
        r#"
        INSERT INTO beacons (owner_id, lat, lon, place, intent, meet_time, clue, created_at, expires_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {BEACON_COLUMNS}
        "#
    ))
    .bind(owner_id)
    .bind(lat)
    .bind(lon)
    .bind(place)
    .bind(intent)
    .bind(meet_time)
    .bind(clue)
    .bind(millis(created_at))
    .bind(millis(expires_at))
    .fetch_one(&mut *conn)
    .await
}

/// Remove the owner's beacon, live or not. Returns how many rows went away.
pub async fn delete_beacon_for_owner(conn: &mut SqliteConnection, owner_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM beacons WHERE owner_id = ?")
        .bind(owner_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn delete_beacons_for_pair(
    conn: &mut SqliteConnection,
    user_a: i64,
    user_b: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM beacons WHERE owner_id IN (?, ?)")
        .bind(user_a)
        .bind(user_b)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn get_live_beacon(
    conn: &mut SqliteConnection,
    owner_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<Beacon>, sqlx::Error> {
    sqlx::query_as::<_, Beacon>(&format!(
        "SELECT {BEACON_COLUMNS} FROM beacons WHERE owner_id = ? AND expires_at > ?"
    ))
    .bind(owner_id)
    .bind(millis(now))
    .fetch_optional(&mut *conn)
    .await
}

pub async fn count_beacons_for_owner(conn: &mut SqliteConnection, owner_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM beacons WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_one(&mut *conn)
        .await
}

/// Live beacons of active, unmatched users other than `requester`.
pub async fn list_discoverable(
    conn: &mut SqliteConnection,
    requester: i64,
    now: DateTime<Utc>,
) -> Result<Vec<BeaconWithOwner>, sqlx::Error> {
    sqlx::query_as::<_, BeaconWithOwner>(
        r#"
        SELECT b.id, b.owner_id, b.lat, b.lon, b.place, b.intent, b.meet_time, b.clue,
               b.created_at, b.expires_at,
               u.username, u.trust_score, u.bio, u.vibe_tags
        FROM beacons b
        JOIN users u ON u.id = b.owner_id
        WHERE b.expires_at > ?
          AND b.owner_id != ?
          AND u.is_matched = 0
          AND u.is_active = 1
        "#,
    )
    .bind(millis(now))
    .bind(requester)
    .fetch_all(&mut *conn)
    .await
}

pub async fn delete_expired_beacons(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM beacons WHERE expires_at <= ?")
        .bind(millis(now))
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_expired_beacons(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM beacons WHERE expires_at <= ?")
        .bind(millis(now))
        .fetch_one(&mut *conn)
        .await
}
