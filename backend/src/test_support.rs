//! Fixtures shared by the unit tests: a throwaway SQLite file with the
//! schema applied, a fixed clock and a few shortcuts for common setup.

use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::SqlitePool;
use tempfile::NamedTempFile;

use crate::db::{get_db_pool, migrations::run_migrations, DatabaseConfig, UnitOfWork};
use crate::models::{NewBeacon, NewProfile, Request, RespondAction};
use crate::services::{profiles, requests};

pub struct TestDb {
    pub pool: SqlitePool,
    _file: NamedTempFile,
}

pub async fn test_db() -> TestDb {
    let file = NamedTempFile::new().unwrap();
    let config = DatabaseConfig {
        database_url: format!("sqlite://{}", file.path().display()),
        max_connections: 4,
    };
    let pool = get_db_pool(&config).await.unwrap();
    run_migrations(&pool).await.unwrap();
    TestDb { pool, _file: file }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
}

pub fn minutes_after(minutes: i64) -> DateTime<Utc> {
    t0() + Duration::minutes(minutes)
}

pub async fn register(pool: &SqlitePool, username: &str) -> i64 {
    let mut uow = UnitOfWork::begin_at(pool, t0()).await.unwrap();
    let user = profiles::register(
        &mut uow,
        NewProfile {
            username: username.to_string(),
            bio: String::new(),
            vibe_tags: Vec::new(),
        },
    )
    .await
    .unwrap();
    uow.commit().await.unwrap();
    user.id
}

pub fn beacon_at(lat: f64, lon: f64, clue: &str) -> NewBeacon {
    NewBeacon {
        lat,
        lon,
        place: "Cafe".to_string(),
        intent: "coffee".to_string(),
        meet_time: None,
        clue: clue.to_string(),
    }
}

pub async fn send_request(pool: &SqlitePool, from: i64, to: i64, at: DateTime<Utc>) -> Request {
    let mut uow = UnitOfWork::begin_at(pool, at).await.unwrap();
    let request = requests::send(&mut uow, from, to).await.unwrap();
    uow.commit().await.unwrap();
    request
}

/// Registers alice and bob and puts them in an active match.
pub async fn matched_pair(pool: &SqlitePool) -> (i64, i64) {
    let alice = register(pool, "alice").await;
    let bob = register(pool, "bob").await;
    let request = send_request(pool, alice, bob, t0()).await;

    let mut uow = UnitOfWork::begin_at(pool, minutes_after(1)).await.unwrap();
    requests::respond(&mut uow, bob, request.id, RespondAction::Accept).await.unwrap();
    uow.commit().await.unwrap();
    (alice, bob)
}
