use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::error::CoreResult;

/// One atomic core operation.
///
/// The caller opens a unit, hands it to exactly one core operation, and
/// commits it on success. Dropping it uncommitted rolls everything back.
///
/// The transaction starts with `BEGIN IMMEDIATE`, so the write lock is held
/// from the first statement and every read inside the unit sees the state it
/// will write against. `now` is captured once so all TTL checks in the call
/// agree with each other.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    now: DateTime<Utc>,
}

impl UnitOfWork {
    pub async fn begin(pool: &SqlitePool) -> CoreResult<Self> {
        Self::begin_at(pool, Utc::now()).await
    }

    /// Begin with an explicit clock, used by maintenance jobs and tests.
    pub async fn begin_at(pool: &SqlitePool, now: DateTime<Utc>) -> CoreResult<Self> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        Ok(Self { tx, now })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub async fn commit(self) -> CoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    pub async fn rollback(self) -> CoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
