use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use std::str::FromStr;

use super::{datetime_from_millis, optional_datetime_from_millis, PublicProfile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Active,
    Ended,
}

impl MatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::Active => "active",
            MatchState::Ended => "ended",
        }
    }
}

impl FromStr for MatchState {
    type Err = sqlx::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MatchState::Active),
            "ended" => Ok(MatchState::Ended),
            other => Err(sqlx::Error::Decode(
                format!("unknown match status: {other}").into(),
            )),
        }
    }
}

/// A match between two users, keyed by the unordered pair.
///
/// `user_low` is always the smaller id. Use [`MatchRecord::canonical_pair`]
/// for lookups so either ordering of the two users finds the same row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub id: i64,
    pub user_low: i64,
    pub user_high: i64,
    pub low_reached: bool,
    pub high_reached: bool,
    pub status: MatchState,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_reason: Option<String>,
    pub end_reason_by: Option<i64>,
}

impl<'r> FromRow<'r, SqliteRow> for MatchRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            user_low: row.try_get("user_low")?,
            user_high: row.try_get("user_high")?,
            low_reached: row.try_get("low_reached")?,
            high_reached: row.try_get("high_reached")?,
            status: status.parse()?,
            created_at: datetime_from_millis(row.try_get("created_at")?)?,
            ended_at: optional_datetime_from_millis(row.try_get("ended_at")?)?,
            end_reason: row.try_get("end_reason")?,
            end_reason_by: row.try_get("end_reason_by")?,
        })
    }
}

impl MatchRecord {
    pub fn canonical_pair(a: i64, b: i64) -> (i64, i64) {
        if a < b { (a, b) } else { (b, a) }
    }

    pub fn involves(&self, user_id: i64) -> bool {
        self.user_low == user_id || self.user_high == user_id
    }

    pub fn partner_of(&self, user_id: i64) -> Option<i64> {
        if self.user_low == user_id {
            Some(self.user_high)
        } else if self.user_high == user_id {
            Some(self.user_low)
        } else {
            None
        }
    }

    pub fn reached_by(&self, user_id: i64) -> bool {
        if self.user_low == user_id {
            self.low_reached
        } else if self.user_high == user_id {
            self.high_reached
        } else {
            false
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MatchState::Active
    }
}

/// Match state as seen by one side.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MatchView {
    Matched {
        match_id: i64,
        partner: PublicProfile,
        you_reached: bool,
        partner_reached: bool,
        since: DateTime<Utc>,
    },
    Unmatched {
        ended_notice: Option<EndNotice>,
    },
}

/// Shown once to the side that did not end the match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndNotice {
    pub match_id: i64,
    pub ended_by: i64,
    pub ended_by_username: String,
    pub reason: String,
    pub ended_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MatchRecord {
        MatchRecord {
            id: 1,
            user_low: 3,
            user_high: 9,
            low_reached: true,
            high_reached: false,
            status: MatchState::Active,
            created_at: Utc::now(),
            ended_at: None,
            end_reason: None,
            end_reason_by: None,
        }
    }

    #[test]
    fn canonical_pair_ignores_order() {
        assert_eq!(MatchRecord::canonical_pair(9, 3), (3, 9));
        assert_eq!(MatchRecord::canonical_pair(3, 9), (3, 9));
    }

    #[test]
    fn sides_resolve_from_either_user() {
        let m = record();
        assert_eq!(m.partner_of(3), Some(9));
        assert_eq!(m.partner_of(9), Some(3));
        assert_eq!(m.partner_of(4), None);
        assert!(m.reached_by(3));
        assert!(!m.reached_by(9));
        assert!(!m.involves(4));
    }
}
