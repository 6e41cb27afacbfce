use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{sqlite::SqliteRow, FromRow, Row};
use std::str::FromStr;

use super::{datetime_from_millis, Beacon, MatchRecord, PublicProfile};
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl FromStr for RequestStatus {
    type Err = sqlx::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "declined" => Ok(RequestStatus::Declined),
            other => Err(sqlx::Error::Decode(
                format!("unknown request status: {other}").into(),
            )),
        }
    }
}

/// A directed connection proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub id: i64,
    pub sender_id: i64,
    pub receiver_id: i64,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Request {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let status: String = row.try_get("status")?;
        Ok(Self {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            status: status.parse()?,
            created_at: datetime_from_millis(row.try_get("created_at")?)?,
        })
    }
}

/// The newest pending request addressed to a user, with who is asking.
#[derive(Debug, Clone, Serialize)]
pub struct IncomingRequest {
    pub request: Request,
    pub sender: PublicProfile,
    /// Sender's beacon, only while it is still live
    pub beacon: Option<Beacon>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespondAction {
    Accept,
    Decline,
}

impl FromStr for RespondAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(RespondAction::Accept),
            "decline" => Ok(RespondAction::Decline),
            other => Err(CoreError::InvalidAction(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RespondOutcome {
    Declined { request: Request },
    Matched { request: Request, matched: MatchRecord },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_is_open() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Accepted.is_terminal());
        assert!(RequestStatus::Declined.is_terminal());
    }

    #[test]
    fn action_parsing() {
        assert_eq!(" Accept ".parse::<RespondAction>().unwrap(), RespondAction::Accept);
        assert_eq!("decline".parse::<RespondAction>().unwrap(), RespondAction::Decline);
        assert!(matches!("wave".parse::<RespondAction>(), Err(CoreError::InvalidAction(a)) if a == "wave"));
    }
}
