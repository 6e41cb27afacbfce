pub mod beacons;
pub mod matches;
pub mod requests;
pub mod reviews;
pub mod users;

pub use beacons::{Beacon, NearbyBeacon, NewBeacon};
pub use matches::{EndNotice, MatchRecord, MatchState, MatchView};
pub use requests::{IncomingRequest, Request, RequestStatus, RespondAction, RespondOutcome};
pub use reviews::{FeedbackReceipt, FeedbackSummary, Page, Rating, Review, ReviewView};
pub use users::{NewProfile, PublicProfile, User, UserInfo};

use chrono::{DateTime, Utc};

/// Timestamps are stored as unix milliseconds so range filters compare integers.
pub(crate) fn datetime_from_millis(ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| sqlx::Error::Decode(format!("timestamp out of range: {ms}").into()))
}

pub(crate) fn optional_datetime_from_millis(
    ms: Option<i64>,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    ms.map(datetime_from_millis).transpose()
}
