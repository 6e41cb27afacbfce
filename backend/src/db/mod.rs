pub mod beacons;
pub mod connection;
pub mod matches;
pub mod migrations;
pub mod requests;
pub mod reviews;
pub mod unit_of_work;
pub mod users;

pub use connection::{get_db_pool, DatabaseConfig};
pub use unit_of_work::UnitOfWork;

use chrono::{DateTime, Utc};

/// Bind form of a timestamp: unix milliseconds.
pub(crate) fn millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}
