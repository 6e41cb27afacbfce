use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};

use super::datetime_from_millis;
use crate::constants::{fits_text_limit, is_valid_coordinate, TEXT_CHAR_LIMIT};
use crate::error::{CoreError, CoreResult};

/// A user's live presence. Inert once `expires_at` has passed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Beacon {
    pub id: i64,
    pub owner_id: i64,
    pub lat: f64,
    pub lon: f64,
    pub place: String,
    pub intent: String,
    pub meet_time: Option<String>,
    pub clue: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Beacon {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            lat: row.try_get("lat")?,
            lon: row.try_get("lon")?,
            place: row.try_get("place")?,
            intent: row.try_get("intent")?,
            meet_time: row.try_get("meet_time")?,
            clue: row.try_get("clue")?,
            created_at: datetime_from_millis(row.try_get("created_at")?)?,
            expires_at: datetime_from_millis(row.try_get("expires_at")?)?,
        })
    }
}

/// Check-in payload. `meet_time` is an opaque clock string such as "18:30".
#[derive(Debug, Clone, Deserialize)]
pub struct NewBeacon {
    pub lat: f64,
    pub lon: f64,
    pub place: String,
    pub intent: String,
    #[serde(default)]
    pub meet_time: Option<String>,
    #[serde(default)]
    pub clue: String,
}

impl NewBeacon {
    /// Trims text fields, folds a blank meet time into `None`, and enforces limits.
    pub fn normalized(self) -> CoreResult<Self> {
        if !is_valid_coordinate(self.lat, self.lon) {
            return Err(CoreError::InvalidCoordinates);
        }

        let place = self.place.trim().to_string();
        let intent = self.intent.trim().to_string();
        let clue = self.clue.trim().to_string();
        let meet_time = self
            .meet_time
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        if place.is_empty() {
            return Err(CoreError::Invalid("place is required"));
        }
        if intent.is_empty() {
            return Err(CoreError::Invalid("intent is required"));
        }
        for (field, value) in [("place", &place), ("intent", &intent), ("clue", &clue)] {
            if !fits_text_limit(value) {
                return Err(CoreError::TextTooLong {
                    field,
                    max: TEXT_CHAR_LIMIT,
                });
            }
        }
        if let Some(t) = &meet_time {
            if !fits_text_limit(t) {
                return Err(CoreError::TextTooLong {
                    field: "meet_time",
                    max: TEXT_CHAR_LIMIT,
                });
            }
        }

        Ok(Self {
            lat: self.lat,
            lon: self.lon,
            place,
            intent,
            meet_time,
            clue,
        })
    }
}

/// What a requester sees for each beacon around them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyBeacon {
    pub user_id: i64,
    pub username: String,
    pub trust_score: i64,
    pub bio: String,
    pub vibe_tags: Vec<String>,
    pub lat: f64,
    pub lon: f64,
    pub place: String,
    pub intent: String,
    pub meet_time: Option<String>,
    pub clue: String,
    pub expires_at: DateTime<Utc>,
    pub distance_km: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NewBeacon {
        NewBeacon {
            lat: 12.97,
            lon: 77.59,
            place: "  Corner cafe ".into(),
            intent: "coffee".into(),
            meet_time: Some("   ".into()),
            clue: "blue jacket".into(),
        }
    }

    #[test]
    fn normalizing_trims_and_drops_blank_meet_time() {
        let beacon = payload().normalized().unwrap();
        assert_eq!(beacon.place, "Corner cafe");
        assert_eq!(beacon.meet_time, None);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let mut beacon = payload();
        beacon.lat = 91.0;
        assert!(matches!(beacon.normalized(), Err(CoreError::InvalidCoordinates)));

        let mut beacon = payload();
        beacon.lon = f64::NAN;
        assert!(matches!(beacon.normalized(), Err(CoreError::InvalidCoordinates)));
    }

    #[test]
    fn rejects_oversized_clue() {
        let mut beacon = payload();
        beacon.clue = "x".repeat(281);
        assert!(matches!(
            beacon.normalized(),
            Err(CoreError::TextTooLong { field: "clue", .. })
        ));
    }
}
