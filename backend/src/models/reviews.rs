use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};

use super::datetime_from_millis;
use crate::constants::{MAX_FEEDBACK_PER_PAGE, MAX_RATING, MIN_RATING};
use crate::error::{CoreError, CoreResult};

/// A rating that has been checked against the 1..=10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rating(i64);

impl Rating {
    pub fn new(value: i64) -> CoreResult<Self> {
        if (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::InvalidRating(value))
        }
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: i64,
    pub reviewer_id: i64,
    pub reviewed_id: i64,
    pub rating: i64,
    pub comment: String,
    /// Trust change this review produced after clamping
    pub applied_delta: i64,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Review {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            reviewer_id: row.try_get("reviewer_id")?,
            reviewed_id: row.try_get("reviewed_id")?,
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            applied_delta: row.try_get("applied_delta")?,
            created_at: datetime_from_millis(row.try_get("created_at")?)?,
        })
    }
}

/// A review as listed to the person it is about.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub rating: i64,
    pub comment: String,
    pub by: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for ReviewView {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            rating: row.try_get("rating")?,
            comment: row.try_get("comment")?,
            by: row.try_get("username")?,
            created_at: datetime_from_millis(row.try_get("created_at")?)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackSummary {
    /// Mean rating over every review of the user, rounded to one decimal
    pub average: Option<f64>,
    pub count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<Page>,
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackReceipt {
    pub review: Review,
    pub trust_score: i64,
    /// True when an earlier review inside the dedupe window was replaced
    pub revised: bool,
}

/// 1-based page selector for feedback listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: u32, per_page: u32) -> CoreResult<Self> {
        if page == 0 {
            return Err(CoreError::Invalid("page starts at 1"));
        }
        if per_page == 0 || per_page > MAX_FEEDBACK_PER_PAGE {
            return Err(CoreError::Invalid("per_page out of range"));
        }
        Ok(Self { page, per_page })
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }
}
