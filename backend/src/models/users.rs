use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, FromRow, Row};

use super::datetime_from_millis;
use crate::constants::TEXT_CHAR_LIMIT;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub bio: String,
    /// Comma-separated tags as entered at signup
    pub vibe_tags: String,
    pub trust_score: i64,
    pub is_active: bool,
    pub is_matched: bool,
    pub matched_with: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for User {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            bio: row.try_get("bio")?,
            vibe_tags: row.try_get("vibe_tags")?,
            trust_score: row.try_get("trust_score")?,
            is_active: row.try_get("is_active")?,
            is_matched: row.try_get("is_matched")?,
            matched_with: row.try_get("matched_with")?,
            created_at: datetime_from_millis(row.try_get("created_at")?)?,
        })
    }
}

impl User {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            id: self.id,
            username: self.username.clone(),
            trust_score: self.trust_score,
            bio: truncate_chars(&self.bio, TEXT_CHAR_LIMIT),
            vibe_tags: split_tags(&self.vibe_tags),
        }
    }

    pub fn info(&self) -> UserInfo {
        UserInfo {
            trust_score: self.trust_score,
            is_matched: self.is_matched,
            matched_with: self.matched_with,
        }
    }
}

/// Fields other users may see. Never carries contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub trust_score: i64,
    pub bio: String,
    pub vibe_tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub trust_score: i64,
    pub is_matched: bool,
    pub matched_with: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProfile {
    pub username: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub vibe_tags: Vec<String>,
}

pub(crate) fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
