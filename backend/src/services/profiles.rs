use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use super::require_user;
use crate::constants::{fits_text_limit, DEFAULT_TRUST_SCORE, TEXT_CHAR_LIMIT, USERNAME_MAX_LENGTH, USERNAME_MIN_LENGTH};
use crate::db::{beacons, requests, users, UnitOfWork};
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::models::{NewProfile, User, UserInfo};

static USERNAME_CHARSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("username pattern is valid"));

pub fn is_valid_username(username: &str) -> bool {
    (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&username.len()) && USERNAME_CHARSET.is_match(username)
}

fn normalize_bio(bio: &str) -> CoreResult<String> {
    let bio = bio.trim();
    if !fits_text_limit(bio) {
        return Err(CoreError::TextTooLong {
            field: "bio",
            max: TEXT_CHAR_LIMIT,
        });
    }
    Ok(bio.to_string())
}

/// Create a user with the default trust score.
pub async fn register(uow: &mut UnitOfWork, profile: NewProfile) -> CoreResult<User> {
    let username = profile.username.trim();
    if !is_valid_username(username) {
        return Err(CoreError::Invalid("username must be 3-32 letters, digits, '_', '.' or '-'"));
    }
    let bio = normalize_bio(&profile.bio)?;
    let vibe_tags = profile
        .vibe_tags
        .iter()
        .map(|tag| tag.trim().replace(',', " "))
        .filter(|tag| !tag.is_empty())
        .collect::<Vec<_>>()
        .join(",");

    let now = uow.now();
    let user = users::create_user(uow.conn(), username, &bio, &vibe_tags, DEFAULT_TRUST_SCORE, now)
        .await
        .map_err(|e| if is_unique_violation(&e) { CoreError::UsernameTaken } else { e.into() })?;

    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn user_info(uow: &mut UnitOfWork, user_id: i64) -> CoreResult<UserInfo> {
    Ok(require_user(uow.conn(), user_id).await?.info())
}

pub async fn update_bio(uow: &mut UnitOfWork, user_id: i64, bio: &str) -> CoreResult<User> {
    let bio = normalize_bio(bio)?;
    let conn = uow.conn();

    if !users::update_bio(conn, user_id, &bio).await? {
        return Err(CoreError::NotFound("user"));
    }
    debug!(user_id, "bio updated");
    require_user(conn, user_id).await
}

/// Toggle whether the user takes part in discovery.
///
/// Deactivating removes their beacon and declines every pending request they
/// sent or received, so nobody can find or reach them afterwards.
pub async fn set_active(uow: &mut UnitOfWork, user_id: i64, active: bool) -> CoreResult<User> {
    let conn = uow.conn();

    if !users::set_active(conn, user_id, active).await? {
        return Err(CoreError::NotFound("user"));
    }

    if active {
        info!(user_id, "user reactivated");
    } else {
        let cleared = beacons::delete_beacon_for_owner(conn, user_id).await?;
        let declined = requests::decline_pending_involving(conn, user_id, user_id).await?;
        info!(user_id, cleared, declined, "user deactivated");
    }

    require_user(conn, user_id).await
}
