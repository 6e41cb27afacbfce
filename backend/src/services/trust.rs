use chrono::Duration;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::require_user;
use crate::constants::{
    fits_text_limit, FEEDBACK_DEDUPE_WINDOW_MINUTES, MAX_RATING, MAX_TRUST_SCORE, MIN_RATING, MIN_TRUST_SCORE,
    NEUTRAL_RATING, TEXT_CHAR_LIMIT,
};
use crate::db::{reviews, users, UnitOfWork};
use crate::error::{CoreError, CoreResult};
use crate::models::{FeedbackReceipt, FeedbackSummary, Page, Rating};

/// Trust adjustment for a raw rating: 5 is neutral, 1 is -4, 10 is +5.
/// Out-of-range input is clamped first.
pub fn rating_to_delta(rating: i64) -> i64 {
    rating.clamp(MIN_RATING, MAX_RATING) - NEUTRAL_RATING
}

pub fn clamp_trust(score: i64) -> i64 {
    score.clamp(MIN_TRUST_SCORE, MAX_TRUST_SCORE)
}

/// Shift a user's trust score by `delta`, staying inside the allowed band.
pub async fn apply_delta(uow: &mut UnitOfWork, user_id: i64, delta: i64) -> CoreResult<i64> {
    let score = require_user(uow.conn(), user_id).await?.trust_score;
    let (score, _) = shift_score(uow.conn(), user_id, score, delta).await?;
    Ok(score)
}

/// Move `from` by `delta` inside the band and persist it. Returns the new
/// score and the change that actually landed.
async fn shift_score(conn: &mut SqliteConnection, user_id: i64, from: i64, delta: i64) -> CoreResult<(i64, i64)> {
    let to = clamp_trust(from + delta);
    if to != from && !users::set_trust_score(conn, user_id, to).await? {
        return Err(CoreError::NotFound("user"));
    }
    Ok((to, to - from))
}

/// Record a rating from `reviewer_id` about `target_id`.
///
/// A second rating for the same pair inside the dedupe window replaces the
/// first one. The trust change the first one produced is undone before the
/// new rating is applied, so the score ends where the final rating alone
/// would have put it.
pub async fn submit_feedback(
    uow: &mut UnitOfWork,
    reviewer_id: i64,
    target_id: i64,
    rating: i64,
    comment: &str,
) -> CoreResult<FeedbackReceipt> {
    let rating = Rating::new(rating)?;
    let delta = rating_to_delta(rating.value());
    let comment = comment.trim();
    if !fits_text_limit(comment) {
        return Err(CoreError::TextTooLong {
            field: "comment",
            max: TEXT_CHAR_LIMIT,
        });
    }
    if reviewer_id == target_id {
        return Err(CoreError::Invalid("cannot review yourself"));
    }

    let now = uow.now();
    let conn = uow.conn();
    let current = require_user(conn, target_id).await?.trust_score;

    let window_start = now - Duration::minutes(FEEDBACK_DEDUPE_WINDOW_MINUTES);
    let previous = reviews::recent_review_between(conn, reviewer_id, target_id, window_start).await?;

    let (review, trust_score, revised) = match previous {
        Some(previous) => {
            let base = clamp_trust(current - previous.applied_delta);
            let target = clamp_trust(base + delta);
            let (trust_score, _) = shift_score(conn, target_id, current, target - current).await?;
            let review =
                reviews::revise_review(conn, previous.id, rating.value(), comment, target - base, now).await?;
            debug!(
                review_id = review.id,
                old = previous.rating,
                new = rating.value(),
                undone = previous.applied_delta,
                "revised review in window"
            );
            (review, trust_score, true)
        }
        None => {
            let (trust_score, applied) = shift_score(conn, target_id, current, delta).await?;
            let review =
                reviews::insert_review(conn, reviewer_id, target_id, rating.value(), comment, applied, now).await?;
            (review, trust_score, false)
        }
    };

    info!(
        reviewer_id,
        target_id,
        rating = rating.value(),
        applied = review.applied_delta,
        trust_score,
        revised,
        "feedback recorded"
    );
    Ok(FeedbackReceipt {
        review,
        trust_score,
        revised,
    })
}

/// Reviews about `user_id`, newest first. The average always covers every review.
pub async fn feedback_for(uow: &mut UnitOfWork, user_id: i64, page: Option<Page>) -> CoreResult<FeedbackSummary> {
    let conn = uow.conn();
    require_user(conn, user_id).await?;

    let (count, average) = reviews::rating_stats(conn, user_id).await?;
    let reviews = reviews::list_reviews_for(conn, user_id, page).await?;

    Ok(FeedbackSummary {
        average: average.map(|avg| (avg * 10.0).round() / 10.0),
        count,
        page,
        reviews,
    })
}
