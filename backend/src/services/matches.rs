use tracing::{debug, info, warn};

use super::require_user;
use crate::constants::END_REASON_CHAR_LIMIT;
use crate::db::{beacons, matches, requests, users, UnitOfWork};
use crate::error::{is_unique_violation, CoreError, CoreResult, Outcome};
use crate::models::{EndNotice, MatchRecord, MatchView, PublicProfile, Request, RequestStatus};

/// Turn an accepted request into an active match.
///
/// Runs inside the responder's unit: the request flips to accepted, the match
/// row is created, both users are marked matched, both beacons are removed and
/// every other pending request touching either user is declined. Any failure
/// aborts the unit, so none of it becomes visible.
pub(crate) async fn establish(uow: &mut UnitOfWork, request: &Request) -> CoreResult<(Request, MatchRecord)> {
    let now = uow.now();
    let conn = uow.conn();
    let (sender_id, receiver_id) = (request.sender_id, request.receiver_id);

    if !requests::resolve_pending_request(conn, request.id, receiver_id, RequestStatus::Accepted).await? {
        debug!(request_id = request.id, "request no longer pending");
        return Err(CoreError::NotFound("request"));
    }

    let sender = require_user(conn, sender_id).await?;
    if !sender.is_active {
        return Err(CoreError::NotFound("user"));
    }

    for (user_id, partner_id) in [(sender_id, receiver_id), (receiver_id, sender_id)] {
        if !users::set_matched(conn, user_id, partner_id).await? {
            warn!(request_id = request.id, user_id, "accept lost the race, user already matched");
            return Err(CoreError::AlreadyMatched);
        }
    }

    let record = matches::insert_active_match(conn, sender_id, receiver_id, now)
        .await
        .map_err(|e| if is_unique_violation(&e) { CoreError::AlreadyMatched } else { e.into() })?;

    let cleared = beacons::delete_beacons_for_pair(conn, sender_id, receiver_id).await?;
    let cancelled = requests::decline_pending_involving(conn, sender_id, receiver_id).await?;

    info!(
        match_id = record.id,
        request_id = request.id,
        sender_id,
        receiver_id,
        cleared,
        cancelled,
        "match established"
    );

    let accepted = Request {
        status: RequestStatus::Accepted,
        ..request.clone()
    };
    Ok((accepted, record))
}

/// Record that `user_id` met their partner. Repeating it changes nothing.
pub async fn mark_reached(uow: &mut UnitOfWork, user_id: i64) -> CoreResult<MatchRecord> {
    let conn = uow.conn();

    let active = matches::get_active_match_for_user(conn, user_id)
        .await?
        .ok_or(CoreError::NoActiveMatch)?;

    if !active.reached_by(user_id) {
        matches::set_reached(conn, active.id, user_id).await?;
        info!(match_id = active.id, user_id, "marked reached");
    }

    matches::get_match(conn, active.id).await?.ok_or(CoreError::MatchNotFound)
}

fn normalize_reason(reason: Option<&str>) -> CoreResult<Option<String>> {
    let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    if reason.chars().count() > END_REASON_CHAR_LIMIT {
        return Err(CoreError::ReasonTooLong {
            max: END_REASON_CHAR_LIMIT,
        });
    }
    Ok(Some(reason.to_string()))
}

/// End the caller's active match.
///
/// A reason is mandatory unless the caller already marked the match reached.
/// Ending a match that the partner (or an earlier retry) already ended
/// reports `AlreadyApplied` with the ended record.
pub async fn end_match(uow: &mut UnitOfWork, user_id: i64, reason: Option<&str>) -> CoreResult<Outcome<MatchRecord>> {
    let reason = normalize_reason(reason)?;
    let now = uow.now();
    let conn = uow.conn();

    let user = require_user(conn, user_id).await?;

    let Some(partner_id) = user.matched_with else {
        return match matches::latest_ended_match_for_user(conn, user_id).await? {
            Some(ended) => {
                debug!(user_id, match_id = ended.id, "end_match after match already ended");
                Ok(Outcome::AlreadyApplied(ended))
            }
            None => Err(CoreError::NoActiveMatch),
        };
    };

    let Some(active) = matches::get_active_match_for_pair(conn, user_id, partner_id).await? else {
        // Flags still point at the partner but the row was closed already.
        users::clear_matched(conn, user_id, partner_id).await?;
        users::clear_matched(conn, partner_id, user_id).await?;
        return match matches::latest_ended_match_for_pair(conn, user_id, partner_id).await? {
            Some(ended) => {
                warn!(user_id, partner_id, match_id = ended.id, "cleared stale matched flags");
                Ok(Outcome::AlreadyApplied(ended))
            }
            None => Err(CoreError::MatchNotFound),
        };
    };

    if !active.reached_by(user_id) && reason.is_none() {
        return Err(CoreError::ReasonRequired);
    }

    users::clear_matched(conn, user_id, partner_id).await?;
    users::clear_matched(conn, partner_id, user_id).await?;

    let ended = matches::end_active_match(conn, active.id, user_id, reason.as_deref(), now).await?;
    let record = matches::get_match(conn, active.id).await?.ok_or(CoreError::MatchNotFound)?;

    if ended {
        info!(match_id = record.id, user_id, partner_id, with_reason = reason.is_some(), "match ended");
        Ok(Outcome::Applied(record))
    } else {
        warn!(match_id = record.id, user_id, "match ended concurrently");
        Ok(Outcome::AlreadyApplied(record))
    }
}

/// Current match state for `user_id`.
///
/// When unmatched, carries a notice about the last match if the partner ended
/// it and gave a reason. The notice is handed out once; later polls see
/// `None`. Ends the user caused themselves are never reported.
pub async fn match_status(uow: &mut UnitOfWork, user_id: i64) -> CoreResult<MatchView> {
    let conn = uow.conn();
    let user = require_user(conn, user_id).await?;

    if user.is_matched {
        if let Some(active) = matches::get_active_match_for_user(conn, user_id).await? {
            let partner_id = active.partner_of(user_id).ok_or(CoreError::MatchNotFound)?;
            let partner = require_user(conn, partner_id).await?;
            return Ok(MatchView::Matched {
                match_id: active.id,
                partner: partner.public_profile(),
                you_reached: active.reached_by(user_id),
                partner_reached: active.reached_by(partner_id),
                since: active.created_at,
            });
        }
        warn!(user_id, "matched flag set without an active match");
    }

    let Some(last) = matches::latest_ended_match_for_user(conn, user_id).await? else {
        return Ok(MatchView::Unmatched { ended_notice: None });
    };

    let ended_notice = match (last.end_reason_by, last.end_reason.as_deref()) {
        (Some(ended_by), Some(reason)) if ended_by != user_id && last.involves(ended_by) => {
            if !matches::claim_end_notice(conn, last.id).await? {
                debug!(user_id, match_id = last.id, "end notice already shown");
                return Ok(MatchView::Unmatched { ended_notice: None });
            }
            let ender = require_user(conn, ended_by).await?;
            Some(EndNotice {
                match_id: last.id,
                ended_by,
                ended_by_username: ender.username,
                reason: reason.to_string(),
                ended_at: last.ended_at,
            })
        }
        _ => None,
    };

    Ok(MatchView::Unmatched { ended_notice })
}

/// The partner from the most recently ended match, for post-match feedback.
pub async fn feedback_target(uow: &mut UnitOfWork, user_id: i64) -> CoreResult<PublicProfile> {
    let conn = uow.conn();

    let last = matches::latest_ended_match_for_user(conn, user_id)
        .await?
        .ok_or(CoreError::NotFound("match"))?;
    let partner_id = last.partner_of(user_id).ok_or(CoreError::MatchNotFound)?;

    Ok(require_user(conn, partner_id).await?.public_profile())
}
