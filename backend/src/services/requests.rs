use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use super::{matches, require_user};
use crate::constants::PENDING_REQUEST_TTL_MINUTES;
use crate::db::{beacons, requests, users, UnitOfWork};
use crate::error::{is_unique_violation, CoreError, CoreResult};
use crate::models::{IncomingRequest, Request, RequestStatus, RespondAction, RespondOutcome};

/// Pending requests created at or before this instant have expired.
pub fn pending_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(PENDING_REQUEST_TTL_MINUTES)
}

async fn purge_stale(conn: &mut SqliteConnection, user_a: i64, user_b: i64, now: DateTime<Utc>) -> CoreResult<()> {
    let purged = requests::purge_stale_pending_involving(conn, user_a, user_b, pending_cutoff(now)).await?;
    if purged > 0 {
        debug!(user_a, user_b, purged, "purged expired pending requests");
    }
    Ok(())
}

/// Propose a connection from `sender_id` to `receiver_id`.
pub async fn send(uow: &mut UnitOfWork, sender_id: i64, receiver_id: i64) -> CoreResult<Request> {
    if sender_id == receiver_id {
        return Err(CoreError::Invalid("cannot send a request to yourself"));
    }

    let now = uow.now();
    let conn = uow.conn();

    let receiver = users::get_user_by_id(conn, receiver_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(CoreError::NotFound("user"))?;

    purge_stale(conn, sender_id, receiver_id, now).await?;

    let sender = require_user(conn, sender_id).await?;
    if sender.is_matched || receiver.is_matched {
        return Err(CoreError::AlreadyMatched);
    }

    if requests::get_pending_request(conn, sender_id, receiver_id).await?.is_some() {
        return Err(CoreError::AlreadySent);
    }

    let request = requests::insert_pending_request(conn, sender_id, receiver_id, now)
        .await
        .map_err(|e| if is_unique_violation(&e) { CoreError::AlreadySent } else { e.into() })?;

    info!(request_id = request.id, sender_id, receiver_id, "request sent");
    Ok(request)
}

/// The newest pending request addressed to `receiver_id`, if any.
pub async fn incoming(uow: &mut UnitOfWork, receiver_id: i64) -> CoreResult<Option<IncomingRequest>> {
    let now = uow.now();
    let conn = uow.conn();

    purge_stale(conn, receiver_id, receiver_id, now).await?;

    let Some(request) = requests::newest_pending_for_receiver(conn, receiver_id).await? else {
        return Ok(None);
    };

    let sender = require_user(conn, request.sender_id).await?;
    let beacon = beacons::get_live_beacon(conn, sender.id, now).await?;

    Ok(Some(IncomingRequest {
        request,
        sender: sender.public_profile(),
        beacon,
    }))
}

/// Accept or decline a pending request addressed to `responder_id`.
///
/// Requests that do not exist, are addressed to someone else, or were already
/// answered all report `not_found`.
pub async fn respond(
    uow: &mut UnitOfWork,
    responder_id: i64,
    request_id: i64,
    action: RespondAction,
) -> CoreResult<RespondOutcome> {
    let now = uow.now();
    let conn = uow.conn();

    purge_stale(conn, responder_id, responder_id, now).await?;

    let request = requests::get_request(conn, request_id)
        .await?
        .filter(|r| r.receiver_id == responder_id && !r.status.is_terminal())
        .ok_or(CoreError::NotFound("request"))?;

    match action {
        RespondAction::Decline => {
            if !requests::resolve_pending_request(conn, request.id, responder_id, RequestStatus::Declined).await? {
                return Err(CoreError::NotFound("request"));
            }
            info!(request_id, responder_id, "request declined");
            Ok(RespondOutcome::Declined {
                request: Request {
                    status: RequestStatus::Declined,
                    ..request
                },
            })
        }
        RespondAction::Accept => {
            let (request, matched) = matches::establish(uow, &request).await?;
            Ok(RespondOutcome::Matched { request, matched })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::presence::check_in;
    use crate::services::profiles::set_active;
    use crate::test_support::{beacon_at, minutes_after, register, send_request, t0, test_db};

    #[tokio::test]
    async fn rejects_self_and_unknown_receivers() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;

        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        assert!(matches!(send(&mut uow, alice, alice).await, Err(CoreError::Invalid(_))));
        assert!(matches!(send(&mut uow, alice, 4242).await, Err(CoreError::NotFound("user"))));

        set_active(&mut uow, bob, false).await.unwrap();
        assert!(matches!(send(&mut uow, alice, bob).await, Err(CoreError::NotFound("user"))));
    }

    #[tokio::test]
    async fn second_send_is_already_sent_without_new_row() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;

        send_request(&db.pool, alice, bob, t0()).await;

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(5)).await.unwrap();
        let err = send(&mut uow, alice, bob).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadySent));
        assert_eq!(err.kind(), crate::error::ErrorKind::Conflict);
        assert_eq!(requests::count_requests_between(uow.conn(), alice, bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_pending_request_is_purged_and_can_be_resent() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;

        let first = send_request(&db.pool, alice, bob, t0()).await;

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(61)).await.unwrap();
        assert!(incoming(&mut uow, bob).await.unwrap().is_none());
        let again = send(&mut uow, alice, bob).await.unwrap();
        uow.commit().await.unwrap();

        assert_ne!(first.id, again.id);
        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(62)).await.unwrap();
        assert!(requests::get_request(uow.conn(), first.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn incoming_surfaces_the_newest_request_with_beacon() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;
        let carol = register(&db.pool, "carol").await;

        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        check_in(&mut uow, carol, beacon_at(0.0, 0.0, "red scarf")).await.unwrap();
        uow.commit().await.unwrap();

        send_request(&db.pool, alice, bob, minutes_after(1)).await;
        let newest = send_request(&db.pool, carol, bob, minutes_after(2)).await;

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(3)).await.unwrap();
        let shown = incoming(&mut uow, bob).await.unwrap().unwrap();
        assert_eq!(shown.request.id, newest.id);
        assert_eq!(shown.sender.username, "carol");
        assert_eq!(shown.beacon.unwrap().clue, "red scarf");

        assert!(incoming(&mut uow, alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decline_is_terminal() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;
        let request = send_request(&db.pool, alice, bob, t0()).await;

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(1)).await.unwrap();
        let outcome = respond(&mut uow, bob, request.id, RespondAction::Decline).await.unwrap();
        assert!(matches!(outcome, RespondOutcome::Declined { .. }));

        for action in [RespondAction::Decline, RespondAction::Accept] {
            let err = respond(&mut uow, bob, request.id, action).await.unwrap_err();
            assert!(matches!(err, CoreError::NotFound("request")));
        }

        let stored = requests::get_request(uow.conn(), request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Declined);
    }

    #[tokio::test]
    async fn only_the_receiver_may_respond() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;
        let mallory = register(&db.pool, "mallory").await;
        let request = send_request(&db.pool, alice, bob, t0()).await;

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(1)).await.unwrap();
        for responder in [alice, mallory] {
            let err = respond(&mut uow, responder, request.id, RespondAction::Accept).await.unwrap_err();
            assert!(matches!(err, CoreError::NotFound("request")));
        }
        assert!(!users::get_user_by_id(uow.conn(), bob).await.unwrap().unwrap().is_matched);
    }

    #[tokio::test]
    async fn matched_users_cannot_send() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;
        let carol = register(&db.pool, "carol").await;
        let request = send_request(&db.pool, alice, bob, t0()).await;

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(1)).await.unwrap();
        respond(&mut uow, bob, request.id, RespondAction::Accept).await.unwrap();
        assert!(matches!(send(&mut uow, carol, alice).await, Err(CoreError::AlreadyMatched)));
        assert!(matches!(send(&mut uow, bob, carol).await, Err(CoreError::AlreadyMatched)));
    }
}
