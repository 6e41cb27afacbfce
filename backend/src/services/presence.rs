use chrono::Duration;
use tracing::{debug, info};

use super::require_user;
use crate::constants::{BEACON_DEFAULT_TTL_MINUTES, BEACON_SCHEDULED_TTL_MINUTES};
use crate::db::{beacons, UnitOfWork};
use crate::error::{CoreResult, Outcome};
use crate::models::{Beacon, NewBeacon};

/// Beacons with a proposed meet time stay up longer.
pub fn beacon_ttl(meet_time: Option<&str>) -> Duration {
    match meet_time {
        Some(_) => Duration::minutes(BEACON_SCHEDULED_TTL_MINUTES),
        None => Duration::minutes(BEACON_DEFAULT_TTL_MINUTES),
    }
}

/// Replace the owner's beacon with a fresh one.
///
/// Delete and insert run in the caller's unit, so no commit point ever shows
/// two beacons or none for this owner. Expired beacons of other users are
/// swept on the way.
pub async fn check_in(uow: &mut UnitOfWork, owner_id: i64, input: NewBeacon) -> CoreResult<Beacon> {
    let input = input.normalized()?;
    let now = uow.now();
    let conn = uow.conn();

    require_user(conn, owner_id).await?;

    let swept = beacons::delete_expired_beacons(conn, now).await?;
    if swept > 0 {
        debug!(swept, "removed expired beacons");
    }

    let replaced = beacons::delete_beacon_for_owner(conn, owner_id).await?;
    let expires_at = now + beacon_ttl(input.meet_time.as_deref());

    let beacon = beacons::insert_beacon(
        conn,
        owner_id,
        input.lat,
        input.lon,
        &input.place,
        &input.intent,
        input.meet_time.as_deref(),
        &input.clue,
        now,
        expires_at,
    )
    .await?;

    info!(owner_id, beacon_id = beacon.id, %expires_at, replaced = replaced > 0, "beacon live");
    Ok(beacon)
}

/// Take the owner's beacon down. Calling it with nothing live is fine.
pub async fn check_out(uow: &mut UnitOfWork, owner_id: i64) -> CoreResult<Outcome<()>> {
    let removed = beacons::delete_beacon_for_owner(uow.conn(), owner_id).await?;

    if removed > 0 {
        info!(owner_id, "beacon taken down");
        Ok(Outcome::Applied(()))
    } else {
        debug!(owner_id, "check-out with no beacon");
        Ok(Outcome::AlreadyApplied(()))
    }
}

pub async fn is_live(uow: &mut UnitOfWork, owner_id: i64) -> CoreResult<bool> {
    Ok(live_beacon(uow, owner_id).await?.is_some())
}

pub async fn live_beacon(uow: &mut UnitOfWork, owner_id: i64) -> CoreResult<Option<Beacon>> {
    let now = uow.now();
    Ok(beacons::get_live_beacon(uow.conn(), owner_id, now).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::test_support::{beacon_at, minutes_after, register, t0, test_db};

    #[test]
    fn meet_time_extends_ttl() {
        assert_eq!(beacon_ttl(None), Duration::minutes(90));
        assert_eq!(beacon_ttl(Some("19:00")), Duration::minutes(120));
    }

    #[tokio::test]
    async fn repeated_check_ins_leave_one_beacon() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;

        for i in 0..5 {
            let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(i)).await.unwrap();
            check_in(&mut uow, alice, beacon_at(0.0, 0.0, &format!("clue {i}"))).await.unwrap();
            uow.commit().await.unwrap();
        }

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(5)).await.unwrap();
        assert_eq!(beacons::count_beacons_for_owner(uow.conn(), alice).await.unwrap(), 1);
        let live = live_beacon(&mut uow, alice).await.unwrap().unwrap();
        assert_eq!(live.clue, "clue 4");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_check_ins_leave_one_beacon() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;

        let check_in_with = |clue: &'static str| {
            let pool = db.pool.clone();
            async move {
                let mut uow = UnitOfWork::begin_at(&pool, minutes_after(1)).await?;
                let beacon = check_in(&mut uow, alice, beacon_at(0.0, 0.0, clue)).await?;
                uow.commit().await?;
                Ok::<_, CoreError>(beacon)
            }
        };

        let (first, second) = tokio::join!(check_in_with("left"), check_in_with("right"));
        first.unwrap();
        second.unwrap();

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(2)).await.unwrap();
        assert_eq!(beacons::count_beacons_for_owner(uow.conn(), alice).await.unwrap(), 1);
        let live = live_beacon(&mut uow, alice).await.unwrap().unwrap();
        assert!(live.clue == "left" || live.clue == "right");
    }

    #[tokio::test]
    async fn beacon_expires_after_default_window() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;

        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        let beacon = check_in(&mut uow, alice, beacon_at(1.0, 1.0, "hat")).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(beacon.expires_at, t0() + Duration::minutes(90));

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(89)).await.unwrap();
        assert!(is_live(&mut uow, alice).await.unwrap());
        uow.rollback().await.unwrap();

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(90)).await.unwrap();
        assert!(!is_live(&mut uow, alice).await.unwrap());
    }

    #[tokio::test]
    async fn check_out_is_idempotent() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;

        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        check_in(&mut uow, alice, beacon_at(1.0, 1.0, "hat")).await.unwrap();
        assert_eq!(check_out(&mut uow, alice).await.unwrap(), Outcome::Applied(()));
        assert_eq!(check_out(&mut uow, alice).await.unwrap(), Outcome::AlreadyApplied(()));
        assert!(!is_live(&mut uow, alice).await.unwrap());
    }

    #[tokio::test]
    async fn check_in_for_unknown_user_fails() {
        let db = test_db().await;
        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        let err = check_in(&mut uow, 999, beacon_at(1.0, 1.0, "hat")).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound("user")));
    }
}
