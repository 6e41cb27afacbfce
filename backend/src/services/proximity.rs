use tracing::debug;

use crate::constants::{is_valid_coordinate, NEARBY_RADIUS_KM, TEXT_CHAR_LIMIT};
use crate::db::{beacons, UnitOfWork};
use crate::error::{CoreError, CoreResult};
use crate::models::users::{split_tags, truncate_chars};
use crate::models::NearbyBeacon;
use crate::utils::geo::haversine_km;

/// Parse raw query-string coordinates. Anything that is not a finite WGS84
/// degree value is a validation error.
pub fn parse_coordinates(lat: &str, lon: &str) -> CoreResult<(f64, f64)> {
    let lat: f64 = lat.trim().parse().map_err(|_| CoreError::InvalidCoordinates)?;
    let lon: f64 = lon.trim().parse().map_err(|_| CoreError::InvalidCoordinates)?;

    if !is_valid_coordinate(lat, lon) {
        return Err(CoreError::InvalidCoordinates);
    }
    Ok((lat, lon))
}

/// Live beacons within the standard radius of (`lat`, `lon`), nearest first.
pub async fn nearby(uow: &mut UnitOfWork, requester: i64, lat: f64, lon: f64) -> CoreResult<Vec<NearbyBeacon>> {
    nearby_within(uow, requester, lat, lon, NEARBY_RADIUS_KM).await
}

pub async fn nearby_within(
    uow: &mut UnitOfWork,
    requester: i64,
    lat: f64,
    lon: f64,
    radius_km: f64,
) -> CoreResult<Vec<NearbyBeacon>> {
    if !is_valid_coordinate(lat, lon) {
        return Err(CoreError::InvalidCoordinates);
    }

    let now = uow.now();
    let candidates = beacons::list_discoverable(uow.conn(), requester, now).await?;
    let scanned = candidates.len();

    let mut found: Vec<NearbyBeacon> = candidates
        .into_iter()
        .filter_map(|row| {
            let distance_km = haversine_km(lat, lon, row.beacon.lat, row.beacon.lon);
            (distance_km <= radius_km).then(|| NearbyBeacon {
                user_id: row.beacon.owner_id,
                username: row.username,
                trust_score: row.trust_score,
                bio: truncate_chars(&row.bio, TEXT_CHAR_LIMIT),
                vibe_tags: split_tags(&row.vibe_tags),
                lat: row.beacon.lat,
                lon: row.beacon.lon,
                place: row.beacon.place,
                intent: row.beacon.intent,
                meet_time: row.beacon.meet_time,
                clue: row.beacon.clue,
                expires_at: row.beacon.expires_at,
                distance_km,
            })
        })
        .collect();

    found.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

    debug!(requester, scanned, matched = found.len(), "nearby lookup");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::presence::check_in;
    use crate::test_support::{beacon_at, minutes_after, register, t0, test_db};

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_coordinates("abc", "0"), Err(CoreError::InvalidCoordinates)));
        assert!(matches!(parse_coordinates("0", ""), Err(CoreError::InvalidCoordinates)));
        assert!(matches!(parse_coordinates("95", "0"), Err(CoreError::InvalidCoordinates)));
        assert!(matches!(parse_coordinates("NaN", "0"), Err(CoreError::InvalidCoordinates)));
        assert_eq!(parse_coordinates(" 12.5 ", "-3").unwrap(), (12.5, -3.0));
    }

    #[tokio::test]
    async fn finds_beacon_with_clue_inside_radius() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;

        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        check_in(&mut uow, alice, beacon_at(0.0, 0.0, "blue jacket")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(1)).await.unwrap();
        let found = nearby(&mut uow, bob, 0.01, 0.01).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_id, alice);
        assert_eq!(found[0].username, "alice");
        assert_eq!(found[0].clue, "blue jacket");
        assert!(found[0].distance_km < 2.0);
    }

    #[tokio::test]
    async fn excludes_self_far_and_expired() {
        let db = test_db().await;
        let alice = register(&db.pool, "alice").await;
        let bob = register(&db.pool, "bob").await;
        let carol = register(&db.pool, "carol").await;

        let mut uow = UnitOfWork::begin_at(&db.pool, t0()).await.unwrap();
        check_in(&mut uow, alice, beacon_at(0.0, 0.0, "near")).await.unwrap();
        check_in(&mut uow, carol, beacon_at(0.5, 0.5, "far")).await.unwrap();
        check_in(&mut uow, bob, beacon_at(0.0, 0.0, "me")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(10)).await.unwrap();
        let found = nearby(&mut uow, bob, 0.0, 0.0).await.unwrap();
        assert_eq!(found.iter().map(|b| b.user_id).collect::<Vec<_>>(), vec![alice]);
        uow.rollback().await.unwrap();

        let mut uow = UnitOfWork::begin_at(&db.pool, minutes_after(91)).await.unwrap();
        assert!(nearby(&mut uow, bob, 0.0, 0.0).await.unwrap().is_empty());
    }
}
