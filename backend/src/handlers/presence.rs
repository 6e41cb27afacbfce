use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::{Actor, ApiResult, AppState};
use crate::db::UnitOfWork;
use crate::error::Outcome;
use crate::models::{Beacon, NearbyBeacon, NewBeacon};
use crate::services::{presence, proximity};

#[derive(Debug, Serialize)]
pub struct LiveStatus {
    pub live: bool,
    pub beacon: Option<Beacon>,
}

/// Raw query strings; parsing is left to the core so bad input maps to `invalid_coordinates`.
#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    #[serde(default)]
    pub lat: String,
    #[serde(default)]
    pub lon: String,
}

pub async fn check_in(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Json(req): Json<NewBeacon>,
) -> ApiResult<Beacon> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let beacon = presence::check_in(&mut uow, user_id, req).await?;
    uow.commit().await?;
    Ok(Json(beacon))
}

pub async fn check_out(State((pool, _)): State<AppState>, Actor(user_id): Actor) -> ApiResult<Outcome<()>> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let outcome = presence::check_out(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(outcome))
}

pub async fn live_status(State((pool, _)): State<AppState>, Actor(user_id): Actor) -> ApiResult<LiveStatus> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let beacon = presence::live_beacon(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(LiveStatus {
        live: beacon.is_some(),
        beacon,
    }))
}

pub async fn nearby(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Vec<NearbyBeacon>> {
    let (lat, lon) = proximity::parse_coordinates(&query.lat, &query.lon)?;
    let mut uow = UnitOfWork::begin(&pool).await?;
    let beacons = proximity::nearby(&mut uow, user_id, lat, lon).await?;
    uow.commit().await?;
    Ok(Json(beacons))
}
