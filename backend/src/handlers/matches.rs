use axum::{extract::State, response::Json};
use serde::Deserialize;

use super::{Actor, ApiResult, AppState};
use crate::db::UnitOfWork;
use crate::error::Outcome;
use crate::models::{MatchRecord, MatchView};
use crate::services::matches;

#[derive(Debug, Default, Deserialize)]
pub struct EndRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn status(State((pool, _)): State<AppState>, Actor(user_id): Actor) -> ApiResult<MatchView> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let view = matches::match_status(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(view))
}

pub async fn reached(State((pool, _)): State<AppState>, Actor(user_id): Actor) -> ApiResult<MatchRecord> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let record = matches::mark_reached(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(record))
}

pub async fn end(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Json(req): Json<EndRequest>,
) -> ApiResult<Outcome<MatchRecord>> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let outcome = matches::end_match(&mut uow, user_id, req.reason.as_deref()).await?;
    uow.commit().await?;
    Ok(Json(outcome))
}
