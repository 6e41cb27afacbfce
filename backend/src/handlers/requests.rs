use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;

use super::{Actor, ApiResult, AppState};
use crate::db::UnitOfWork;
use crate::models::{IncomingRequest, Request, RespondAction, RespondOutcome};
use crate::services::requests;

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub receiver_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub action: String,
}

pub async fn send(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Json(req): Json<SendRequest>,
) -> ApiResult<Request> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let request = requests::send(&mut uow, user_id, req.receiver_id).await?;
    uow.commit().await?;
    Ok(Json(request))
}

pub async fn incoming(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
) -> ApiResult<Option<IncomingRequest>> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let incoming = requests::incoming(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(incoming))
}

pub async fn respond(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Path(request_id): Path<i64>,
    Json(req): Json<RespondRequest>,
) -> ApiResult<RespondOutcome> {
    let action: RespondAction = req.action.parse()?;
    let mut uow = UnitOfWork::begin(&pool).await?;
    let outcome = requests::respond(&mut uow, user_id, request_id, action).await?;
    uow.commit().await?;
    Ok(Json(outcome))
}
