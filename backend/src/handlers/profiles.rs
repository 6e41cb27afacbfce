use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;

use super::{Actor, ApiError, ApiResult, AppState};
use crate::db::UnitOfWork;
use crate::models::{NewProfile, PublicProfile, UserInfo};
use crate::services::profiles;

#[derive(Debug, Deserialize)]
pub struct BioRequest {
    pub bio: String,
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

pub async fn register(
    State((pool, _)): State<AppState>,
    Json(req): Json<NewProfile>,
) -> Result<(StatusCode, Json<PublicProfile>), ApiError> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let user = profiles::register(&mut uow, req).await?;
    uow.commit().await?;
    Ok((StatusCode::CREATED, Json(user.public_profile())))
}

pub async fn me(State((pool, _)): State<AppState>, Actor(user_id): Actor) -> ApiResult<UserInfo> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let info = profiles::user_info(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(info))
}

pub async fn update_bio(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Json(req): Json<BioRequest>,
) -> ApiResult<PublicProfile> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let user = profiles::update_bio(&mut uow, user_id, &req.bio).await?;
    uow.commit().await?;
    Ok(Json(user.public_profile()))
}

pub async fn set_active(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Json(req): Json<ActiveRequest>,
) -> ApiResult<UserInfo> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let user = profiles::set_active(&mut uow, user_id, req.active).await?;
    uow.commit().await?;
    Ok(Json(user.info()))
}
