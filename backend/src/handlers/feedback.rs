use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;

use super::{Actor, ApiResult, AppState};
use crate::constants::DEFAULT_FEEDBACK_PER_PAGE;
use crate::db::UnitOfWork;
use crate::error::CoreError;
use crate::models::{FeedbackReceipt, FeedbackSummary, Page, PublicProfile};
use crate::services::{matches, trust};

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub target_id: i64,
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl FeedbackQuery {
    /// No pagination parameters means the full list.
    fn page(&self) -> Result<Option<Page>, CoreError> {
        match (self.page, self.per_page) {
            (None, None) => Ok(None),
            (page, per_page) => Page::new(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_FEEDBACK_PER_PAGE)).map(Some),
        }
    }
}

pub async fn target(State((pool, _)): State<AppState>, Actor(user_id): Actor) -> ApiResult<PublicProfile> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let profile = matches::feedback_target(&mut uow, user_id).await?;
    uow.commit().await?;
    Ok(Json(profile))
}

pub async fn submit(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Json(req): Json<FeedbackRequest>,
) -> ApiResult<FeedbackReceipt> {
    let mut uow = UnitOfWork::begin(&pool).await?;
    let receipt = trust::submit_feedback(&mut uow, user_id, req.target_id, req.rating, &req.comment).await?;
    uow.commit().await?;
    Ok(Json(receipt))
}

pub async fn list(
    State((pool, _)): State<AppState>,
    Actor(user_id): Actor,
    Query(query): Query<FeedbackQuery>,
) -> ApiResult<FeedbackSummary> {
    let page = query.page()?;
    let mut uow = UnitOfWork::begin(&pool).await?;
    let summary = trust::feedback_for(&mut uow, user_id, page).await?;
    uow.commit().await?;
    Ok(Json(summary))
}
