pub mod feedback;
pub mod matches;
pub mod presence;
pub mod profiles;
pub mod requests;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::constants::ACTOR_HEADER;
use crate::error::{CoreError, ErrorKind};
use crate::utils::Config;

pub type AppState = (SqlitePool, Config);

pub fn create_router(pool: SqlitePool, config: Config) -> Router {
    let cors_layer = create_cors_layer(&config);
    let app_state = (pool, config);

    Router::new()
        .route("/health", get(health_check))
        // Profiles
        .route("/api/users", post(profiles::register))
        .route("/api/me", get(profiles::me))
        .route("/api/me/bio", post(profiles::update_bio))
        .route("/api/me/active", post(profiles::set_active))
        // Presence
        .route("/api/checkin", post(presence::check_in))
        .route("/api/checkout", post(presence::check_out))
        .route("/api/live_status", get(presence::live_status))
        .route("/api/nearby", get(presence::nearby))
        // Requests
        .route("/api/requests", post(requests::send))
        .route("/api/requests/incoming", get(requests::incoming))
        .route("/api/requests/{id}/respond", post(requests::respond))
        // Match
        .route("/api/match", get(matches::status))
        .route("/api/match/reached", post(matches::reached))
        .route("/api/match/end", post(matches::end))
        // Feedback
        .route("/api/feedback", get(feedback::list).post(feedback::submit))
        .route("/api/feedback/target", get(feedback::target))
        .layer(cors_layer)
        .with_state(app_state)
}

fn create_cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        // Default to permissive for development
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

async fn health_check() -> &'static str {
    "OK"
}

/// The authenticated user, as forwarded by the gateway in `x-user-id`.
#[derive(Debug, Clone, Copy)]
pub struct Actor(pub i64);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(Actor)
            .ok_or(ApiError::MissingActor)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing or malformed x-user-id header")]
    MissingActor,

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::MissingActor => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::Core(err) => {
                let status = match err.kind() {
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::Conflict => StatusCode::CONFLICT,
                    ErrorKind::Internal => {
                        error!("request failed: {}", err);
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.code())
            }
        };

        // Storage details stay in the logs.
        let message = match &self {
            ApiError::Core(CoreError::Storage(_)) => "internal error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: code, message })).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;
