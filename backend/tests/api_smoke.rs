use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use spotlight::db::{get_db_pool, migrations::run_migrations, DatabaseConfig};
use spotlight::{handlers::create_router, Config};
use tempfile::NamedTempFile;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _file: NamedTempFile,
}

async fn app() -> TestApp {
    let file = NamedTempFile::new().unwrap();
    let database_url = format!("sqlite://{}", file.path().display());
    let pool = get_db_pool(&DatabaseConfig {
        database_url: database_url.clone(),
        max_connections: 4,
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();

    let config = Config {
        database_url,
        port: 0,
        allowed_origins: None,
    };
    TestApp {
        router: create_router(pool, config),
        _file: file,
    }
}

async fn call(app: &TestApp, method: &str, uri: &str, actor: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header("x-user-id", actor.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn signup(app: &TestApp, username: &str) -> i64 {
    let (status, body) = call(app, "POST", "/api/users", None, Some(json!({ "username": username }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let app = app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_actor_is_rejected() {
    let app = app().await;
    let (status, body) = call(&app, "GET", "/api/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = app().await;
    signup(&app, "alice").await;
    let (status, body) = call(&app, "POST", "/api/users", None, Some(json!({ "username": "alice" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "username_taken");
}

#[tokio::test]
async fn checkin_shows_up_nearby() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let beacon = json!({ "lat": 48.8566, "lon": 2.3522, "place": "Cafe", "intent": "coffee", "clue": "green scarf" });
    let (status, _) = call(&app, "POST", "/api/checkin", Some(alice), Some(beacon)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "GET", "/api/live_status", Some(alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["live"], true);

    let (status, body) = call(&app, "GET", "/api/nearby?lat=48.857&lon=2.353", Some(bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["username"], "alice");
    assert_eq!(list[0]["clue"], "green scarf");

    let (status, body) = call(&app, "GET", "/api/nearby?lat=north&lon=2.353", Some(bob), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_coordinates");
}

#[tokio::test]
async fn request_flow_over_http() {
    let app = app().await;
    let alice = signup(&app, "alice").await;
    let bob = signup(&app, "bob").await;

    let (status, request) = call(&app, "POST", "/api/requests", Some(alice), Some(json!({ "receiver_id": bob }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, "POST", "/api/requests", Some(alice), Some(json!({ "receiver_id": bob }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_sent");

    let (_, incoming) = call(&app, "GET", "/api/requests/incoming", Some(bob), None).await;
    assert_eq!(incoming["sender"]["username"], "alice");

    let uri = format!("/api/requests/{}/respond", request["id"]);
    let (status, body) = call(&app, "POST", &uri, Some(bob), Some(json!({ "action": "wave" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_action");

    let (status, body) = call(&app, "POST", &uri, Some(bob), Some(json!({ "action": "accept" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "matched");

    let (_, view) = call(&app, "GET", "/api/match", Some(alice), None).await;
    assert_eq!(view["state"], "matched");
    assert_eq!(view["partner"]["username"], "bob");

    let (status, body) = call(&app, "POST", "/api/match/end", Some(alice), Some(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "reason_required");

    let (status, body) = call(&app, "POST", "/api/match/end", Some(alice), Some(json!({ "reason": "running late" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "applied");

    let (_, target) = call(&app, "GET", "/api/feedback/target", Some(bob), None).await;
    assert_eq!(target["username"], "alice");

    let feedback = json!({ "target_id": alice, "rating": 9, "comment": "nice chat" });
    let (status, receipt) = call(&app, "POST", "/api/feedback", Some(bob), Some(feedback)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["trust_score"], 104);

    let (_, summary) = call(&app, "GET", "/api/feedback?page=1&per_page=10", Some(alice), None).await;
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["reviews"][0]["by"], "bob");
}
