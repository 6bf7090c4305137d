use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use quiz_room_back::{
    config::AppConfig, dao::room_store::memory::MemoryRoomStore, routes, state::AppState,
};
use tower::ServiceExt;

async fn app() -> Router {
    let config = AppConfig {
        admin_token: "secret".into(),
        ..AppConfig::default()
    };
    let state = AppState::new(config);
    state
        .install_room_store(Arc::new(MemoryRoomStore::new()))
        .await;
    routes::router(state)
}

async fn send(app: &Router, request: Request<Body>) -> StatusCode {
    app.clone().oneshot(request).await.unwrap().status()
}

fn reset_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/admin/room/reset");
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn admin_route_without_token_is_unauthorized() {
    let app = app().await;
    assert_eq!(send(&app, reset_request(None)).await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_route_with_wrong_token_is_unauthorized() {
    let app = app().await;
    assert_eq!(
        send(&app, reset_request(Some("guess"))).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn admin_route_with_matching_token_runs() {
    let app = app().await;
    assert_eq!(send(&app, reset_request(Some("secret"))).await, StatusCode::OK);
}

#[tokio::test]
async fn question_zero_is_a_bad_request() {
    let app = app().await;

    let join = Request::builder()
        .method("POST")
        .uri("/student/join")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"username":"alice"}"#))
        .unwrap();
    assert_eq!(send(&app, join).await, StatusCode::OK);

    let result = Request::builder()
        .uri("/student/alice/result?question_id=0")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, result).await, StatusCode::BAD_REQUEST);

    let tally = Request::builder()
        .uri("/public/tally/0")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, tally).await, StatusCode::BAD_REQUEST);

    let tally = Request::builder()
        .uri("/public/tally/1")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, tally).await, StatusCode::OK);
}
