//! Router behavior for the public and private routes

mod common;

use common::{NEW_KEY, OLD_KEY, TestApp, claims_with_scope};
use gatehouse_auth::INVALID_TOKEN_MESSAGE;
use gatehouse_server::Messages;
use http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

const SCOPE_MESSAGE: &str = "You do not have the read:messages scope.";

#[tokio::test]
async fn test_public_route_ignores_authorization() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;
    let expected = Messages::default().public;

    let token = OLD_KEY.sign("key-1", &claims_with_scope("read:messages"));
    for authorization in [
        None,
        Some("Bearer garbage".to_string()),
        Some(format!("Bearer {token}")),
    ] {
        let (status, body) = app.get("/api/public", authorization.as_deref()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.message, expected);
    }
}

#[tokio::test]
async fn test_private_route_requires_token() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;

    let (status, body) = app.get("/api/private", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.message, INVALID_TOKEN_MESSAGE);
}

#[tokio::test]
async fn test_private_route_with_valid_token() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;

    let token = OLD_KEY.sign("key-1", &claims_with_scope("openid read:messages"));
    let (status, body) = app.get("/api/private", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.message, Messages::default().private);
}

#[tokio::test]
async fn test_wrongly_signed_token_rejected() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;

    let forged = NEW_KEY.sign("key-1", &claims_with_scope("read:messages"));
    let (status, body) = app.get("/api/private", Some(&format!("Bearer {forged}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.message, INVALID_TOKEN_MESSAGE);

    let requests = app.idp.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;

    let mut claims = claims_with_scope("read:messages");
    claims["exp"] = json!(1_000_000_000);
    let token = OLD_KEY.sign("key-1", &claims);

    let (status, body) = app.get("/api/private", Some(&format!("Bearer {token}"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body.message, INVALID_TOKEN_MESSAGE);
}

#[tokio::test]
async fn test_missing_scope_has_distinct_message() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;

    for scope in ["", "openid profile", "read:messages:all"] {
        let token = OLD_KEY.sign("key-1", &claims_with_scope(scope));
        let (status, body) = app.get("/api/private", Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.message, SCOPE_MESSAGE);
    }
}

#[tokio::test]
async fn test_tokens_from_rotated_keys_accepted() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;

    let old_token = OLD_KEY.sign("key-1", &claims_with_scope("read:messages"));
    let (status, _) = app.get("/api/private", Some(&format!("Bearer {old_token}"))).await;
    assert_eq!(status, StatusCode::OK);

    app.publish(vec![OLD_KEY.jwk("key-1"), NEW_KEY.jwk("key-2")]).await;

    let new_token = NEW_KEY.sign("key-2", &claims_with_scope("read:messages"));
    for token in [&new_token, &old_token] {
        let (status, _) = app.get("/api/private", Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_unknown_route_not_found() {
    let app = TestApp::with_keys(vec![OLD_KEY.jwk("key-1")]).await;
    let response = tower::ServiceExt::oneshot(
        app.router.clone(),
        http::Request::builder()
            .uri("/api/other")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
