/// Endpoint tests for registration, login and logout
///
/// Run against the in-memory store; no external services needed.

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::{json, Value};
use tasknest_shared::store::ResourceStore;

#[tokio::test]
async fn test_register_returns_summary_without_password() {
    let ctx = TestContext::new();

    let response = ctx
        .json(
            "POST",
            "/register",
            None,
            json!({
                "username": "alice",
                "password": "pw1",
                "email": "alice@example.com",
                "first_name": "Alice"
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["message"], "User registered successfully.");
    assert_eq!(response.body["user"]["username"], "alice");
    assert_eq!(response.body["user"]["email"], "alice@example.com");
    assert_eq!(response.body["user"]["first_name"], "Alice");
    assert!(response.body["user"].get("password").is_none());
    assert!(response.body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_duplicate_username_conflicts() {
    let ctx = TestContext::new();

    assert_eq!(ctx.register("alice", "pw1").await.status, StatusCode::CREATED);

    let second = ctx.register("alice", "other").await;
    assert_eq!(second.status, StatusCode::CONFLICT);
    assert_eq!(second.body["error"], "conflict");
    assert_eq!(
        second.body["message"],
        "A user with that username already exists."
    );
}

#[tokio::test]
async fn test_register_with_blank_email() {
    let ctx = TestContext::new();

    let response = ctx
        .json(
            "POST",
            "/register",
            None,
            json!({ "username": "carol", "password": "pw1", "email": "" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["user"]["email"], Value::Null);

    let invalid = ctx
        .json(
            "POST",
            "/register",
            None,
            json!({ "username": "dave", "password": "pw1", "email": "nope" }),
        )
        .await;
    assert_eq!(invalid.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(invalid.body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_register_validation_errors() {
    let ctx = TestContext::new();

    let response = ctx
        .json("POST", "/register", None, json!({ "username": "bob" }))
        .await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"], "validation_error");
    assert_eq!(response.body["details"][0]["field"], "password");
}

#[tokio::test]
async fn test_login_sets_session_cookie() {
    let ctx = TestContext::new();
    ctx.register("alice", "pw1").await;

    let response = ctx.login("alice", "pw1").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Login successful.");

    let cookie = response.session_cookie().expect("session cookie");
    let me = ctx.empty("GET", "/me", Some(&cookie)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["username"], "alice");
}

#[tokio::test]
async fn test_bad_credentials_are_indistinguishable() {
    let ctx = TestContext::new();
    ctx.register("alice", "pw1").await;

    let wrong_password = ctx.login("alice", "nope").await;
    let unknown_user = ctx.login("mallory", "pw1").await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body["message"], "Invalid credentials.");
    assert!(wrong_password.session_cookie().is_none());
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let ctx = TestContext::new();

    for (method, uri) in [
        ("GET", "/tasks"),
        ("POST", "/logout"),
        ("GET", "/me"),
        ("DELETE", "/profile/00000000-0000-0000-0000-000000000000"),
    ] {
        let response = ctx.empty(method, uri, None).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(response.body["error"], "unauthorized");
    }

    let forged = ctx
        .empty("GET", "/tasks", Some("tasknest_session=not-a-real-session"))
        .await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let ctx = TestContext::new();
    let alice = ctx.account("alice").await;

    let response = ctx.empty("POST", "/logout", Some(&alice.cookie)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "Logout successful.");

    let after = ctx.empty("GET", "/tasks", Some(&alice.cookie)).await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_records_last_login() {
    let ctx = TestContext::new();
    let alice = ctx.account("alice").await;

    let user = ctx.store.find_user(alice.id).await.unwrap().unwrap();
    assert!(user.last_login.is_some());
}

#[tokio::test]
async fn test_health_is_public() {
    let ctx = TestContext::new();

    let response = ctx.empty("GET", "/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
    assert_eq!(response.body["store"], "memory");
    assert_eq!(response.body["images"], "mock");
    assert_eq!(
        response.headers.get("x-content-type-options").unwrap(),
        "nosniff"
    );
}
