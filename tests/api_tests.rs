use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use roster::config::Config;
use roster::db::Store;
use roster::state::SharedState;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_ID: &str = "9999";
const ADMIN_SECRET: &str = "bootstrap-secret";

async fn spawn_app() -> (Router, TempDir) {
    let mut config = Config::default();
    config.security.argon2_memory_cost_kib = 64;
    config.security.argon2_time_cost = 1;
    config.security.argon2_parallelism = 1;
    config.server.secure_cookies = false;
    config.bootstrap.password = Some(ADMIN_SECRET.to_string());

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("roster.db");
    let store = Store::new(&format!("sqlite:{}", path.display()))
        .await
        .expect("Failed to open test database");

    let shared =
        Arc::new(SharedState::with_store(config.clone(), store).expect("Failed to build state"));
    roster::services::bootstrap::ensure_admin(shared.accounts.as_ref(), &config.bootstrap)
        .await
        .expect("Failed to bootstrap admin");

    let state = roster::api::create_app_state(shared, None);
    (roster::api::router(state).await, dir)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

async fn login(app: &Router, identifier: &str, secret: &str) -> String {
    let (status, headers, body) = send(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "identifier": identifier, "secret": secret })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");

    headers
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("login should set a session cookie")
        .to_string()
}

async fn create(app: &Router, cookie: &str, identifier: &str, is_admin: bool) -> i64 {
    let (status, _, body) = send(
        app,
        "POST",
        "/api/accounts",
        Some(cookie),
        Some(json!({
            "login_identifier": identifier,
            "secret": "password1",
            "is_admin": is_admin,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _dir) = spawn_app().await;

    let (status, headers, body) = send(&app, "GET", "/api/system/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], true);
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (app, _dir) = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/system/health")
                .header("x-request-id", "trace-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers().get("x-request-id").unwrap(), "trace-123");
}

#[tokio::test]
async fn test_auth_required() {
    let (app, _dir) = spawn_app().await;

    let (status, _, body) = send(&app, "GET", "/api/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    let (status, _, _) = send(&app, "GET", "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, _) = send(
        &app,
        "GET",
        "/api/auth/me",
        Some("id=not-a-real-session"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_me() {
    let (app, _dir) = spawn_app().await;
    let cookie = login(&app, ADMIN_ID, ADMIN_SECRET).await;

    let (status, _, body) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["login_identifier"], ADMIN_ID);
    assert_eq!(body["data"]["is_admin"], true);
    assert!(body["data"].get("secret_hash").is_none());

    let (status, _, _) = send(&app, "POST", "/api/auth/logout", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&app, "GET", "/api/auth/me", Some(&cookie), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_invalid_credentials_share_one_message() {
    let (app, _dir) = spawn_app().await;

    let (status, _, wrong_secret) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "identifier": ADMIN_ID, "secret": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "employee_id": "4242", "password": "nope-nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(wrong_secret["error"], unknown["error"]);
    assert_eq!(wrong_secret["error_code"], "INVALID_CREDENTIALS");
    assert_eq!(unknown["error_code"], "INVALID_CREDENTIALS");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "identifier": "  ", "secret": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_lockout_returns_retry_after() {
    let (app, _dir) = spawn_app().await;

    for _ in 0..9 {
        let (status, _, _) = send(
            &app,
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "identifier": ADMIN_ID, "secret": "wrong-secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, headers, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "identifier": ADMIN_ID, "secret": "wrong-secret" })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error_code"], "ACCOUNT_LOCKED");
    assert!(headers.contains_key(header::RETRY_AFTER));

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "identifier": ADMIN_ID, "secret": ADMIN_SECRET })),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let (app, _dir) = spawn_app().await;
    let admin = login(&app, ADMIN_ID, ADMIN_SECRET).await;
    create(&app, &admin, "2000", false).await;

    let user = login(&app, "2000", "password1").await;
    let (status, _, body) = send(&app, "GET", "/api/accounts", Some(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "FORBIDDEN");

    let (status, _, _) = send(&app, "GET", "/api/auth/me", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_account_lifecycle_endpoints() {
    let (app, _dir) = spawn_app().await;
    let admin = login(&app, ADMIN_ID, ADMIN_SECRET).await;

    let id = create(&app, &admin, "5000", false).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/accounts",
        Some(&admin),
        Some(json!({ "login_identifier": "5000", "secret": "password1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "IDENTIFIER_CONFLICT");
    assert_eq!(body["field"], "login_identifier");

    let (status, _, body) = send(
        &app,
        "PATCH",
        &format!("/api/accounts/{id}"),
        Some(&admin),
        Some(json!({ "display_name": "Jane Doe" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["display_name"], "Jane Doe");

    let (status, _, body) = send(
        &app,
        "DELETE",
        &format!("/api/accounts/{id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_deleted"], true);

    let (status, _, body) = send(
        &app,
        "PATCH",
        &format!("/api/accounts/{id}"),
        Some(&admin),
        Some(json!({ "display_name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "CANNOT_UPDATE_DELETED");

    let reused = create(&app, &admin, "5000", false).await;
    assert_ne!(reused, id);

    let (status, _, body) = send(
        &app,
        "POST",
        &format!("/api/accounts/{id}/restore"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "IDENTIFIER_CONFLICT");

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/accounts/history/5000",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["id"].as_i64(), Some(reused));

    let (status, _, body) = send(&app, "GET", "/api/accounts/deleted", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, _, body) = send(
        &app,
        "GET",
        &format!("/api/accounts/{id}/audit"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"][0]["action"], "SOFT_DELETE");

    let (status, _, _) = send(&app, "GET", "/api/accounts/999", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&app, "GET", "/api/accounts/0", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_guards() {
    let (app, _dir) = spawn_app().await;
    let admin = login(&app, ADMIN_ID, ADMIN_SECRET).await;

    let (_, _, me) = send(&app, "GET", "/api/auth/me", Some(&admin), None).await;
    let admin_id = me["data"]["id"].as_i64().unwrap();

    let (status, _, body) = send(
        &app,
        "DELETE",
        &format!("/api/accounts/{admin_id}"),
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "CANNOT_DELETE_SELF");

    let (status, _, body) = send(
        &app,
        "PATCH",
        &format!("/api/accounts/{admin_id}"),
        Some(&admin),
        Some(json!({ "is_admin": false })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "LAST_ADMIN");

    let (status, _, body) = send(&app, "GET", "/api/accounts/admin-count", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["count"], 1);
    assert_eq!(body["data"]["can_delete"], false);

    let second = create(&app, &admin, "1001", true).await;
    let other = create(&app, &admin, "1002", false).await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/accounts/bulk-delete",
        Some(&admin),
        Some(json!({ "ids": [second, other] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], 2);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/accounts/bulk-restore",
        Some(&admin),
        Some(json!({ "ids": [second, other, 999] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["restored_count"], 2);
    assert_eq!(body["data"]["not_found"], json!([999]));

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/accounts/bulk-delete",
        Some(&admin),
        Some(json!({ "ids": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_stats_and_purge_dry_run() {
    let (app, _dir) = spawn_app().await;
    let admin = login(&app, ADMIN_ID, ADMIN_SECRET).await;

    for identifier in ["3000", "3001", "3002"] {
        create(&app, &admin, identifier, false).await;
    }

    let (status, _, body) = send(&app, "GET", "/api/accounts/stats", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 4);
    assert_eq!(body["data"]["active_admins"], 1);

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/accounts?search=300&page_size=2",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["total_pages"], 2);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/accounts/purge",
        Some(&admin),
        Some(json!({ "days": 30, "dry_run": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["dry_run"], true);
    assert_eq!(body["data"]["count"], 0);

    let (status, _, _) = send(
        &app,
        "POST",
        "/api/accounts/purge",
        Some(&admin),
        Some(json!({ "days": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
