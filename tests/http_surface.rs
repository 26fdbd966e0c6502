mod common;

use common::{header, lazy_pool, send_raw_with_method, spawn_app};
use serde_json::Value;

#[tokio::test]
async fn health_answers_without_auth() {
    let addr = spawn_app(lazy_pool()).await;
    let (status, head, body) = send_raw_with_method(addr, "GET", "/health", &[], None).await;
    assert_eq!(status, 200);
    assert_eq!(body, "Backend is running");
    assert!(header(&head, "x-request-id").is_some_and(|id| id.starts_with("req-")));
}

#[tokio::test]
async fn incoming_request_id_is_echoed() {
    let addr = spawn_app(lazy_pool()).await;
    let (_, head, _) =
        send_raw_with_method(addr, "GET", "/health", &[("x-request-id", "trace-me-42")], None)
            .await;
    assert_eq!(header(&head, "x-request-id"), Some("trace-me-42"));
}

#[tokio::test]
async fn resources_require_a_session() {
    let addr = spawn_app(lazy_pool()).await;
    for path in [
        "/api/v1/accounts/accounts",
        "/api/v1/accounts/transactions",
        "/api/v1/accounts/cash-flow-views",
        "/api/v1/accounts/import-reports",
        "/api/v1/users/check_auth",
    ] {
        let (status, _, body) = send_raw_with_method(addr, "GET", path, &[], None).await;
        assert_eq!(status, 401, "{path}");
        let json: Value = serde_json::from_str(&body).expect("error json");
        assert_eq!(json["error"]["code"], "unauthorized");
    }
}

#[tokio::test]
async fn malformed_session_keys_are_rejected_before_lookup() {
    let addr = spawn_app(lazy_pool()).await;
    let (status, _, _) = send_raw_with_method(
        addr,
        "GET",
        "/api/v1/accounts/tags",
        &[("Authorization", "Bearer short")],
        None,
    )
    .await;
    assert_eq!(status, 401);

    let (status, _, _) = send_raw_with_method(
        addr,
        "GET",
        "/api/v1/accounts/tags",
        &[("Cookie", "sessionid=../../etc/passwd")],
        None,
    )
    .await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn broken_json_uses_the_error_envelope() {
    let addr = spawn_app(lazy_pool()).await;
    let (status, _, body) =
        send_raw_with_method(addr, "POST", "/api/v1/users", &[], Some("{\"username\":")).await;
    assert_eq!(status, 400);
    let json: Value = serde_json::from_str(&body).expect("error json");
    assert_eq!(json["error"]["code"], "invalid_request");

    let (status, _, body) = send_raw_with_method(
        addr,
        "POST",
        "/api/v1/users/login",
        &[],
        Some(r#"{"username": 5}"#),
    )
    .await;
    assert_eq!(status, 422);
    let json: Value = serde_json::from_str(&body).expect("error json");
    assert_eq!(json["error"]["code"], "invalid_request");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let addr = spawn_app(lazy_pool()).await;
    let (status, _, _) = send_raw_with_method(addr, "GET", "/api/v1/nope", &[], None).await;
    assert_eq!(status, 404);
}
