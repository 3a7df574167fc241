//! Integration tests for the Graph directory client.
//!
//! Each test spins up an Axum server on a random port that imitates the two
//! Graph endpoints the wizard uses, and points a `GraphDirectory` at it.

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Query,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;

use site_wizard::error::CollaboratorError;
use site_wizard::services::{AuthToken, Directory, GraphDirectory};

const GOOD_TOKEN: &str = "good-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {GOOD_TOKEN}"))
}

async fn users(headers: HeaderMap, Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    if !authorized(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": "InvalidAuthenticationToken"}})),
        );
    }
    let filter = params.get("$filter").cloned().unwrap_or_default();
    let top = params.get("$top").cloned().unwrap_or_default();
    let value = if top == "10" && filter.contains("startswith(displayName,'Adele')") {
        json!([{
            "id": "u1",
            "displayName": "Adele Vance",
            "mail": "adele@contoso.com",
            "userPrincipalName": "adele@contoso.com"
        }])
    } else if filter.contains("startswith(displayName,'A')") {
        json!([
            {"id": "u1", "displayName": "Adele Vance", "mail": null, "userPrincipalName": "adele@contoso.com"},
            {"id": "u2", "displayName": "Alex Wilber", "mail": null, "userPrincipalName": "alex@contoso.com"}
        ])
    } else {
        json!([])
    };
    (StatusCode::OK, Json(json!({ "value": value })))
}

async fn groups(Query(params): Query<HashMap<String, String>>) -> impl IntoResponse {
    let filter = params.get("$filter").cloned().unwrap_or_default();
    let value = if filter == "mailNickname eq 'taken'" {
        json!([{"id": "g1"}])
    } else if filter == "mailNickname eq 'broken'" {
        return (StatusCode::OK, Json(json!({"unexpected": true})));
    } else {
        json!([])
    };
    (StatusCode::OK, Json(json!({ "value": value })))
}

/// Start a fake Graph server on a random port and return its base URL.
async fn start_server() -> String {
    let app = Router::new()
        .route("/v1.0/users", get(users))
        .route("/v1.0/groups", get(groups));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}/v1.0/")
}

fn token() -> AuthToken {
    AuthToken::new(GOOD_TOKEN)
}

#[tokio::test]
async fn resolves_single_identity() {
    let dir = GraphDirectory::new(start_server().await);
    let found = dir.resolve_identity(&token(), "Adele").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].user_principal_name, "adele@contoso.com");
    assert_eq!(found[0].display_name, "Adele Vance");
}

#[tokio::test]
async fn returns_every_candidate() {
    let dir = GraphDirectory::new(start_server().await);
    let found = dir.resolve_identity(&token(), "A").await.unwrap();
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|u| u.mail.is_none()));
}

#[tokio::test]
async fn unknown_identity_is_empty() {
    let dir = GraphDirectory::new(start_server().await);
    assert!(dir.resolve_identity(&token(), "Zed").await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_token_is_bad_status() {
    let dir = GraphDirectory::new(start_server().await);
    let err = dir
        .resolve_identity(&AuthToken::new("expired"), "Adele")
        .await
        .unwrap_err();
    assert!(matches!(err, CollaboratorError::BadStatus { status: 401, .. }));
}

#[tokio::test]
async fn alias_checks() {
    let dir = GraphDirectory::new(start_server().await);
    assert!(dir.alias_in_use(&token(), "taken").await.unwrap());
    assert!(!dir.alias_in_use(&token(), "eng-hub").await.unwrap());
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let dir = GraphDirectory::new(start_server().await);
    let err = dir.alias_in_use(&token(), "broken").await.unwrap_err();
    assert!(matches!(err, CollaboratorError::InvalidResponse { .. }));
}

#[tokio::test]
async fn unreachable_server_is_request_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let dir = GraphDirectory::new(format!("http://127.0.0.1:{port}"));
    let err = dir.alias_in_use(&token(), "eng-hub").await.unwrap_err();
    assert!(matches!(err, CollaboratorError::RequestFailed { .. }));
}
