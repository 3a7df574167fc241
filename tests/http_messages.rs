//! Integration tests for the HTTP message endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpListener;

use site_wizard::bot::SiteBot;
use site_wizard::cards::AdaptiveCardRenderer;
use site_wizard::channels::message_routes;
use site_wizard::config::WizardConfig;
use site_wizard::services::{AuthToken, InMemoryDirectory, RecordingProvisioner, StaticAuthProvider};
use site_wizard::store::MemoryStore;

/// Start the bot's HTTP surface on a random port and return its base URL.
async fn start_server() -> String {
    let bot = Arc::new(SiteBot::new(
        WizardConfig::default(),
        Arc::new(StaticAuthProvider::signed_in(AuthToken::new("t"))),
        Arc::new(InMemoryDirectory::new().with_user("Adele Vance", "adele@contoso.com")),
        Arc::new(MemoryStore::new()),
        Arc::new(RecordingProvisioner::new()),
        Arc::new(AdaptiveCardRenderer::new()),
    ));
    let app = message_routes(bot);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://127.0.0.1:{port}")
}

async fn post(base: &str, body: Value) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{base}/api/messages"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

#[tokio::test]
async fn health_check() {
    let base = start_server().await;
    let body: Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn first_message_returns_site_type_carousel() {
    let base = start_server().await;
    let (status, body) = post(
        &base,
        json!({"conversationId": "c1", "userId": "u1", "type": "text", "text": "hi"}),
    )
    .await;

    assert_eq!(status, 200);
    let activity = &body["activities"][0];
    assert_eq!(activity["type"], "cards");
    assert_eq!(activity["layout"], "carousel");
    assert_eq!(activity["attachments"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn card_submission_advances_the_wizard() {
    let base = start_server().await;
    post(
        &base,
        json!({"conversationId": "c1", "userId": "u1", "type": "text", "text": "hi"}),
    )
    .await;

    let (_, body) = post(
        &base,
        json!({
            "conversationId": "c1",
            "userId": "u1",
            "type": "value",
            "value": {"value": "Communication"}
        }),
    )
    .await;
    let text = body["activities"][0]["attachments"][0]["content"]["body"][0]["text"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(text, "Provide a title for your Communication site");
}

#[tokio::test]
async fn missing_ids_are_rejected() {
    let base = start_server().await;
    let (status, body) = post(
        &base,
        json!({"conversationId": "", "userId": "u1", "type": "text", "text": "hi"}),
    )
    .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("conversationId"));
}

#[tokio::test]
async fn welcome_endpoint() {
    let base = start_server().await;
    let body: Value = reqwest::get(format!("{base}/api/welcome"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["activities"][0]["type"], "cards");
}
