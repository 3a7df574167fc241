//! HTTP message endpoint — one POST per turn, activities in the response.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::debug;
use uuid::Uuid;

use crate::bot::SiteBot;
use crate::cards::Activity;
use crate::channels::IncomingMessage;
use crate::dialog::TurnPayload;
use crate::error::ChannelError;

/// Body of `POST /api/messages`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    pub conversation_id: String,
    pub user_id: String,
    #[serde(flatten)]
    pub payload: TurnPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub activities: Vec<Activity>,
}

/// Build the router for the bot's HTTP surface.
pub fn message_routes(bot: Arc<SiteBot>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/messages", post(post_message))
        .route("/api/welcome", get(welcome))
        .layer(CorsLayer::permissive())
        .with_state(bot)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "site-wizard"
    }))
}

async fn welcome(State(bot): State<Arc<SiteBot>>) -> impl IntoResponse {
    Json(MessageResponse {
        activities: vec![bot.welcome()],
    })
}

async fn post_message(
    State(bot): State<Arc<SiteBot>>,
    Json(body): Json<MessageRequest>,
) -> impl IntoResponse {
    if body.conversation_id.trim().is_empty() || body.user_id.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": ChannelError::InvalidMessage("conversationId and userId are required".into())
                    .to_string()
            })),
        );
    }

    let msg = IncomingMessage {
        id: Uuid::new_v4(),
        channel: "http".to_string(),
        conversation_id: body.conversation_id,
        user_id: body.user_id,
        payload: body.payload,
        received_at: Utc::now(),
    };
    debug!(conversation_id = %msg.conversation_id, "HTTP turn");

    let activities = bot.on_turn(&msg).await;
    (
        StatusCode::OK,
        Json(serde_json::json!(MessageResponse { activities })),
    )
}
