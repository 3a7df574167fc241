//! Channel trait and the message types that cross it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::Activity;
use crate::dialog::TurnPayload;
use crate::error::ChannelError;

/// An inbound turn from some channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    pub channel: String,
    pub conversation_id: String,
    pub user_id: String,
    pub payload: TurnPayload,
    pub received_at: DateTime<Utc>,
}

impl IncomingMessage {
    pub fn new(
        channel: impl Into<String>,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        payload: TurnPayload,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            payload,
            received_at: Utc::now(),
        }
    }

    /// Plain-text inbound message.
    pub fn text(
        channel: impl Into<String>,
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::new(channel, conversation_id, user_id, TurnPayload::text(text))
    }
}

/// Everything the bot sends back for one turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingResponse {
    pub activities: Vec<Activity>,
}

impl OutgoingResponse {
    pub fn new(activities: Vec<Activity>) -> Self {
        Self { activities }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(vec![Activity::text(text)])
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    /// Text rendering of every activity, separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.activities
            .iter()
            .map(Activity::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub type MessageStream = Pin<Box<dyn Stream<Item = IncomingMessage> + Send>>;

/// A source of inbound turns and a sink for responses.
#[async_trait]
pub trait Channel: Send + Sync {
    fn name(&self) -> &str;

    /// Start receiving messages.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver the response to `msg`.
    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
