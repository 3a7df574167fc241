//! CLI channel — stdin/stdout REPL for local testing.
//!
//! `/signin <token>` stands in for the sign-in provider's completion event.
//! A line starting with `{` is sent as a card submission.

use std::io::Write;

use async_trait::async_trait;
use futures::stream;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::dialog::TurnPayload;
use crate::error::ChannelError;

const CONVERSATION_ID: &str = "cli";
const USER_ID: &str = "local-user";

/// A simple CLI channel that reads from stdin and writes to stdout.
#[derive(Default)]
pub struct CliChannel;

impl CliChannel {
    pub fn new() -> Self {
        Self
    }
}

/// Turn one input line into a payload.
pub fn parse_line(line: &str) -> TurnPayload {
    if let Some(token) = line.strip_prefix("/signin") {
        return TurnPayload::token(token.trim());
    }
    if line.starts_with('{') {
        match serde_json::from_str(line) {
            Ok(value) => return TurnPayload::value(value),
            Err(e) => tracing::debug!("Not a card value, sending as text: {}", e),
        }
    }
    TurnPayload::text(line)
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            eprint!("> ");

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            eprint!("> ");
                            continue;
                        }
                        let msg = IncomingMessage::new(
                            "cli",
                            CONVERSATION_ID,
                            USER_ID,
                            parse_line(&line),
                        );
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        tracing::error!("Error reading stdin: {}", e);
                        break;
                    }
                }
            }
        });

        let stream = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if !response.is_empty() {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "\n{}\n", response.plain_text()).map_err(|e| {
                ChannelError::SendFailed {
                    name: self.name().to_string(),
                    reason: e.to_string(),
                }
            })?;
        }
        eprint!("> ");
        Ok(())
    }
}
