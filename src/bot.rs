//! Site bot — the host turn handler.
//!
//! Each turn loads the conversation's stack, runs it through the dialog
//! manager, and saves the result. Any failure becomes a chat message and the
//! previously saved stack stays in place, so the same step runs again on the
//! next message.
//!
//! Turns for one conversation run one at a time, in the order they arrive.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::cards::{Activity, CardRenderer, CardTemplate, FieldMap};
use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::config::WizardConfig;
use crate::dialog::{
    DialogId, DialogManager, FrameOptions, ResolverDialog, Services, SiteDialog, SiteRequest,
    StepResult, TurnContext, TurnPayload, TurnStatus,
};
use crate::error::Error;
use crate::services::{AuthProvider, Directory, Provisioner};
use crate::store::StateStore;

pub const GENERIC_FAILURE: &str = "Sorry, something went wrong. Please try again.";
pub const CANCELLED: &str = "OK, I've cancelled that request. Send me a message to start a new one.";

pub struct SiteBot {
    manager: DialogManager,
    services: Arc<Services>,
    store: Arc<dyn StateStore>,
    provisioner: Arc<dyn Provisioner>,
    /// One lock per conversation with a turn in flight.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SiteBot {
    pub fn new(
        config: WizardConfig,
        auth: Arc<dyn AuthProvider>,
        directory: Arc<dyn Directory>,
        store: Arc<dyn StateStore>,
        provisioner: Arc<dyn Provisioner>,
        cards: Arc<dyn CardRenderer>,
    ) -> Self {
        let manager = DialogManager::new(DialogId::Site)
            .with_dialog(Arc::new(SiteDialog::new()))
            .with_dialog(Arc::new(ResolverDialog::owner(Arc::clone(&directory))))
            .with_dialog(Arc::new(ResolverDialog::alias(directory)));
        Self {
            manager,
            services: Arc::new(Services {
                config,
                auth,
                cards,
            }),
            store,
            provisioner,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Greeting for a member newly added to the conversation.
    pub fn welcome(&self) -> Activity {
        self.services.cards.render(CardTemplate::Welcome, &FieldMap::new())
    }

    /// Handle one inbound message. Never fails; errors become a chat message.
    pub async fn on_turn(&self, msg: &IncomingMessage) -> Vec<Activity> {
        let lock = self.conversation_lock(&msg.conversation_id).await;
        let guard = lock.lock().await;
        let result = self.process(msg).await;
        drop(guard);
        self.release_lock(&msg.conversation_id, lock).await;

        match result {
            Ok(activities) => activities,
            Err(e) => {
                error!(
                    conversation_id = %msg.conversation_id,
                    error = %e,
                    "Turn failed, keeping last saved state"
                );
                vec![Activity::text(GENERIC_FAILURE)]
            }
        }
    }

    async fn conversation_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        Arc::clone(locks.entry(conversation_id.to_string()).or_default())
    }

    /// Forget the conversation's lock once no other turn holds or awaits it.
    async fn release_lock(&self, conversation_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.turn_locks.lock().await;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(conversation_id);
        }
    }

    /// Conversations with a turn in flight or queued.
    pub async fn active_turns(&self) -> usize {
        self.turn_locks.lock().await.len()
    }

    async fn process(&self, msg: &IncomingMessage) -> Result<Vec<Activity>, Error> {
        let conversation_id = msg.conversation_id.as_str();
        let user_id = msg.user_id.as_str();

        let mut stack = self
            .store
            .load_stack(conversation_id)
            .await?
            .unwrap_or_default();
        let mut user_state = self.store.load_user_state(user_id).await?;
        let mut cx = TurnContext::new(conversation_id, user_id, Arc::clone(&self.services))
            .at(msg.received_at);

        let request = prefill(&msg.payload);
        if stack.is_empty() && request != SiteRequest::default() {
            debug!(
                conversation_id,
                complete = request.is_complete(),
                "Starting from a structured request"
            );
        }
        let root = FrameOptions::Site(request);
        let status = self
            .manager
            .run_turn(&mut stack, &msg.payload, root, &mut cx)
            .await?;

        match status {
            TurnStatus::Waiting => {
                self.store.save_stack(conversation_id, &stack).await?;
            }
            TurnStatus::Complete(StepResult::Site(request)) => {
                self.provisioner.submit(user_id, &request).await?;
                info!(conversation_id, user_id, "Site request handed off");
                user_state.record_submission(cx.now);
                cx.send_text(format!(
                    "Thanks! Your request for the {} site \"{}\" has been submitted.",
                    request.site_type_label(),
                    request.title.as_deref().unwrap_or_default()
                ));
                self.store.delete_stack(conversation_id).await?;
            }
            TurnStatus::Complete(_) => {
                info!(conversation_id, "Site request cancelled");
                cx.send_text(CANCELLED);
                self.store.delete_stack(conversation_id).await?;
            }
        }

        self.store.save_user_state(user_id, &user_state).await?;
        Ok(cx.into_outbox())
    }

    /// Serve a channel until it closes or Ctrl+C.
    pub async fn run(&self, channel: &dyn Channel) -> Result<(), Error> {
        let mut messages = channel.start().await?;
        info!(channel = channel.name(), "Site bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = messages.next() => match msg {
                    Some(m) => m,
                    None => {
                        info!("Channel stream ended, shutting down...");
                        break;
                    }
                }
            };

            let activities = self.on_turn(&message).await;
            if let Err(e) = channel
                .respond(&message, OutgoingResponse::new(activities))
                .await
            {
                error!(channel = channel.name(), error = %e, "Failed to send response");
            }
        }

        channel.shutdown().await?;
        Ok(())
    }
}

/// Seed a fresh wizard from a structured first message. Anything that isn't
/// a site request starts empty.
fn prefill(payload: &TurnPayload) -> SiteRequest {
    match payload {
        TurnPayload::Value { value } => serde_json::from_value(value.clone()).unwrap_or_default(),
        _ => SiteRequest::default(),
    }
}
