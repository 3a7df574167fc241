//! Turn context — per-turn identity, collaborators, clock, and outbox.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cards::{Activity, CardRenderer, CardTemplate, FieldMap};
use crate::config::WizardConfig;
use crate::services::AuthProvider;

/// Collaborators shared by every dialog.
pub struct Services {
    pub config: WizardConfig,
    pub auth: Arc<dyn AuthProvider>,
    pub cards: Arc<dyn CardRenderer>,
}

/// State for one inbound turn.
///
/// Dialog steps queue outbound activities here; the host delivers them once
/// the turn finishes.
pub struct TurnContext {
    pub conversation_id: String,
    pub user_id: String,
    pub services: Arc<Services>,
    /// Clock reading for the turn. Sign-in deadlines are checked against it.
    pub now: DateTime<Utc>,
    outbox: Vec<Activity>,
}

impl TurnContext {
    pub fn new(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        services: Arc<Services>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            services,
            now: Utc::now(),
            outbox: Vec::new(),
        }
    }

    /// Override the turn clock.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn config(&self) -> &WizardConfig {
        &self.services.config
    }

    pub fn send(&mut self, activity: Activity) {
        self.outbox.push(activity);
    }

    pub fn send_text(&mut self, text: impl Into<String>) {
        self.send(Activity::text(text));
    }

    pub fn render(&self, template: CardTemplate, fields: &FieldMap) -> Activity {
        self.services.cards.render(template, fields)
    }

    pub fn outbox(&self) -> &[Activity] {
        &self.outbox
    }

    pub fn into_outbox(self) -> Vec<Activity> {
        self.outbox
    }
}
