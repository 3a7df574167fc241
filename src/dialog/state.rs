//! Conversation flow state — the per-conversation stack of dialog frames.
//!
//! The whole stack is serialized between turns. Only the top frame may hold a
//! pending prompt; everything below it is waiting on the frame above.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cards::Activity;
use crate::services::AuthToken;

use super::model::SiteRequest;

/// Registered dialogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogId {
    Site,
    OwnerResolver,
    AliasResolver,
}

impl std::fmt::Display for DialogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Site => "site",
            Self::OwnerResolver => "owner_resolver",
            Self::AliasResolver => "alias_resolver",
        };
        write!(f, "{s}")
    }
}

/// The value one step hands to the next.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepResult {
    /// Nothing: a skipped step, a failed sign-in, or a cancelled sub-flow.
    #[default]
    None,
    Text(String),
    Confirmed(bool),
    /// Handed between steps within a turn only; refuses to serialize.
    #[serde(skip)]
    Token(AuthToken),
    Site(SiteRequest),
}

impl StepResult {
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

/// Working data of a resolver frame.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Snapshot of the caller's request, read-only context.
    pub site: SiteRequest,
    /// Token obtained by this frame's sign-in step. Not persisted.
    #[serde(skip)]
    pub token: Option<AuthToken>,
    /// Answers validated so far in this invocation.
    #[serde(default)]
    pub attempts: u32,
}

impl ResolverOptions {
    pub fn new(site: SiteRequest) -> Self {
        Self {
            site,
            ..Default::default()
        }
    }
}

/// Per-frame working data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameOptions {
    Site(SiteRequest),
    Resolver(ResolverOptions),
}

/// What kind of answer a suspended frame is waiting for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptKind {
    /// Any non-empty text.
    Text,
    /// One of a fixed set of values.
    Choice { choices: Vec<String> },
    /// Yes or no.
    Confirm,
    /// A sign-in completion, bounded by a deadline.
    SignIn {
        connection: String,
        started_at: DateTime<Utc>,
        timeout_ms: u64,
    },
    /// Any inbound message re-runs the current step.
    Parked,
}

/// A live suspension: what is awaited and what was already sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptState {
    pub kind: PromptKind,
    /// Whether the owning dialog validates the recognized answer.
    #[serde(default)]
    pub validate: bool,
    /// The prompt payload, re-sent verbatim on retry.
    #[serde(default)]
    pub activities: Vec<Activity>,
}

impl PromptState {
    pub fn parked() -> Self {
        Self {
            kind: PromptKind::Parked,
            validate: false,
            activities: Vec::new(),
        }
    }
}

/// One activation of a dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowFrame {
    pub id: Uuid,
    pub dialog: DialogId,
    pub step_index: usize,
    pub options: FrameOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PromptState>,
}

impl FlowFrame {
    pub fn new(dialog: DialogId, options: FrameOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            dialog,
            step_index: 0,
            options,
            pending: None,
        }
    }
}

/// The conversation's flow stack. The last frame is the active one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DialogStack {
    #[serde(default)]
    frames: Vec<FlowFrame>,
}

impl DialogStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[FlowFrame] {
        &self.frames
    }

    pub fn active(&self) -> Option<&FlowFrame> {
        self.frames.last()
    }

    pub fn active_mut(&mut self) -> Option<&mut FlowFrame> {
        self.frames.last_mut()
    }

    /// Whether the active frame is suspended waiting for an answer.
    pub fn is_waiting(&self) -> bool {
        self.active().is_some_and(|f| f.pending.is_some())
    }

    pub fn push(&mut self, frame: FlowFrame) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<FlowFrame> {
        self.frames.pop()
    }

    /// Swap the active frame for `frame`, returning the old one.
    pub fn replace(&mut self, frame: FlowFrame) -> Option<FlowFrame> {
        let old = self.frames.pop();
        self.frames.push(frame);
        old
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
