//! Outbound activity model — text messages and card attachments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// MIME type of an Adaptive Card attachment.
pub const ADAPTIVE_CARD_CONTENT_TYPE: &str = "application/vnd.microsoft.card.adaptive";

/// How a multi-attachment message should be laid out by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentLayout {
    #[default]
    List,
    Carousel,
}

/// A rendered card, opaque to the dialog core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub content_type: String,
    pub content: serde_json::Value,
}

impl Attachment {
    pub fn adaptive(content: serde_json::Value) -> Self {
        Self {
            content_type: ADAPTIVE_CARD_CONTENT_TYPE.to_string(),
            content,
        }
    }

    /// Best-effort plain-text rendering for text-only channels.
    ///
    /// Collects every `TextBlock` text and every action title in document order.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        collect_text(&self.content, &mut lines);
        lines.join("\n")
    }
}

fn collect_text(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            let kind = map.get("type").and_then(|v| v.as_str());
            match kind {
                Some("TextBlock") => {
                    if let Some(text) = map.get("text").and_then(|v| v.as_str()) {
                        out.push(text.to_string());
                    }
                }
                Some(k) if k.starts_with("Action.") => {
                    if let Some(title) = map.get("title").and_then(|v| v.as_str()) {
                        out.push(format!("[{title}]"));
                    }
                }
                _ => {}
            }
            if let Some(facts) = map.get("facts").and_then(|v| v.as_array()) {
                for fact in facts {
                    let title = fact.get("title").and_then(|v| v.as_str()).unwrap_or_default();
                    let value = fact.get("value").and_then(|v| v.as_str()).unwrap_or_default();
                    out.push(format!("{title} {value}"));
                }
            }
            for key in ["body", "items", "columns", "actions"] {
                if let Some(children) = map.get(key) {
                    collect_text(children, out);
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        _ => {}
    }
}

/// One outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Activity {
    /// Plain text message.
    Text { text: String },
    /// One or more card attachments.
    Cards {
        layout: AttachmentLayout,
        attachments: Vec<Attachment>,
    },
}

impl Activity {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn card(attachment: Attachment) -> Self {
        Self::Cards {
            layout: AttachmentLayout::List,
            attachments: vec![attachment],
        }
    }

    pub fn carousel(attachments: Vec<Attachment>) -> Self {
        Self::Cards {
            layout: AttachmentLayout::Carousel,
            attachments,
        }
    }

    /// Text-only rendering, used by the CLI channel and in logs.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Cards { attachments, .. } => attachments
                .iter()
                .map(Attachment::plain_text)
                .collect::<Vec<_>>()
                .join("\n---\n"),
        }
    }
}

/// Card templates the wizard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardTemplate {
    /// Greeting for a newly added member.
    Welcome,
    /// One card per site type, shown as a carousel.
    SiteTypes,
    /// A single question.
    Generic,
    /// Summary of the request before confirmation.
    Summary,
    /// Sign-in call to action.
    SignIn,
}

/// Named slots a template can be filled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardField {
    Prompt,
    SiteType,
    Title,
    Description,
    Owner,
    Alias,
    ConnectionName,
}

/// Typed values for a template's slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap(BTreeMap<CardField, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: CardField, value: impl Into<String>) -> Self {
        self.0.insert(field, value.into());
        self
    }

    /// The value for `field`, or the empty string when unset.
    pub fn get(&self, field: CardField) -> &str {
        self.0.get(&field).map(String::as_str).unwrap_or_default()
    }
}
