//! Card rendering — turns a template plus a field map into attachments.

use serde_json::json;

use crate::dialog::model::SiteType;

use super::model::{Activity, Attachment, CardField, CardTemplate, FieldMap};

/// Renders card templates. The placeholder syntax of any backing template
/// files is the implementation's business.
pub trait CardRenderer: Send + Sync {
    fn render(&self, template: CardTemplate, fields: &FieldMap) -> Activity;
}

/// Builds Adaptive Card 1.2 payloads in code.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveCardRenderer;

impl AdaptiveCardRenderer {
    pub fn new() -> Self {
        Self
    }

    fn shell(body: serde_json::Value, actions: serde_json::Value) -> Attachment {
        Attachment::adaptive(json!({
            "type": "AdaptiveCard",
            "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
            "version": "1.2",
            "body": body,
            "actions": actions,
        }))
    }

    fn site_type_card(site_type: SiteType) -> Attachment {
        Self::shell(
            json!([
                {"type": "TextBlock", "text": site_type.as_str(), "size": "Large", "weight": "Bolder"},
                {"type": "TextBlock", "text": site_type.blurb(), "wrap": true}
            ]),
            json!([
                {"type": "Action.Submit", "title": site_type.as_str(), "data": {"value": site_type.as_str()}}
            ]),
        )
    }
}

impl CardRenderer for AdaptiveCardRenderer {
    fn render(&self, template: CardTemplate, fields: &FieldMap) -> Activity {
        match template {
            CardTemplate::Welcome => Activity::card(Self::shell(
                json!([
                    {"type": "TextBlock", "text": "Welcome!", "size": "Large", "weight": "Bolder"},
                    {"type": "TextBlock", "text": "I can request a new site for you. Send me any message to get started.", "wrap": true}
                ]),
                json!([]),
            )),
            CardTemplate::SiteTypes => Activity::carousel(
                SiteType::ALL
                    .into_iter()
                    .map(Self::site_type_card)
                    .collect(),
            ),
            CardTemplate::Generic => Activity::card(Self::shell(
                json!([
                    {"type": "TextBlock", "text": fields.get(CardField::Prompt), "wrap": true}
                ]),
                json!([]),
            )),
            CardTemplate::Summary => Activity::card(Self::shell(
                json!([
                    {"type": "TextBlock", "text": "Please confirm your request", "weight": "Bolder"},
                    {"type": "FactSet", "facts": [
                        {"title": "Type:", "value": fields.get(CardField::SiteType)},
                        {"title": "Title:", "value": fields.get(CardField::Title)},
                        {"title": "Description:", "value": fields.get(CardField::Description)},
                        {"title": "Owner:", "value": fields.get(CardField::Owner)},
                        {"title": "Alias:", "value": fields.get(CardField::Alias)}
                    ]},
                    {"type": "TextBlock", "text": "Is this correct? (yes / no)", "wrap": true}
                ]),
                json!([
                    {"type": "Action.Submit", "title": "Yes", "data": {"value": "yes"}},
                    {"type": "Action.Submit", "title": "No", "data": {"value": "no"}}
                ]),
            )),
            CardTemplate::SignIn => Activity::card(Self::shell(
                json!([
                    {"type": "TextBlock", "text": "Sign In", "weight": "Bolder"},
                    {"type": "TextBlock", "text": "Please Sign In", "wrap": true},
                    {"type": "TextBlock", "text": format!("Sign in with {} and send me the code you receive.", fields.get(CardField::ConnectionName)), "wrap": true, "isSubtle": true}
                ]),
                json!([]),
            )),
        }
    }
}
