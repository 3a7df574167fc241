//! Site request data model.

use serde::{Deserialize, Serialize};

/// The kinds of site the wizard can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteType {
    TeamSite,
    Communication,
}

impl SiteType {
    /// All selectable site types, in the order they are offered.
    pub const ALL: [SiteType; 2] = [SiteType::TeamSite, SiteType::Communication];

    /// Wire/display name, also the value a selection card submits.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamSite => "TeamSite",
            Self::Communication => "Communication",
        }
    }

    /// Short description shown on the selection card.
    pub fn blurb(&self) -> &'static str {
        match self {
            Self::TeamSite => "Collaborate with your team: shared files, lists and a group mailbox.",
            Self::Communication => "Broadcast news and information to a wide audience.",
        }
    }

    /// Whether sites of this type are created with a mail alias.
    ///
    /// Communication sites have no group behind them, so no alias.
    pub fn has_alias(&self) -> bool {
        !matches!(self, Self::Communication)
    }

    /// Case-insensitive lookup by name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for SiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The wizard's working record.
///
/// Every field starts unset; a field that arrives pre-populated makes the
/// matching step skip itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_type: Option<SiteType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl SiteRequest {
    /// Site type name for prompt text, or a neutral word when unknown.
    pub fn site_type_label(&self) -> &'static str {
        self.site_type.map(|t| t.as_str()).unwrap_or("new")
    }

    /// Whether this request needs an alias before it can be submitted.
    pub fn needs_alias(&self) -> bool {
        self.site_type.is_none_or(|t| t.has_alias())
    }

    /// Whether every field the wizard would ask for is populated.
    pub fn is_complete(&self) -> bool {
        self.site_type.is_some()
            && self.title.is_some()
            && self.description.is_some()
            && self.owner.is_some()
            && (!self.needs_alias() || self.alias.is_some())
    }
}
