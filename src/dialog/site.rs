//! Site wizard — the primary step sequence.
//!
//! Each step first stores the previous step's result in the request field it
//! belongs to, then either skips (field already set), prompts, or delegates to
//! a resolver sub-flow.

use async_trait::async_trait;

use crate::cards::{CardField, CardTemplate, FieldMap};
use crate::error::DialogError;

use super::context::TurnContext;
use super::manager::{Dialog, StepOutcome};
use super::model::{SiteRequest, SiteType};
use super::prompt::PromptSpec;
use super::state::{DialogId, FrameOptions, ResolverOptions, StepResult};

/// Steps of the site wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteStep {
    SiteType,
    Title,
    Description,
    Owner,
    Alias,
    Confirm,
    Final,
}

impl SiteStep {
    pub const ALL: [SiteStep; 7] = [
        SiteStep::SiteType,
        SiteStep::Title,
        SiteStep::Description,
        SiteStep::Owner,
        SiteStep::Alias,
        SiteStep::Confirm,
        SiteStep::Final,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::SiteType => "site_type",
            Self::Title => "title",
            Self::Description => "description",
            Self::Owner => "owner",
            Self::Alias => "alias",
            Self::Confirm => "confirm",
            Self::Final => "final",
        }
    }
}

/// Write a step's text result into its field. Anything else leaves the field
/// as it was, so a step re-run after a rewind keeps earlier answers.
fn store(field: &mut Option<String>, result: StepResult) {
    if let Some(value) = result.into_text() {
        *field = Some(value);
    }
}

/// The primary wizard dialog.
#[derive(Debug, Default)]
pub struct SiteDialog;

impl SiteDialog {
    pub fn new() -> Self {
        Self
    }

    fn question(cx: &TurnContext, text: String) -> PromptSpec {
        let card = cx.render(CardTemplate::Generic, &FieldMap::new().with(CardField::Prompt, text));
        PromptSpec::text(card)
    }

    fn site_type_step(site: &SiteRequest, cx: &TurnContext) -> StepOutcome {
        match site.site_type {
            Some(t) => StepOutcome::Next(StepResult::Text(t.as_str().to_string())),
            None => {
                let cards = cx.render(CardTemplate::SiteTypes, &FieldMap::new());
                let choices = SiteType::ALL.iter().map(|t| t.as_str().to_string()).collect();
                StepOutcome::Prompt(PromptSpec::choice(cards, choices))
            }
        }
    }

    fn title_step(site: &mut SiteRequest, result: StepResult, cx: &TurnContext) -> StepOutcome {
        if let Some(t) = result.into_text().and_then(|s| SiteType::parse(&s)) {
            site.site_type = Some(t);
        }
        match &site.title {
            Some(title) => StepOutcome::Next(StepResult::Text(title.clone())),
            None => StepOutcome::Prompt(Self::question(
                cx,
                format!("Provide a title for your {} site", site.site_type_label()),
            )),
        }
    }

    fn description_step(site: &mut SiteRequest, result: StepResult, cx: &TurnContext) -> StepOutcome {
        store(&mut site.title, result);
        match &site.description {
            Some(desc) => StepOutcome::Next(StepResult::Text(desc.clone())),
            None => StepOutcome::Prompt(Self::question(
                cx,
                format!("Provide a description for your {} site", site.site_type_label()),
            )),
        }
    }

    fn owner_step(site: &mut SiteRequest, result: StepResult) -> StepOutcome {
        store(&mut site.description, result);
        match &site.owner {
            Some(owner) => StepOutcome::Next(StepResult::Text(owner.clone())),
            None => StepOutcome::Begin {
                dialog: DialogId::OwnerResolver,
                options: FrameOptions::Resolver(ResolverOptions::new(site.clone())),
            },
        }
    }

    fn alias_step(site: &mut SiteRequest, result: StepResult) -> StepOutcome {
        store(&mut site.owner, result);
        if site.owner.is_none() {
            return StepOutcome::Rewind {
                step: SiteStep::Owner.index(),
            };
        }

        if !site.needs_alias() {
            return StepOutcome::Next(StepResult::None);
        }

        match &site.alias {
            Some(alias) => StepOutcome::Next(StepResult::Text(alias.clone())),
            None => StepOutcome::Begin {
                dialog: DialogId::AliasResolver,
                options: FrameOptions::Resolver(ResolverOptions::new(site.clone())),
            },
        }
    }

    fn confirm_step(site: &mut SiteRequest, result: StepResult, cx: &TurnContext) -> StepOutcome {
        if site.needs_alias() {
            store(&mut site.alias, result);
        } else {
            site.alias = None;
        }
        if site.needs_alias() && site.alias.is_none() {
            return StepOutcome::Rewind {
                step: SiteStep::Alias.index(),
            };
        }

        let fields = FieldMap::new()
            .with(CardField::SiteType, site.site_type_label())
            .with(CardField::Title, site.title.clone().unwrap_or_default())
            .with(CardField::Description, site.description.clone().unwrap_or_default())
            .with(CardField::Owner, site.owner.clone().unwrap_or_default())
            .with(CardField::Alias, site.alias.clone().unwrap_or_default());
        StepOutcome::Prompt(PromptSpec::confirm(cx.render(CardTemplate::Summary, &fields)))
    }

    fn final_step(site: &SiteRequest, result: StepResult) -> StepOutcome {
        match result {
            StepResult::Confirmed(true) => StepOutcome::End(StepResult::Site(site.clone())),
            _ => StepOutcome::End(StepResult::None),
        }
    }
}

#[async_trait]
impl Dialog for SiteDialog {
    fn id(&self) -> DialogId {
        DialogId::Site
    }

    fn step_count(&self) -> usize {
        SiteStep::ALL.len()
    }

    fn step_name(&self, step: usize) -> &'static str {
        SiteStep::from_index(step).map(SiteStep::name).unwrap_or("unknown")
    }

    async fn run_step(
        &self,
        step: usize,
        options: &mut FrameOptions,
        result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<StepOutcome, DialogError> {
        let FrameOptions::Site(site) = options else {
            return Err(DialogError::OptionsMismatch {
                dialog: self.id().to_string(),
            });
        };
        let step = SiteStep::from_index(step).ok_or_else(|| DialogError::StepOutOfRange {
            dialog: self.id().to_string(),
            step,
        })?;

        Ok(match step {
            SiteStep::SiteType => Self::site_type_step(site, cx),
            SiteStep::Title => Self::title_step(site, result, cx),
            SiteStep::Description => Self::description_step(site, result, cx),
            SiteStep::Owner => Self::owner_step(site, result),
            SiteStep::Alias => Self::alias_step(site, result),
            SiteStep::Confirm => Self::confirm_step(site, result, cx),
            SiteStep::Final => Self::final_step(site, result),
        })
    }
}
