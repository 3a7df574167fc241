//! Resolver sub-flows — sign in, then collect a value an external lookup
//! accepts.
//!
//! Owner and alias resolution share one [`ResolverDialog`]; they differ only in
//! the field they fill and the [`AnswerValidator`] they consult. The token the
//! sign-in step obtains lives in the frame's [`ResolverOptions`] for the rest
//! of the turn only; later turns ask the auth provider for it again.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::cards::{CardField, CardTemplate, FieldMap};
use crate::error::{CollaboratorError, DialogError};
use crate::services::{AuthToken, Directory};

use super::context::TurnContext;
use super::manager::{Dialog, StepOutcome};
use super::model::SiteRequest;
use super::prompt::{PromptSpec, Validation};
use super::state::{DialogId, FrameOptions, PromptKind, ResolverOptions, StepResult};

pub const LOGIN_FAILED: &str = "Login was not successful please try again.";
pub const ALIAS_TAKEN: &str = "Alias already exist.";
pub const TOO_MANY_ATTEMPTS: &str =
    "That's too many attempts. Send any message when you'd like to try again.";

const STEP_SIGN_IN: usize = 0;
const STEP_COLLECT: usize = 1;
const STEP_FINAL: usize = 2;
const STEP_NAMES: [&str; 3] = ["sign_in", "collect", "final"];

/// Which request field a resolver fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverField {
    Owner,
    Alias,
}

impl ResolverField {
    fn dialog_id(self) -> DialogId {
        match self {
            Self::Owner => DialogId::OwnerResolver,
            Self::Alias => DialogId::AliasResolver,
        }
    }

    fn preset(self, site: &SiteRequest) -> Option<&str> {
        match self {
            Self::Owner => site.owner.as_deref(),
            Self::Alias => site.alias.as_deref(),
        }
    }

    fn question(self, site: &SiteRequest) -> String {
        match self {
            Self::Owner => format!("Who will own your {} site?", site.site_type_label()),
            Self::Alias => format!("Provide an alias for your {} site", site.site_type_label()),
        }
    }
}

/// Checks a candidate answer against an external service.
#[async_trait]
pub trait AnswerValidator: Send + Sync {
    /// `Some(value)` accepts, possibly canonicalized. `None` rejects; any
    /// message explaining why has already been queued on `cx`.
    async fn check(
        &self,
        token: &AuthToken,
        answer: &str,
        cx: &mut TurnContext,
    ) -> Result<Option<String>, CollaboratorError>;
}

/// Accepts an answer that resolves to exactly one directory identity.
pub struct OwnerValidator {
    directory: Arc<dyn Directory>,
}

impl OwnerValidator {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AnswerValidator for OwnerValidator {
    async fn check(
        &self,
        token: &AuthToken,
        answer: &str,
        cx: &mut TurnContext,
    ) -> Result<Option<String>, CollaboratorError> {
        let mut matches = self.directory.resolve_identity(token, answer).await?;
        match matches.len() {
            1 => {
                let identity = matches.remove(0);
                debug!(owner = %identity.user_principal_name, "Owner resolved");
                Ok(Some(identity.user_principal_name))
            }
            0 => {
                cx.send_text(format!("I couldn't find anyone matching \"{answer}\"."));
                Ok(None)
            }
            n => {
                cx.send_text(format!(
                    "\"{answer}\" matches {n} people. Please be more specific."
                ));
                Ok(None)
            }
        }
    }
}

/// Accepts an alias no existing group uses.
pub struct AliasValidator {
    directory: Arc<dyn Directory>,
}

impl AliasValidator {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AnswerValidator for AliasValidator {
    async fn check(
        &self,
        token: &AuthToken,
        answer: &str,
        cx: &mut TurnContext,
    ) -> Result<Option<String>, CollaboratorError> {
        if answer.chars().any(char::is_whitespace) {
            cx.send_text("An alias can't contain spaces.");
            return Ok(None);
        }
        if self.directory.alias_in_use(token, answer).await? {
            cx.send_text(ALIAS_TAKEN);
            return Ok(None);
        }
        Ok(Some(answer.to_string()))
    }
}

/// Authenticate-then-collect sub-flow.
pub struct ResolverDialog {
    field: ResolverField,
    validator: Arc<dyn AnswerValidator>,
}

impl ResolverDialog {
    pub fn new(field: ResolverField, validator: Arc<dyn AnswerValidator>) -> Self {
        Self { field, validator }
    }

    pub fn owner(directory: Arc<dyn Directory>) -> Self {
        Self::new(ResolverField::Owner, Arc::new(OwnerValidator::new(directory)))
    }

    pub fn alias(directory: Arc<dyn Directory>) -> Self {
        Self::new(ResolverField::Alias, Arc::new(AliasValidator::new(directory)))
    }

    fn options<'a>(&self, options: &'a mut FrameOptions) -> Result<&'a mut ResolverOptions, DialogError> {
        match options {
            FrameOptions::Resolver(r) => Ok(r),
            FrameOptions::Site(_) => Err(DialogError::OptionsMismatch {
                dialog: self.field.dialog_id().to_string(),
            }),
        }
    }

    async fn sign_in(&self, cx: &mut TurnContext) -> Result<StepOutcome, DialogError> {
        let connection = cx.config().connection_name.clone();
        let auth = Arc::clone(&cx.services.auth);
        if let Some(token) = auth.user_token(&connection, &cx.user_id).await? {
            debug!(conversation_id = %cx.conversation_id, "Reusing cached sign-in");
            return Ok(StepOutcome::Next(StepResult::Token(token)));
        }

        let card = cx.render(
            CardTemplate::SignIn,
            &FieldMap::new().with(CardField::ConnectionName, connection.clone()),
        );
        Ok(StepOutcome::Prompt(PromptSpec {
            kind: PromptKind::SignIn {
                connection,
                started_at: cx.now,
                timeout_ms: u64::try_from(cx.config().sign_in_timeout.as_millis())
                    .unwrap_or(u64::MAX),
            },
            activities: vec![card],
            validate: false,
        }))
    }

    async fn collect(
        &self,
        options: &mut ResolverOptions,
        result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<StepOutcome, DialogError> {
        let StepResult::Token(token) = result else {
            info!(conversation_id = %cx.conversation_id, dialog = %self.field.dialog_id(), "Sign-in failed");
            cx.send_text(LOGIN_FAILED);
            return Ok(StepOutcome::End(StepResult::None));
        };
        options.token = Some(token.clone());

        if let Some(preset) = self.field.preset(&options.site).map(str::to_string) {
            if let Some(value) = self.validator.check(&token, &preset, cx).await? {
                return Ok(StepOutcome::Next(StepResult::Text(value)));
            }
        }

        let card = cx.render(
            CardTemplate::Generic,
            &FieldMap::new().with(CardField::Prompt, self.field.question(&options.site)),
        );
        Ok(StepOutcome::Prompt(PromptSpec::text(card).validated()))
    }
}

#[async_trait]
impl Dialog for ResolverDialog {
    fn id(&self) -> DialogId {
        self.field.dialog_id()
    }

    fn step_count(&self) -> usize {
        STEP_NAMES.len()
    }

    fn step_name(&self, step: usize) -> &'static str {
        STEP_NAMES.get(step).copied().unwrap_or("unknown")
    }

    async fn run_step(
        &self,
        step: usize,
        options: &mut FrameOptions,
        result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<StepOutcome, DialogError> {
        let options = self.options(options)?;
        match step {
            STEP_SIGN_IN => self.sign_in(cx).await,
            STEP_COLLECT => self.collect(options, result, cx).await,
            STEP_FINAL => Ok(StepOutcome::End(result)),
            _ => Err(DialogError::StepOutOfRange {
                dialog: self.id().to_string(),
                step,
            }),
        }
    }

    async fn validate(
        &self,
        _step: usize,
        options: &mut FrameOptions,
        value: StepResult,
        cx: &mut TurnContext,
    ) -> Result<Validation, DialogError> {
        let options = self.options(options)?;
        let token = match options.token.clone() {
            Some(token) => token,
            None => {
                let connection = cx.config().connection_name.clone();
                let auth = Arc::clone(&cx.services.auth);
                match auth.user_token(&connection, &cx.user_id).await? {
                    Some(token) => {
                        options.token = Some(token.clone());
                        token
                    }
                    None => {
                        info!(conversation_id = %cx.conversation_id, dialog = %self.id(), "Sign-in no longer valid");
                        cx.send_text(LOGIN_FAILED);
                        return Ok(Validation::Abandon);
                    }
                }
            }
        };
        let Some(answer) = value.into_text() else {
            return Ok(Validation::Rejected);
        };

        options.attempts += 1;
        if let Some(value) = self.validator.check(&token, &answer, cx).await? {
            return Ok(Validation::Accepted(StepResult::Text(value)));
        }

        if let Some(max) = cx.config().max_resolve_attempts {
            if options.attempts >= max {
                warn!(
                    conversation_id = %cx.conversation_id,
                    dialog = %self.id(),
                    attempts = options.attempts,
                    "Giving up after repeated rejections"
                );
                cx.send_text(TOO_MANY_ATTEMPTS);
                return Ok(Validation::Abandon);
            }
        }
        Ok(Validation::Rejected)
    }
}
