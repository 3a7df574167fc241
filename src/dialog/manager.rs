//! Dialog manager — drives the flow stack one turn at a time.
//!
//! A turn either resumes the suspended top frame with the inbound answer or,
//! when nothing is waiting, starts the root dialog fresh. Steps then run
//! back-to-back until one suspends or the root dialog ends.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::DialogError;
use crate::services::AuthToken;

use super::context::TurnContext;
use super::prompt::{PromptSpec, TurnPayload, Validation, is_magic_code, recognize_choice, recognize_confirm};
use super::state::{DialogId, DialogStack, FlowFrame, FrameOptions, PromptKind, PromptState, StepResult};

/// What a step decided.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Continue with the next step, handing it this value.
    Next(StepResult),
    /// Send the prompt and suspend until the next turn.
    Prompt(PromptSpec),
    /// Start a sub-flow above this frame. Its result feeds this frame's next step.
    Begin {
        dialog: DialogId,
        options: FrameOptions,
    },
    /// End this frame and start another in its place.
    Replace {
        dialog: DialogId,
        options: FrameOptions,
    },
    /// End this frame, returning the value to the frame below.
    End(StepResult),
    /// Go back to `step` and wait for any message before re-running it.
    Rewind { step: usize },
}

/// A named, resumable sequence of steps.
#[async_trait]
pub trait Dialog: Send + Sync {
    fn id(&self) -> DialogId;

    fn step_count(&self) -> usize;

    fn step_name(&self, step: usize) -> &'static str;

    /// Run `step` with the previous step's result.
    async fn run_step(
        &self,
        step: usize,
        options: &mut FrameOptions,
        result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<StepOutcome, DialogError>;

    /// Check an answer to a prompt issued by `step` with validation enabled.
    async fn validate(
        &self,
        _step: usize,
        _options: &mut FrameOptions,
        value: StepResult,
        _cx: &mut TurnContext,
    ) -> Result<Validation, DialogError> {
        Ok(Validation::Accepted(value))
    }
}

/// Where the conversation stands after a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnStatus {
    /// A frame is suspended; persist the stack.
    Waiting,
    /// The root dialog ended with this result; the stack is empty.
    Complete(StepResult),
}

/// Owns the registered dialogs and runs turns against a stack.
pub struct DialogManager {
    root: DialogId,
    dialogs: HashMap<DialogId, Arc<dyn Dialog>>,
}

impl DialogManager {
    pub fn new(root: DialogId) -> Self {
        Self {
            root,
            dialogs: HashMap::new(),
        }
    }

    /// Register a dialog.
    pub fn with_dialog(mut self, dialog: Arc<dyn Dialog>) -> Self {
        self.dialogs.insert(dialog.id(), dialog);
        self
    }

    pub fn root(&self) -> DialogId {
        self.root
    }

    fn dialog(&self, id: DialogId) -> Result<Arc<dyn Dialog>, DialogError> {
        self.dialogs
            .get(&id)
            .cloned()
            .ok_or_else(|| DialogError::UnknownDialog(id.to_string()))
    }

    /// Process one inbound turn.
    ///
    /// `root_options` is used only when no frame is waiting and the root
    /// dialog starts over.
    pub async fn run_turn(
        &self,
        stack: &mut DialogStack,
        payload: &TurnPayload,
        root_options: FrameOptions,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        let pending = stack.active().and_then(|f| f.pending.clone());
        match pending {
            Some(prompt) => self.resume(stack, prompt, payload, cx).await,
            None => {
                if !stack.is_empty() {
                    warn!(
                        conversation_id = %cx.conversation_id,
                        depth = stack.depth(),
                        "Flow stack has no pending prompt, starting over"
                    );
                    stack.clear();
                }
                self.push(stack, self.root, root_options, cx).await
            }
        }
    }

    /// Start `dialog` above the current frame and run it.
    pub async fn push(
        &self,
        stack: &mut DialogStack,
        dialog: DialogId,
        options: FrameOptions,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        self.dialog(dialog)?;
        info!(conversation_id = %cx.conversation_id, %dialog, "Begin dialog");
        stack.push(FlowFrame::new(dialog, options));
        self.drive(stack, StepResult::None, cx).await
    }

    /// Advance the active frame past its current step and continue with `result`.
    pub async fn next(
        &self,
        stack: &mut DialogStack,
        result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
        frame.pending = None;
        frame.step_index += 1;
        self.drive(stack, result, cx).await
    }

    /// End the active frame and hand `result` to the frame now exposed.
    pub async fn pop(
        &self,
        stack: &mut DialogStack,
        result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        let ended = stack.pop().ok_or(DialogError::EmptyStack)?;
        info!(conversation_id = %cx.conversation_id, dialog = %ended.dialog, "End dialog");
        if stack.is_empty() {
            return Ok(TurnStatus::Complete(result));
        }
        self.next(stack, result, cx).await
    }

    /// End the active frame and begin `dialog` in its place.
    pub async fn replace(
        &self,
        stack: &mut DialogStack,
        dialog: DialogId,
        options: FrameOptions,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        self.dialog(dialog)?;
        let old = stack.replace(FlowFrame::new(dialog, options));
        info!(
            conversation_id = %cx.conversation_id,
            from = ?old.map(|f| f.dialog),
            to = %dialog,
            "Replace dialog"
        );
        self.drive(stack, StepResult::None, cx).await
    }

    async fn resume(
        &self,
        stack: &mut DialogStack,
        prompt: PromptState,
        payload: &TurnPayload,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        if prompt.kind == PromptKind::Parked {
            let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
            frame.pending = None;
            return self.drive(stack, StepResult::None, cx).await;
        }

        let Some(value) = self.recognize(&prompt, payload, cx).await? else {
            debug!(conversation_id = %cx.conversation_id, "Answer not recognized, re-prompting");
            reissue(&prompt, cx);
            return Ok(TurnStatus::Waiting);
        };

        let value = if prompt.validate {
            let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
            let dialog = self.dialog(frame.dialog)?;
            match dialog
                .validate(frame.step_index, &mut frame.options, value, cx)
                .await?
            {
                Validation::Accepted(v) => v,
                Validation::Rejected => {
                    debug!(
                        conversation_id = %cx.conversation_id,
                        dialog = %frame.dialog,
                        step = dialog.step_name(frame.step_index),
                        "Answer rejected, re-prompting"
                    );
                    reissue(&prompt, cx);
                    return Ok(TurnStatus::Waiting);
                }
                Validation::Abandon => {
                    frame.pending = None;
                    return self.pop(stack, StepResult::None, cx).await;
                }
            }
        } else {
            value
        };

        self.next(stack, value, cx).await
    }

    /// Turn the payload into a step result for `prompt`. `None` means re-prompt.
    async fn recognize(
        &self,
        prompt: &PromptState,
        payload: &TurnPayload,
        cx: &mut TurnContext,
    ) -> Result<Option<StepResult>, DialogError> {
        let answer = payload.answer();
        let recognized = match &prompt.kind {
            PromptKind::Text => answer.map(StepResult::Text),
            PromptKind::Choice { choices } => answer
                .and_then(|a| recognize_choice(&a, choices))
                .map(StepResult::Text),
            PromptKind::Confirm => answer
                .and_then(|a| recognize_confirm(&a))
                .map(StepResult::Confirmed),
            PromptKind::SignIn {
                connection,
                started_at,
                timeout_ms,
            } => {
                let elapsed = cx.now.signed_duration_since(*started_at);
                if elapsed.num_milliseconds() > i64::try_from(*timeout_ms).unwrap_or(i64::MAX) {
                    info!(conversation_id = %cx.conversation_id, "Sign-in timed out");
                    return Ok(Some(StepResult::None));
                }
                let auth = Arc::clone(&cx.services.auth);
                let token = match payload {
                    TurnPayload::TokenResponse { token } if !token.trim().is_empty() => {
                        let token = AuthToken::new(token.trim());
                        auth.accept_token(connection, &cx.user_id, &token).await?;
                        Some(token)
                    }
                    _ => match answer.filter(|a| is_magic_code(a)) {
                        Some(code) => auth.exchange_code(connection, &cx.user_id, &code).await?,
                        None => None,
                    },
                };
                Some(token.map(StepResult::Token).unwrap_or_default())
            }
            PromptKind::Parked => Some(StepResult::None),
        };
        Ok(recognized)
    }

    /// Run steps of the active frame until one suspends or the root ends.
    async fn drive(
        &self,
        stack: &mut DialogStack,
        mut result: StepResult,
        cx: &mut TurnContext,
    ) -> Result<TurnStatus, DialogError> {
        loop {
            let outcome = {
                let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
                let dialog = self.dialog(frame.dialog)?;
                if frame.step_index >= dialog.step_count() {
                    StepOutcome::End(result)
                } else {
                    debug!(
                        conversation_id = %cx.conversation_id,
                        dialog = %frame.dialog,
                        step = dialog.step_name(frame.step_index),
                        "Run step"
                    );
                    dialog
                        .run_step(frame.step_index, &mut frame.options, result, cx)
                        .await?
                }
            };

            match outcome {
                StepOutcome::Next(value) => {
                    let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
                    frame.step_index += 1;
                    result = value;
                }
                StepOutcome::Prompt(spec) => {
                    for activity in &spec.activities {
                        cx.send(activity.clone());
                    }
                    let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
                    frame.pending = Some(spec.into_state());
                    return Ok(TurnStatus::Waiting);
                }
                StepOutcome::Begin { dialog, options } => {
                    self.dialog(dialog)?;
                    info!(conversation_id = %cx.conversation_id, %dialog, "Begin dialog");
                    stack.push(FlowFrame::new(dialog, options));
                    result = StepResult::None;
                }
                StepOutcome::Replace { dialog, options } => {
                    self.dialog(dialog)?;
                    stack.replace(FlowFrame::new(dialog, options));
                    info!(conversation_id = %cx.conversation_id, %dialog, "Replace dialog");
                    result = StepResult::None;
                }
                StepOutcome::End(value) => {
                    let ended = stack.pop().ok_or(DialogError::EmptyStack)?;
                    info!(conversation_id = %cx.conversation_id, dialog = %ended.dialog, "End dialog");
                    match stack.active_mut() {
                        None => return Ok(TurnStatus::Complete(value)),
                        Some(parent) => {
                            parent.step_index += 1;
                            result = value;
                        }
                    }
                }
                StepOutcome::Rewind { step } => {
                    let frame = stack.active_mut().ok_or(DialogError::EmptyStack)?;
                    let dialog = self.dialog(frame.dialog)?;
                    if step >= dialog.step_count() {
                        return Err(DialogError::StepOutOfRange {
                            dialog: frame.dialog.to_string(),
                            step,
                        });
                    }
                    debug!(
                        conversation_id = %cx.conversation_id,
                        dialog = %frame.dialog,
                        step = dialog.step_name(step),
                        "Rewind and wait"
                    );
                    frame.step_index = step;
                    frame.pending = Some(PromptState::parked());
                    return Ok(TurnStatus::Waiting);
                }
            }
        }
    }
}

fn reissue(prompt: &PromptState, cx: &mut TurnContext) {
    for activity in &prompt.activities {
        cx.send(activity.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{Activity, AdaptiveCardRenderer};
    use crate::config::WizardConfig;
    use crate::dialog::context::Services;
    use crate::dialog::model::SiteRequest;
    use crate::dialog::state::ResolverOptions;
    use crate::services::StaticAuthProvider;

    /// Asks for a word, rejects "bad", then optionally delegates to `Echo`.
    struct Asker;

    #[async_trait]
    impl Dialog for Asker {
        fn id(&self) -> DialogId {
            DialogId::Site
        }
        fn step_count(&self) -> usize {
            3
        }
        fn step_name(&self, step: usize) -> &'static str {
            ["ask", "maybe_delegate", "finish"][step]
        }
        async fn run_step(
            &self,
            step: usize,
            _options: &mut FrameOptions,
            result: StepResult,
            _cx: &mut TurnContext,
        ) -> Result<StepOutcome, DialogError> {
            Ok(match step {
                0 => StepOutcome::Prompt(PromptSpec::text(Activity::text("word?")).validated()),
                1 => match result.into_text().as_deref() {
                    Some("sub") => StepOutcome::Begin {
                        dialog: DialogId::AliasResolver,
                        options: FrameOptions::Resolver(ResolverOptions::default()),
                    },
                    Some(other) => StepOutcome::Next(StepResult::Text(other.to_uppercase())),
                    None => StepOutcome::Next(StepResult::None),
                },
                _ => StepOutcome::End(result),
            })
        }
        async fn validate(
            &self,
            _step: usize,
            _options: &mut FrameOptions,
            value: StepResult,
            cx: &mut TurnContext,
        ) -> Result<Validation, DialogError> {
            if value == StepResult::Text("bad".into()) {
                cx.send_text("nope");
                return Ok(Validation::Rejected);
            }
            Ok(Validation::Accepted(value))
        }
    }

    /// Confirms once, then returns the answer.
    struct Echo;

    #[async_trait]
    impl Dialog for Echo {
        fn id(&self) -> DialogId {
            DialogId::AliasResolver
        }
        fn step_count(&self) -> usize {
            2
        }
        fn step_name(&self, step: usize) -> &'static str {
            ["confirm", "return"][step]
        }
        async fn run_step(
            &self,
            step: usize,
            _options: &mut FrameOptions,
            result: StepResult,
            _cx: &mut TurnContext,
        ) -> Result<StepOutcome, DialogError> {
            Ok(match step {
                0 => StepOutcome::Prompt(PromptSpec::confirm(Activity::text("sure?"))),
                _ => StepOutcome::End(match result {
                    StepResult::Confirmed(true) => StepResult::Text("from-sub".into()),
                    _ => StepResult::None,
                }),
            })
        }
    }

    fn manager() -> DialogManager {
        DialogManager::new(DialogId::Site)
            .with_dialog(Arc::new(Asker))
            .with_dialog(Arc::new(Echo))
    }

    fn cx() -> TurnContext {
        let services = Arc::new(Services {
            config: WizardConfig::default(),
            auth: Arc::new(StaticAuthProvider::signed_out()),
            cards: Arc::new(AdaptiveCardRenderer::new()),
        });
        TurnContext::new("conv", "user", services)
    }

    fn root() -> FrameOptions {
        FrameOptions::Site(SiteRequest::default())
    }

    fn texts(cx: &TurnContext) -> Vec<String> {
        cx.outbox().iter().map(Activity::plain_text).collect()
    }

    #[tokio::test]
    async fn fresh_turn_starts_root_and_suspends() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        let mut cx = cx();
        let status = mgr
            .run_turn(&mut stack, &TurnPayload::text("hello"), root(), &mut cx)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Waiting);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.active().unwrap().step_index, 0);
        assert!(stack.is_waiting());
        assert_eq!(texts(&cx), vec!["word?"]);
    }

    #[tokio::test]
    async fn rejection_precedes_reprompt_and_keeps_step() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        mgr.run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx())
            .await
            .unwrap();

        let mut cx = cx();
        let status = mgr
            .run_turn(&mut stack, &TurnPayload::text("bad"), root(), &mut cx)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Waiting);
        assert_eq!(texts(&cx), vec!["nope", "word?"]);
        assert_eq!(stack.active().unwrap().step_index, 0);
    }

    #[tokio::test]
    async fn accepted_answer_runs_to_completion() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        mgr.run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx())
            .await
            .unwrap();
        let status = mgr
            .run_turn(&mut stack, &TurnPayload::text("good"), root(), &mut cx())
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Complete(StepResult::Text("GOOD".into())));
        assert!(stack.is_empty());
    }

    #[tokio::test]
    async fn sub_dialog_result_feeds_parent_next_step() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        mgr.run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx())
            .await
            .unwrap();

        let mut cx1 = cx();
        let status = mgr
            .run_turn(&mut stack, &TurnPayload::text("sub"), root(), &mut cx1)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Waiting);
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.frames()[0].step_index, 1);
        assert_eq!(texts(&cx1), vec!["sure?"]);

        let status = mgr
            .run_turn(&mut stack, &TurnPayload::text("yes"), root(), &mut cx())
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Complete(StepResult::Text("from-sub".into())));
        assert!(stack.is_empty());
    }

    #[tokio::test]
    async fn unrecognized_confirm_reissues_prompt() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        mgr.run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx())
            .await
            .unwrap();
        mgr.run_turn(&mut stack, &TurnPayload::text("sub"), root(), &mut cx())
            .await
            .unwrap();

        let mut cx = cx();
        let status = mgr
            .run_turn(&mut stack, &TurnPayload::text("perhaps"), root(), &mut cx)
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Waiting);
        assert_eq!(texts(&cx), vec!["sure?"]);
        assert_eq!(stack.depth(), 2);
    }

    #[tokio::test]
    async fn stack_without_pending_prompt_restarts_root() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        let mut frame = FlowFrame::new(DialogId::Site, root());
        frame.step_index = 2;
        stack.push(frame);

        let mut cx = cx();
        mgr.run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx)
            .await
            .unwrap();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.active().unwrap().step_index, 0);
        assert_eq!(texts(&cx), vec!["word?"]);
    }

    #[tokio::test]
    async fn replace_swaps_active_frame() {
        let mgr = manager();
        let mut stack = DialogStack::new();
        mgr.run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx())
            .await
            .unwrap();

        let mut cx = cx();
        let status = mgr
            .replace(
                &mut stack,
                DialogId::AliasResolver,
                FrameOptions::Resolver(ResolverOptions::default()),
                &mut cx,
            )
            .await
            .unwrap();
        assert_eq!(status, TurnStatus::Waiting);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.active().unwrap().dialog, DialogId::AliasResolver);
    }

    #[tokio::test]
    async fn unknown_dialog_is_an_error() {
        let mgr = DialogManager::new(DialogId::Site);
        let mut stack = DialogStack::new();
        let err = mgr
            .run_turn(&mut stack, &TurnPayload::text("hi"), root(), &mut cx())
            .await
            .unwrap_err();
        assert!(matches!(err, DialogError::UnknownDialog(_)));
    }
}
