//! Dialog system — the resumable site-request conversation.
//!
//! A conversation is a stack of dialog frames persisted between turns. The
//! site wizard sits at the bottom and collects the request; when it needs an
//! owner or an alias it pushes a resolver that signs the user in and checks
//! the answer against the directory. Each turn resumes whatever frame is
//! waiting, runs steps until the next question, and hands the stack back for
//! saving.

pub mod context;
pub mod manager;
pub mod model;
pub mod prompt;
pub mod resolver;
pub mod site;
pub mod state;

pub use context::{Services, TurnContext};
pub use manager::{Dialog, DialogManager, StepOutcome, TurnStatus};
pub use model::{SiteRequest, SiteType};
pub use prompt::{PromptSpec, TurnPayload, Validation};
pub use resolver::{AliasValidator, AnswerValidator, OwnerValidator, ResolverDialog, ResolverField};
pub use site::{SiteDialog, SiteStep};
pub use state::{DialogId, DialogStack, FlowFrame, FrameOptions, PromptKind, PromptState, ResolverOptions, StepResult};
