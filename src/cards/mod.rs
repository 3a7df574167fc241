//! Card payloads — outbound activities and template rendering.

pub mod model;
pub mod renderer;

pub use model::{Activity, Attachment, AttachmentLayout, CardField, CardTemplate, FieldMap};
pub use renderer::{AdaptiveCardRenderer, CardRenderer};
