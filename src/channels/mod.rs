//! Channel abstraction for message I/O.

pub mod channel;
pub mod cli;
pub mod http;

pub use channel::*;
pub use cli::CliChannel;
pub use http::{MessageRequest, MessageResponse, message_routes};
