//! Site Wizard — conversational site-request bot.

pub mod bot;
pub mod cards;
pub mod channels;
pub mod config;
pub mod dialog;
pub mod error;
pub mod services;
pub mod store;
