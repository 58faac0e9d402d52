//! DoubleAgent: several personas answer every prompt side by side.
//!
//! The core is [`session::Session`]: each round gathers document or web
//! context, fans the prompt out to the active personas through
//! [`dispatch::Dispatcher`], and appends the replies to the session's
//! [`conversation::ConversationLog`] in persona order.

pub mod ai;
pub mod blueprint;
pub mod config;
pub mod context;
pub mod conversation;
pub mod dispatch;
pub mod personas;
pub mod session;
pub mod types;

#[cfg(feature = "dioxus")]
pub mod ui;
#[cfg(feature = "dioxus")]
pub mod views;
