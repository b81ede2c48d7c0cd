//! Core of the Aegis emergency-management dashboard: domain types, the AI
//! Gateway capability and the state machines behind each dashboard view.

pub mod chat;
pub mod error;
pub mod gateway;
pub mod incident;
#[cfg(feature = "direct")]
pub mod llm;
pub mod navigation;
pub mod operations;
pub mod report;
#[cfg(feature = "rest")]
pub mod rest;
pub mod theme;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ChatError, GatewayError, ReportError, ValidationError};
pub use gateway::{AiGateway, ChatReply};
pub use navigation::{Dashboard, View};
