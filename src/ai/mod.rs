/// Completion backends for DoubleAgent
///
/// This module provides one interface, [`CompletionBackend`], over the hosted
/// chat-completion APIs the personas talk to.
///
/// # Architecture
///
/// - `client` - request type, backend trait, error type and streaming handle
/// - `providers` - OpenAI-compatible HTTP endpoint and Rig-based providers
///
/// # Usage
///
/// ```rust,no_run
/// use doubleagent::ai::{ProviderClient, CompletionBackend, CompletionRequest};
/// use doubleagent::config::AppConfig;
/// use doubleagent::types::ChatMessage;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::from_env()?;
/// let backend = ProviderClient::from_config(&config)?;
/// let reply = backend
///     .complete(&CompletionRequest {
///         model: config.model.clone(),
///         system: "Be brief.".into(),
///         messages: vec![ChatMessage::user("Hello!")],
///         temperature: 0.7,
///         frequency_penalty: 0.5,
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
mod client;
mod providers;

// Re-export main types
pub use client::{
    ChatError, ChatResult, CompletionBackend, CompletionRequest, StreamHandle,
};
pub use providers::endpoint::{DEFAULT_ENDPOINT, parse_sse_data};
pub use providers::{EndpointClient, ProviderClient};
