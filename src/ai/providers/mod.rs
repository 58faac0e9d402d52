pub mod endpoint;

use crate::ai::client::{ChatError, ChatResult, CompletionBackend, CompletionRequest, StreamHandle};
use crate::config::{AppConfig, ProviderKind};
use crate::types::{ApiRole, ChatMessage};
use anyhow::Result;
use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Chat;
use rig::providers;

pub use endpoint::EndpointClient;

/// Enum to hold different provider clients
pub enum ProviderClient {
    Endpoint(EndpointClient),
    Groq(providers::groq::Client),
    OpenAI(providers::openai::Client),
}

impl ProviderClient {
    /// Build the configured provider. Requires the credential to be present.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let key = config.credential()?.expose().to_string();
        let client = match config.provider {
            ProviderKind::Endpoint => {
                Self::Endpoint(EndpointClient::new(config.endpoint.clone(), Some(key)))
            }
            ProviderKind::Groq => Self::Groq(providers::groq::Client::new(&key)),
            ProviderKind::OpenAI => Self::OpenAI(providers::openai::Client::new(&key)),
        };
        tracing::info!(provider = %config.provider, model = %config.model, "completion provider ready");
        Ok(client)
    }
}

/// Split wire history into rig's `(prompt, history)` pair. The prompt is the
/// trailing user message.
fn to_rig_chat(messages: &[ChatMessage]) -> (String, Vec<rig::message::Message>) {
    let (prompt, history) = match messages.split_last() {
        Some((last, rest)) if last.role == ApiRole::User => (last.content.clone(), rest),
        _ => ("Continue.".to_string(), messages),
    };

    let history = history
        .iter()
        .map(|msg| match msg.role {
            ApiRole::User | ApiRole::System => rig::message::Message::user(&msg.content),
            ApiRole::Assistant => rig::message::Message::assistant(&msg.content),
        })
        .collect();
    (prompt, history)
}

#[async_trait]
impl CompletionBackend for ProviderClient {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<String> {
        let (prompt, history) = to_rig_chat(&request.messages);
        let sampling = serde_json::json!({ "frequency_penalty": request.frequency_penalty });

        let reply = match self {
            ProviderClient::Endpoint(client) => return client.complete(request).await,
            ProviderClient::Groq(client) => {
                let agent = client
                    .agent(&request.model)
                    .preamble(&request.system)
                    .temperature(request.temperature)
                    .additional_params(sampling)
                    .build();
                agent.chat(prompt.as_str(), history).await
            }
            ProviderClient::OpenAI(client) => {
                let agent = client
                    .agent(&request.model)
                    .preamble(&request.system)
                    .temperature(request.temperature)
                    .additional_params(sampling)
                    .build();
                agent.chat(prompt.as_str(), history).await
            }
        };

        reply.map_err(|e| ChatError::new(e.to_string()))
    }

    async fn stream(&self, request: &CompletionRequest, handle: StreamHandle) -> ChatResult<()> {
        match self {
            ProviderClient::Endpoint(client) => client.stream(request, handle).await,
            _ => {
                let content = self.complete(request).await?;
                handle.replace(content);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_user_message_becomes_prompt() {
        let messages = vec![
            ChatMessage {
                role: ApiRole::Assistant,
                content: "ready".into(),
            },
            ChatMessage::user("hello"),
        ];
        let (prompt, history) = to_rig_chat(&messages);
        assert_eq!(prompt, "hello");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn history_without_user_tail_is_kept_whole() {
        let messages = vec![ChatMessage {
            role: ApiRole::Assistant,
            content: "ready".into(),
        }];
        let (prompt, history) = to_rig_chat(&messages);
        assert_eq!(prompt, "Continue.");
        assert_eq!(history.len(), 1);
    }
}
