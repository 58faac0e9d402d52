//! Fan-out of one round to every active persona.

use crate::ai::{ChatError, CompletionBackend, CompletionRequest, StreamHandle};
use crate::context::RoundContext;
use crate::personas::PersonaSpec;
use crate::types::{ChatMessage, Role, Turn};
use std::fmt;
use std::sync::Arc;

/// A persona's request that did not produce a reply.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonaFailure {
    pub persona: String,
    pub message: String,
}

impl fmt::Display for PersonaFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "🚨 {} Failure: {}", self.persona, self.message)
    }
}

impl std::error::Error for PersonaFailure {}

#[derive(Clone, Debug, PartialEq)]
pub struct PersonaReply {
    pub persona_id: &'static str,
    pub persona_name: &'static str,
    pub outcome: Result<String, PersonaFailure>,
}

impl PersonaReply {
    /// Text shown inline: the reply, or the failure message in its place.
    pub fn display_text(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(failure) => failure.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }

    pub fn into_turn(self) -> Turn {
        let content = self.display_text();
        Turn::new(Role::persona(self.persona_name), content)
    }
}

/// Issues one completion per persona and joins them in declaration order.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn CompletionBackend>,
    model: String,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn CompletionBackend>, model: impl Into<String>) -> Self {
        Self {
            backend,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn backend(&self) -> Arc<dyn CompletionBackend> {
        Arc::clone(&self.backend)
    }

    /// Request for one persona: its prompt plus context, then the mapped history.
    pub fn build_request(
        &self,
        history: &[Turn],
        context: &RoundContext,
        persona: &PersonaSpec,
    ) -> CompletionRequest {
        CompletionRequest {
            model: self.model.clone(),
            system: context.system_prompt(persona.system_prompt, persona.context),
            messages: history.iter().map(ChatMessage::from).collect(),
            temperature: persona.temperature,
            frequency_penalty: persona.frequency_penalty,
        }
    }

    /// Run every active persona concurrently and wait for all of them.
    ///
    /// One result per persona, in `active` order. A failing persona never
    /// affects its siblings.
    pub async fn dispatch(
        &self,
        history: &[Turn],
        context: &RoundContext,
        active: &[PersonaSpec],
    ) -> Vec<PersonaReply> {
        let tasks: Vec<_> = active
            .iter()
            .map(|persona| {
                let request = self.build_request(history, context, persona);
                let backend = Arc::clone(&self.backend);
                let name = persona.name;
                tokio::spawn(async move {
                    tracing::debug!(persona = name, temperature = request.temperature, "persona request issued");
                    backend.complete(&request).await
                })
            })
            .collect();

        let mut replies = Vec::with_capacity(active.len());
        for (persona, task) in active.iter().zip(tasks) {
            let outcome = match task.await {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(err)) => Err(failure(persona, &err)),
                Err(join_err) => Err(PersonaFailure {
                    persona: persona.name.to_string(),
                    message: join_err.to_string(),
                }),
            };
            if let Err(err) = &outcome {
                tracing::warn!(persona = persona.name, error = %err.message, "persona request failed");
            }
            replies.push(PersonaReply {
                persona_id: persona.id,
                persona_name: persona.name,
                outcome,
            });
        }
        replies
    }

    /// Stream a single persona's reply into `handle`.
    ///
    /// Returns the final reply once the stream ends; a failure also replaces
    /// the handle's buffer with the failure text.
    pub async fn dispatch_streaming(
        &self,
        history: &[Turn],
        context: &RoundContext,
        persona: &PersonaSpec,
        handle: StreamHandle,
    ) -> PersonaReply {
        let request = self.build_request(history, context, persona);
        let outcome = match self.backend.stream(&request, handle.clone()).await {
            Ok(()) => {
                handle.finish();
                Ok(handle.snapshot().0)
            }
            Err(err) => {
                let failure = failure(persona, &err);
                tracing::warn!(persona = persona.name, error = %err, "persona stream failed");
                handle.fail(&failure.to_string());
                Err(failure)
            }
        };
        PersonaReply {
            persona_id: persona.id,
            persona_name: persona.name,
            outcome,
        }
    }
}

fn failure(persona: &PersonaSpec, err: &ChatError) -> PersonaFailure {
    PersonaFailure {
        persona: persona.name.to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ChatResult;
    use crate::personas::ContextSource;
    use crate::types::ApiRole;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    fn persona(id: &'static str, name: &'static str, temperature: f64) -> PersonaSpec {
        PersonaSpec {
            id,
            name,
            system_prompt: name,
            temperature,
            frequency_penalty: 0.0,
            context: ContextSource::None,
        }
    }

    /// Replies with the system prompt after a per-persona delay.
    struct SlowEcho {
        delays_ms: Vec<(&'static str, u64)>,
        failing: Option<&'static str>,
        completed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CompletionBackend for SlowEcho {
        async fn complete(&self, request: &CompletionRequest) -> ChatResult<String> {
            let delay = self
                .delays_ms
                .iter()
                .find(|(name, _)| *name == request.system)
                .map(|(_, ms)| *ms)
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.completed.lock().unwrap().push(request.system.clone());
            if self.failing == Some(request.system.as_str()) {
                return Err(ChatError::new("rate limited"));
            }
            Ok(format!("{} says hi", request.system))
        }
    }

    fn dispatcher(backend: SlowEcho) -> (Dispatcher, Arc<SlowEcho>) {
        let backend = Arc::new(backend);
        (Dispatcher::new(backend.clone(), "test-model"), backend)
    }

    #[tokio::test]
    async fn results_follow_declaration_not_completion() {
        let (dispatcher, backend) = dispatcher(SlowEcho {
            delays_ms: vec![("A", 80), ("B", 5), ("C", 40)],
            failing: None,
            completed: Mutex::new(Vec::new()),
        });
        let active = [persona("a", "A", 0.6), persona("b", "B", 0.9), persona("c", "C", 0.2)];

        let replies = dispatcher
            .dispatch(&[Turn::user("hello")], &RoundContext::new(100), &active)
            .await;

        let names: Vec<_> = replies.iter().map(|r| r.persona_name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(replies[1].outcome, Ok("B says hi".to_string()));
        assert_eq!(*backend.completed.lock().unwrap(), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn failure_is_isolated_to_its_persona() {
        let (dispatcher, _) = dispatcher(SlowEcho {
            delays_ms: vec![],
            failing: Some("B"),
            completed: Mutex::new(Vec::new()),
        });
        let active = [persona("a", "A", 0.6), persona("b", "B", 0.9)];

        let replies = dispatcher
            .dispatch(&[Turn::user("hello")], &RoundContext::new(100), &active)
            .await;

        assert_eq!(replies.len(), 2);
        assert!(!replies[0].is_failure());
        assert!(!replies[0].display_text().contains("Failure"));
        let text = replies[1].display_text();
        assert!(text.contains("B"));
        assert!(text.contains("rate limited"));
    }

    #[test]
    fn request_maps_roles_and_sampling() {
        let (dispatcher, _) = dispatcher(SlowEcho {
            delays_ms: vec![],
            failing: None,
            completed: Mutex::new(Vec::new()),
        });
        let history = vec![
            Turn::assistant("ready"),
            Turn::user("hello"),
            Turn::new(Role::persona("A"), "earlier"),
        ];
        let spec = PersonaSpec {
            frequency_penalty: 0.5,
            ..persona("b", "B", 0.9)
        };

        let request = dispatcher.build_request(&history, &RoundContext::new(100), &spec);
        let roles: Vec<_> = request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ApiRole::Assistant, ApiRole::User, ApiRole::Assistant]);
        assert_eq!(request.temperature, 0.9);
        assert_eq!(request.frequency_penalty, 0.5);
        assert_eq!(request.model, "test-model");
    }

    #[tokio::test]
    async fn streaming_failure_lands_in_handle() {
        let (dispatcher, _) = dispatcher(SlowEcho {
            delays_ms: vec![],
            failing: Some("A"),
            completed: Mutex::new(Vec::new()),
        });
        let handle = StreamHandle::new();

        let reply = dispatcher
            .dispatch_streaming(
                &[Turn::user("hi")],
                &RoundContext::new(100),
                &persona("a", "A", 0.7),
                handle.clone(),
            )
            .await;

        assert!(reply.is_failure());
        let (text, done) = handle.snapshot();
        assert!(done);
        assert_eq!(text, "🚨 A Failure: rate limited");
    }
}
