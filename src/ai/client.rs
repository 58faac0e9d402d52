use crate::types::ChatMessage;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ============================================
// Error Types
// ============================================

#[derive(Debug, Clone)]
pub struct ChatError(String);

impl ChatError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ChatError {}

impl From<anyhow::Error> for ChatError {
    fn from(err: anyhow::Error) -> Self {
        ChatError::new(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::new(err.to_string())
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::new(err.to_string())
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

// ============================================
// Requests
// ============================================

/// One chat completion call: a persona's system prompt, the mapped history
/// and its sampling parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub frequency_penalty: f64,
}

impl CompletionRequest {
    /// Full wire message list, system message first.
    pub fn wire_messages(&self) -> Vec<ChatMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(ChatMessage::system(self.system.clone()));
        out.extend(self.messages.iter().cloned());
        out
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<String>;

    /// Push deltas into `handle` as they arrive. Backends without native
    /// streaming deliver the whole reply at once.
    async fn stream(&self, request: &CompletionRequest, handle: StreamHandle) -> ChatResult<()> {
        let content = self.complete(request).await?;
        handle.replace(content);
        Ok(())
    }
}

// ============================================
// Streaming State
// ============================================

#[derive(Debug, Default)]
struct StreamEntry {
    buffer: String,
    done: bool,
}

/// Shared buffer a streaming reply is written into and polled from.
#[derive(Clone, Debug, Default)]
pub struct StreamHandle {
    entry: Arc<Mutex<StreamEntry>>,
}

impl StreamHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StreamEntry> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, piece: &str) {
        self.lock().buffer.push_str(piece);
    }

    /// Set the whole buffer and mark the stream done.
    pub fn replace(&self, content: String) {
        let mut entry = self.lock();
        entry.buffer = content;
        entry.done = true;
    }

    pub fn finish(&self) {
        self.lock().done = true;
    }

    pub fn fail(&self, message: &str) {
        self.replace(message.to_string());
    }

    /// Current text and whether the stream has ended.
    pub fn snapshot(&self) -> (String, bool) {
        let entry = self.lock();
        (entry.buffer.clone(), entry.done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_handle_accumulates_until_finished() {
        let handle = StreamHandle::new();
        let reader = handle.clone();

        handle.append("Hello");
        assert_eq!(reader.snapshot(), ("Hello".to_string(), false));

        handle.append(" world");
        handle.finish();
        assert_eq!(reader.snapshot(), ("Hello world".to_string(), true));
    }

    #[test]
    fn failing_stream_replaces_partial_text() {
        let handle = StreamHandle::new();
        handle.append("partial");
        handle.fail("boom");
        assert_eq!(handle.snapshot(), ("boom".to_string(), true));
    }

    #[test]
    fn wire_messages_put_system_first() {
        let request = CompletionRequest {
            model: "m".into(),
            system: "sys".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.5,
            frequency_penalty: 0.0,
        };
        let wire = request.wire_messages();
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0], ChatMessage::system("sys"));
    }
}
