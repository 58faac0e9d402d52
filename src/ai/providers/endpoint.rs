use crate::ai::client::{ChatError, ChatResult, CompletionBackend, CompletionRequest, StreamHandle};
use crate::types::ChatMessage;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";

/// OpenAI-compatible chat completions endpoint (Groq by default).
pub struct EndpointClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f64,
    frequency_penalty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

// Response types
#[derive(Deserialize)]
pub struct CompletionMessage {
    pub content: String,
}

#[derive(Deserialize)]
pub struct CompletionChoice {
    pub message: Option<CompletionMessage>,
    #[serde(default)]
    pub delta: Option<CompletionDelta>,
}

#[derive(Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
pub struct CompletionDelta {
    pub content: Option<String>,
}

impl EndpointClient {
    pub fn new(endpoint: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
        }
    }

    async fn send(&self, request: &CompletionRequest, stream: bool) -> ChatResult<reqwest::Response> {
        let messages = request.wire_messages();
        let mut req = self.client.post(&self.endpoint).json(&CompletionBody {
            model: &request.model,
            messages: &messages,
            temperature: request.temperature,
            frequency_penalty: request.frequency_penalty,
            stream: stream.then_some(true),
        });
        if stream {
            req = req.header("accept", "text/event-stream");
        }
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        tracing::debug!(model = %request.model, messages = messages.len(), stream, "sending completion");
        let res = req.send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ChatError::new(format!("API error {status}: {body}")));
        }
        Ok(res)
    }
}

#[async_trait]
impl CompletionBackend for EndpointClient {
    async fn complete(&self, request: &CompletionRequest) -> ChatResult<String> {
        let res = self.send(request, false).await?;
        let body = res.text().await?;

        let parsed: CompletionResponse = serde_json::from_str(&body)?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|msg| msg.content)
            .ok_or_else(|| ChatError::new("completion response had no choices"))
    }

    async fn stream(&self, request: &CompletionRequest, handle: StreamHandle) -> ChatResult<()> {
        let res = self.send(request, true).await?;

        let mut lines = SseLines::default();
        let mut stream = res.bytes_stream();
        while let Some(item) = stream.next().await {
            let bytes = item?;
            for data in lines.push(&bytes)? {
                if apply_sse_data(&handle, &data) {
                    return Ok(());
                }
            }
        }

        // Stream closed without a trailing blank line.
        for data in lines.finish()? {
            if apply_sse_data(&handle, &data) {
                return Ok(());
            }
        }
        handle.finish();
        Ok(())
    }
}

/// Push one payload into `handle`. True once the stream is done.
fn apply_sse_data(handle: &StreamHandle, data: &str) -> bool {
    let Some((piece, done)) = parse_sse_data(data) else {
        return false;
    };
    if !piece.is_empty() {
        handle.append(&piece);
    }
    if done {
        handle.finish();
    }
    done
}

/// SSE line reader over raw bytes.
///
/// Bytes are buffered until a full line arrives, so a UTF-8 sequence split
/// across network chunks is decoded whole. Consecutive `data:` lines
/// accumulate until a blank line ends the event.
#[derive(Debug, Default)]
struct SseLines {
    buffer: Vec<u8>,
    data: Option<String>,
}

impl SseLines {
    /// Feed a chunk and return the payload of every event it completes.
    fn push(&mut self, bytes: &[u8]) -> ChatResult<Vec<String>> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8(raw)
                .map_err(|e| ChatError::new(format!("stream line is not valid UTF-8: {e}")))?;

            if line.is_empty() {
                if let Some(data) = self.data.take() {
                    events.push(data);
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("data:") {
                let s = rest.trim_start();
                match &mut self.data {
                    Some(acc) => acc.push_str(s),
                    None => self.data = Some(s.to_string()),
                }
            }
        }
        Ok(events)
    }

    /// Flush a trailing unterminated line and any pending event.
    fn finish(&mut self) -> ChatResult<Vec<String>> {
        let mut events = if self.buffer.is_empty() {
            Vec::new()
        } else {
            self.push(b"\n")?
        };
        events.extend(self.data.take());
        Ok(events)
    }
}

/// Parse one SSE `data:` payload into `(delta_text, done)`.
pub fn parse_sse_data(data: &str) -> Option<(String, bool)> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed == "[DONE]" {
        return Some((String::new(), true));
    }

    let parsed = serde_json::from_str::<CompletionResponse>(trimmed).ok()?;
    if let Some(first) = parsed.choices.into_iter().next() {
        if let Some(delta) = first.delta
            && let Some(piece) = delta.content
        {
            return Some((piece, false));
        }
        if let Some(msg) = first.message {
            return Some((msg.content, false));
        }
    }
    Some((String::new(), false))
}
