//! Session blueprint: one summarisation call over the whole log.

use crate::ai::{CompletionBackend, CompletionRequest};
use crate::conversation::ConversationLog;
use crate::types::ChatMessage;
use std::io;
use std::path::{Path, PathBuf};

pub const BLUEPRINT_FILE_NAME: &str = "doubleagent_blueprint.txt";
pub const BLUEPRINT_MEDIA_TYPE: &str = "text/plain";

const BLUEPRINT_TEMPERATURE: f64 = 0.3;

const BLUEPRINT_SYSTEM_PROMPT: &str =
    "You are a meticulous technical writer. You turn brainstorming transcripts into concise project blueprints.";

const BLUEPRINT_TEMPLATE: &str = "Summarize the session below into a project blueprint.
Use exactly this structure and fill every section from the transcript:

PROJECT BLUEPRINT: <one-line title>

1. EXECUTIVE SUMMARY
2. KEY DECISIONS
3. OPEN RISKS
4. NEXT ACTIONS

TRANSCRIPT:
";

/// One `ROLE: content` line per turn.
pub fn transcript(log: &ConversationLog) -> String {
    log.all()
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label().to_uppercase(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn blueprint_request(model: &str, log: &ConversationLog) -> CompletionRequest {
    CompletionRequest {
        model: model.to_string(),
        system: BLUEPRINT_SYSTEM_PROMPT.to_string(),
        messages: vec![ChatMessage::user(format!("{BLUEPRINT_TEMPLATE}{}", transcript(log)))],
        temperature: BLUEPRINT_TEMPERATURE,
        frequency_penalty: 0.0,
    }
}

/// Compile the log into a report. Failures come back as the report text.
pub async fn compile(backend: &dyn CompletionBackend, model: &str, log: &ConversationLog) -> String {
    let request = blueprint_request(model, log);
    tracing::info!(turns = log.len(), "compiling blueprint");
    match backend.complete(&request).await {
        Ok(report) => report,
        Err(err) => {
            tracing::warn!(error = %err, "blueprint generation failed");
            format!("Blueprint generation failed: {err}")
        }
    }
}

/// Default directory the report is offered in.
pub fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("doubleagent")))
        .unwrap_or_else(|| PathBuf::from("cache"))
}

/// Write the report as `doubleagent_blueprint.txt` inside `dir`.
pub fn save_blueprint(report: &str, dir: &Path) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(BLUEPRINT_FILE_NAME);
    std::fs::write(&path, report)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{ChatError, ChatResult};
    use crate::types::{Role, Turn};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recorder {
        seen: Mutex<Option<CompletionRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionBackend for Recorder {
        async fn complete(&self, request: &CompletionRequest) -> ChatResult<String> {
            *self.seen.lock().unwrap() = Some(request.clone());
            if self.fail {
                Err(ChatError::new("401 invalid api key"))
            } else {
                Ok("PROJECT BLUEPRINT: Test".into())
            }
        }
    }

    fn sample_log() -> ConversationLog {
        let mut log = ConversationLog::new(Turn::assistant("ready"));
        log.append(Turn::user("build a kiosk"));
        log.append(Turn::new(Role::persona("Architect"), "two services"));
        log
    }

    #[test]
    fn transcript_has_one_line_per_turn() {
        let text = transcript(&sample_log());
        assert_eq!(
            text,
            "ASSISTANT: ready\nUSER: build a kiosk\nARCHITECT: two services"
        );
    }

    #[tokio::test]
    async fn compile_issues_single_low_temperature_request() {
        let backend = Recorder {
            seen: Mutex::new(None),
            fail: false,
        };
        let report = compile(&backend, "llama3-70b-8192", &sample_log()).await;
        assert_eq!(report, "PROJECT BLUEPRINT: Test");

        let request = backend.seen.lock().unwrap().clone().unwrap();
        assert!(request.temperature <= 0.5);
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.contains("USER: build a kiosk"));
        assert!(request.messages[0].content.contains("4. NEXT ACTIONS"));
    }

    #[tokio::test]
    async fn compile_failure_becomes_text() {
        let backend = Recorder {
            seen: Mutex::new(None),
            fail: true,
        };
        let report = compile(&backend, "m", &sample_log()).await;
        assert!(report.starts_with("Blueprint generation failed"));
        assert!(report.contains("401"));
    }

    #[test]
    fn save_writes_fixed_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_blueprint("report body", dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), BLUEPRINT_FILE_NAME);
        assert_eq!(std::fs::read_to_string(path).unwrap(), "report body");
    }
}
