//! One user session: the conversation log plus everything a round needs.
//!
//! A round is split in three so a front end can release the session while
//! requests are in flight: [`Session::prepare_round`] records the user turn
//! and snapshots the history, [`Round::execute`] gathers context and fans
//! out, [`Session::commit`] appends the replies.

use crate::ai::{CompletionBackend, StreamHandle};
use crate::blueprint;
use crate::config::AppConfig;
use crate::context::{self, Document, ExtractWarning, RoundContext, SearchProvider};
use crate::conversation::ConversationLog;
use crate::dispatch::{Dispatcher, PersonaFailure, PersonaReply};
use crate::personas::{ContextSource, Mode, PersonaSpec, Variant};
use crate::types::{Role, Turn};
use std::sync::Arc;
use std::time::Duration;

pub struct Session {
    config: AppConfig,
    dispatcher: Dispatcher,
    search: Option<Arc<dyn SearchProvider>>,
    log: ConversationLog,
}

/// Everything one round needs, detached from the session.
pub struct Round {
    prompt: String,
    history: Vec<Turn>,
    documents: Vec<Document>,
    active: Vec<PersonaSpec>,
    budget: usize,
    dispatcher: Dispatcher,
    search: Option<Arc<dyn SearchProvider>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoundReport {
    pub replies: Vec<PersonaReply>,
    pub warnings: Vec<ExtractWarning>,
}

impl RoundReport {
    /// Report for a round whose task died before producing one. The persona's
    /// slot carries the failure so the round still shows up in the log.
    pub fn aborted(persona: Option<&PersonaSpec>, message: impl Into<String>) -> Self {
        let replies = persona
            .map(|p| PersonaReply {
                persona_id: p.id,
                persona_name: p.name,
                outcome: Err(PersonaFailure {
                    persona: p.name.to_string(),
                    message: message.into(),
                }),
            })
            .into_iter()
            .collect();
        Self {
            replies,
            warnings: Vec::new(),
        }
    }
}

impl Session {
    /// Start a session seeded with the variant's greeting.
    pub fn new(
        config: AppConfig,
        backend: Arc<dyn CompletionBackend>,
        search: Option<Arc<dyn SearchProvider>>,
    ) -> Self {
        let variant = config.variant;
        let seed_role = match variant.greeter() {
            Some(persona) => Role::persona(persona.name),
            None => Role::Assistant,
        };
        let search = if config.search_enabled { search } else { None };
        tracing::info!(%variant, model = %config.model, "session started");
        Self {
            dispatcher: Dispatcher::new(backend, config.model.clone()),
            config,
            search,
            log: ConversationLog::new(Turn::new(seed_role, variant.greeting())),
        }
    }

    pub fn variant(&self) -> Variant {
        self.config.variant
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Record the user turn and snapshot what the round needs.
    pub fn prepare_round(&mut self, prompt: &str, documents: &[Document], mode: &Mode) -> Round {
        self.log.append(Turn::user(prompt));
        Round {
            prompt: prompt.to_string(),
            history: self.log.all().to_vec(),
            documents: documents.to_vec(),
            active: mode.select(self.config.variant),
            budget: self.config.context_char_budget,
            dispatcher: self.dispatcher.clone(),
            search: self.search.clone(),
        }
    }

    /// Append every reply in order. Failures are stored as their error text.
    pub fn commit(&mut self, report: &RoundReport) {
        for reply in &report.replies {
            self.log.append(reply.clone().into_turn());
        }
    }

    /// Run a full round: user turn, fan-out, replies appended.
    pub async fn run_round(&mut self, prompt: &str, documents: &[Document], mode: &Mode) -> RoundReport {
        let round = self.prepare_round(prompt, documents, mode);
        let report = round.execute().await;
        self.commit(&report);
        report
    }

    pub async fn blueprint(&self) -> String {
        self.blueprint_task().await
    }

    /// Blueprint over a snapshot of the log, detached from the session.
    pub fn blueprint_task(&self) -> impl Future<Output = String> + Send + 'static {
        let backend = self.dispatcher.backend();
        let model = self.dispatcher.model().to_string();
        let log = self.log.clone();
        async move { blueprint::compile(backend.as_ref(), &model, &log).await }
    }
}

impl Round {
    pub fn active(&self) -> &[PersonaSpec] {
        &self.active
    }

    fn wants(&self, source: ContextSource) -> bool {
        self.active.iter().any(|p| p.context == source)
    }

    /// Fresh context for this round only.
    async fn gather_context(&self) -> (RoundContext, Vec<ExtractWarning>) {
        let mut ctx = RoundContext::new(self.budget);
        let mut warnings = Vec::new();

        if self.wants(ContextSource::Documents) && !self.documents.is_empty() {
            let extraction = context::extract(&self.documents);
            warnings = extraction.warnings;
            ctx = ctx.with_documents(extraction.text);
        }
        if self.wants(ContextSource::WebSearch)
            && let Some(provider) = &self.search
        {
            ctx = ctx.with_search(context::search_context(provider.as_ref(), &self.prompt).await);
        }
        (ctx, warnings)
    }

    pub async fn execute(self) -> RoundReport {
        let (ctx, warnings) = self.gather_context().await;
        let replies = self.dispatcher.dispatch(&self.history, &ctx, &self.active).await;
        let failed = replies.iter().filter(|r| r.is_failure()).count();
        tracing::info!(personas = replies.len(), failed, "round complete");
        RoundReport { replies, warnings }
    }

    /// Single-persona round with incremental output into `handle`.
    pub async fn execute_streaming(self, handle: StreamHandle) -> RoundReport {
        let (ctx, warnings) = self.gather_context().await;
        let Some(persona) = self.active.first() else {
            handle.finish();
            return RoundReport {
                replies: Vec::new(),
                warnings,
            };
        };
        let reply = self
            .dispatcher
            .dispatch_streaming(&self.history, &ctx, persona, handle)
            .await;
        RoundReport {
            replies: vec![reply],
            warnings,
        }
    }

    /// Stream on a separate task, handing each snapshot of the buffer to
    /// `on_update` every `interval` until the reply ends.
    ///
    /// The loop also stops when the task ends without marking the handle
    /// done; a task that panicked is reported as the persona's failure.
    pub async fn stream_with_updates(
        self,
        handle: StreamHandle,
        interval: Duration,
        mut on_update: impl FnMut(String),
    ) -> RoundReport {
        let persona = self.active.first().copied();
        let task = tokio::spawn(self.execute_streaming(handle.clone()));
        loop {
            let finished = task.is_finished();
            let (content, done) = handle.snapshot();
            on_update(content);
            if done || finished {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        match task.await {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(error = %err, "streaming round aborted");
                let report = RoundReport::aborted(persona.as_ref(), err.to_string());
                if let Some(reply) = report.replies.first() {
                    handle.fail(&reply.display_text());
                }
                report
            }
        }
    }
}
