use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{AppConfig, ProviderSpec};
use crate::errors::ChatError;
use crate::llm::chain::{ChainOutcome, ChainRunner, NoAnswerReason};
use crate::llm::fallback::FallbackResponder;
use crate::llm::models::provider_handle::PromptInput;
use crate::llm::sanitize::Sanitizer;
use crate::llm::utils::network::{HttpTransport, Transport};
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::session::{SessionRetention, SessionStore};

/// What happens when no provider answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// Answer from the local fallback responder.
    #[default]
    Lenient,
    /// Return [`ChatError::NoCredential`] or [`ChatError::Exhausted`].
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Remote,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub answer: String,
    pub session_id: String,
    /// Provider that answered, or the fallback label.
    pub model: String,
    pub source: AnswerSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedSession {
    pub session_id: String,
}

/// Orchestrates one chat exchange: session context in, provider chain,
/// fallback when needed, history and metrics out.
pub struct ChatAgent<T: Transport = HttpTransport> {
    store: Arc<SessionStore>,
    runner: ChainRunner<T>,
    providers: Vec<ProviderSpec>,
    fallback: FallbackResponder,
    metrics: MetricsRecorder,
    context_turns: usize,
    mode: ReplyMode,
}

impl ChatAgent<HttpTransport> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.inference.timeout())?;
        let runner = ChainRunner::from_inference(transport, config.credential(), &config.inference)
            .with_sanitizer(Sanitizer::new(&config.sanitizer));
        let store = Arc::new(SessionStore::new(SessionRetention::from(&config.session)));
        if tokio::runtime::Handle::try_current().is_ok() {
            let every = (store.retention().idle_ttl / 4).max(Duration::from_secs(1));
            store.spawn_sweeper(every);
        }
        let mode = if config.strict_mode {
            ReplyMode::Strict
        } else {
            ReplyMode::Lenient
        };

        log::info!(
            "chat agent ready: {} providers, credential {}, {:?} mode",
            config.providers.len(),
            if runner.has_credential() { "present" } else { "absent" },
            mode
        );

        Ok(ChatAgent::new(runner, config.ordered_providers(), store)
            .with_context_turns(config.session.context_turns)
            .with_mode(mode))
    }
}

impl<T: Transport> ChatAgent<T> {
    pub fn new(runner: ChainRunner<T>, providers: Vec<ProviderSpec>, store: Arc<SessionStore>) -> Self {
        Self {
            store,
            runner,
            providers,
            fallback: FallbackResponder::new(),
            metrics: MetricsRecorder::new(),
            context_turns: 6,
            mode: ReplyMode::Lenient,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackResponder) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_context_turns(mut self, context_turns: usize) -> Self {
        self.context_turns = context_turns;
        self
    }

    pub fn with_mode(mut self, mode: ReplyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn runner(&self) -> &ChainRunner<T> {
        &self.runner
    }

    pub fn providers(&self) -> &[ProviderSpec] {
        &self.providers
    }

    pub fn start_session(&self) -> StartedSession {
        let session_id = self.store.create();
        log::debug!("session {} started", session_id);
        StartedSession { session_id }
    }

    /// Returns whether the session existed.
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.store.remove(session_id);
        if removed {
            log::debug!("session {} ended", session_id);
        }
        removed
    }

    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        let started = Instant::now();
        self.store.touch(session_id)?;

        let context = self.store.recent_context(session_id, self.context_turns);
        let input = PromptInput::new(message).with_context(context);
        let report = self.runner.run(&self.providers, &input).await;

        let (answer, model, source, success) = match report.outcome {
            ChainOutcome::Answered(remote) => (remote.answer, remote.provider, AnswerSource::Remote, true),
            ChainOutcome::NoRemoteAnswer(reason) => {
                if self.mode == ReplyMode::Strict {
                    self.metrics.record(started.elapsed(), false);
                    return Err(match reason {
                        NoAnswerReason::NoCredential => ChatError::NoCredential,
                        NoAnswerReason::Exhausted => ChatError::Exhausted {
                            attempted: report.attempts.len(),
                        },
                    });
                }
                let reply = self.fallback.respond(message, reason);
                (
                    reply.text,
                    reply.label.to_string(),
                    AnswerSource::Fallback,
                    reason == NoAnswerReason::NoCredential,
                )
            }
        };

        // History only changes once the answer is final.
        self.store.append_exchange(session_id, message, answer.as_str())?;
        self.metrics.record(started.elapsed(), success);

        Ok(ChatReply {
            answer,
            session_id: session_id.to_string(),
            model,
            source,
        })
    }

    pub fn fetch_metrics(&self) -> MetricsSnapshot {
        let expired = self.store.sweep_expired();
        if expired > 0 {
            log::debug!("dropped {} idle sessions before reporting metrics", expired);
        }
        self.metrics.snapshot(self.store.len())
    }
}
