//! Sequential attempt-with-fallback over an ordered provider list.

use std::time::{Duration, Instant};

use crate::config::{InferenceConfig, ProviderSpec};
use crate::errors::AttemptError;
use crate::llm::models::provider_handle::{adapter_for, build_request, PromptInput, ShapeAdapter};
use crate::llm::sanitize::Sanitizer;
use crate::llm::utils::network::Transport;

const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    NotStarted,
    Attempting(usize),
    AdvancingToNextProvider(usize),
    Succeeded(usize),
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoAnswerReason {
    /// No usable credential, so no provider was called.
    NoCredential,
    /// Every provider was tried and none produced usable text.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAnswer {
    pub answer: String,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    Answered(RemoteAnswer),
    NoRemoteAnswer(NoAnswerReason),
}

#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub provider: String,
    pub result: Result<(), AttemptError>,
    pub elapsed: Duration,
}

/// Everything one run did, in attempt order.
#[derive(Debug, Clone)]
pub struct ChainReport {
    pub outcome: ChainOutcome,
    pub attempts: Vec<AttemptRecord>,
    pub final_state: ChainState,
}

impl ChainReport {
    pub fn answer(&self) -> Option<&RemoteAnswer> {
        match &self.outcome {
            ChainOutcome::Answered(answer) => Some(answer),
            ChainOutcome::NoRemoteAnswer(_) => None,
        }
    }

    pub fn attempted_providers(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.provider.as_str()).collect()
    }
}

pub struct ChainRunner<T: Transport> {
    transport: T,
    api_key: Option<String>,
    base_url: String,
    attempt_timeout: Duration,
    sanitizer: Sanitizer,
}

impl<T: Transport> ChainRunner<T> {
    pub fn new(transport: T, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            sanitizer: Sanitizer::default(),
        }
    }

    pub fn from_inference(transport: T, api_key: Option<String>, inference: &InferenceConfig) -> Self {
        Self::new(transport, api_key, inference.base_url.clone()).with_timeout(inference.timeout())
    }

    pub fn with_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn with_sanitizer(mut self, sanitizer: Sanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Tries each provider in order and stops at the first usable answer.
    pub async fn run(&self, providers: &[ProviderSpec], input: &PromptInput) -> ChainReport {
        let Some(api_key) = self.api_key.as_deref() else {
            log::info!("no inference credential configured, skipping {} providers", providers.len());
            return ChainReport {
                outcome: ChainOutcome::NoRemoteAnswer(NoAnswerReason::NoCredential),
                attempts: Vec::new(),
                final_state: ChainState::NotStarted,
            };
        };

        let mut attempts = Vec::with_capacity(providers.len());
        let mut state = ChainState::NotStarted;

        for (index, spec) in providers.iter().enumerate() {
            state = ChainState::Attempting(index);
            log::debug!("chain state {:?}: trying {} ({})", state, spec.name, spec.kind());

            let started = Instant::now();
            let result = self.attempt(spec, api_key, input).await;
            let elapsed = started.elapsed();

            match result {
                Ok(answer) => {
                    log::info!("provider {} answered in {:?}", spec.name, elapsed);
                    attempts.push(AttemptRecord {
                        provider: spec.name.clone(),
                        result: Ok(()),
                        elapsed,
                    });
                    return ChainReport {
                        outcome: ChainOutcome::Answered(RemoteAnswer {
                            answer,
                            provider: spec.name.clone(),
                        }),
                        attempts,
                        final_state: ChainState::Succeeded(index),
                    };
                }
                Err(err) => {
                    log::warn!("provider {} failed [{}]: {}", spec.name, err.code(), err);
                    attempts.push(AttemptRecord {
                        provider: spec.name.clone(),
                        result: Err(err),
                        elapsed,
                    });
                    state = ChainState::AdvancingToNextProvider(index);
                }
            }
        }

        log::debug!("chain state {:?}: no provider left", state);
        log::warn!("all {} providers failed", attempts.len());
        ChainReport {
            outcome: ChainOutcome::NoRemoteAnswer(NoAnswerReason::Exhausted),
            attempts,
            final_state: ChainState::Exhausted,
        }
    }

    async fn attempt(
        &self,
        spec: &ProviderSpec,
        api_key: &str,
        input: &PromptInput,
    ) -> Result<String, AttemptError> {
        let adapter = adapter_for(&spec.shape);
        let request = build_request(&adapter, spec, &self.base_url, input);

        let response = tokio::time::timeout(
            self.attempt_timeout,
            self.transport.post_json(&request.url, api_key, &request.payload),
        )
        .await
        .map_err(|_| {
            AttemptError::transport(format!("no response within {:?}", self.attempt_timeout))
        })??;

        let raw = adapter
            .extract_text(&response)
            .ok_or(AttemptError::UnextractableResponse)?;
        self.sanitizer.sanitize(&raw, &request.prompt)
    }
}
