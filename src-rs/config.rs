use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::cons::provider_cons::{ShapeKind, DEFAULT_INSTRUCTION_TEMPLATE};

/// Tunable generation parameters sent with every request to a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_do_sample")]
    pub do_sample: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
}

fn default_max_new_tokens() -> u32 {
    50
}

fn default_temperature() -> f64 {
    0.7
}

fn default_do_sample() -> bool {
    true
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            do_sample: default_do_sample(),
            repetition_penalty: None,
            top_p: None,
        }
    }
}

/// Request contract of a provider. Each variant is served by exactly one adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RequestShape {
    /// `inputs` carries past user inputs and generated responses as arrays.
    Conversational,
    /// `inputs` is plain text.
    Completion,
    /// `inputs` is rendered from a template with `{message}` / `{context}` slots.
    Instruction {
        #[serde(default = "default_instruction_template")]
        template: String,
        #[serde(default)]
        stop: Vec<String>,
    },
}

fn default_instruction_template() -> String {
    DEFAULT_INSTRUCTION_TEMPLATE.to_string()
}

impl RequestShape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            RequestShape::Conversational => ShapeKind::Conversational,
            RequestShape::Completion => ShapeKind::Completion,
            RequestShape::Instruction { .. } => ShapeKind::Instruction,
        }
    }

    pub fn from_kind(kind: ShapeKind, template: Option<String>, stop: Vec<String>) -> Self {
        match kind {
            ShapeKind::Conversational => RequestShape::Conversational,
            ShapeKind::Completion => RequestShape::Completion,
            ShapeKind::Instruction => RequestShape::Instruction {
                template: template.unwrap_or_else(default_instruction_template),
                stop,
            },
        }
    }
}

/// One remote model in the provider chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Model name (e.g., "microsoft/DialoGPT-medium"), also the default URL suffix
    pub name: String,

    /// Explicit endpoint; defaults to `<inference.base_url>/<name>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    pub shape: RequestShape,

    #[serde(default)]
    pub params: GenerationParams,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, shape: RequestShape) -> Self {
        Self {
            name: name.into(),
            url: None,
            shape,
            params: GenerationParams::default(),
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }

    pub fn endpoint(&self, base_url: &str) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!("{}/{}", base_url.trim_end_matches('/'), self.name),
        }
    }
}

/// Remote inference settings from Config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for a single provider call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Environment variables checked, in order, for the API key
    #[serde(default = "default_credential_env")]
    pub credential_env: Vec<String>,

    /// Sample values shipped in templates that count as "no key"
    #[serde(default)]
    pub placeholder_keys: Vec<String>,
}

fn default_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_credential_env() -> Vec<String> {
    vec![
        "RELAYCHAT_API_KEY".to_string(),
        "HUGGING_FACE_API_KEY".to_string(),
    ]
}

impl InferenceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Session retention settings from Config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Turns kept per session
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Turns fed back into prompts
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

fn default_idle_ttl_secs() -> u64 {
    3600
}

fn default_max_sessions() -> usize {
    10_000
}

fn default_max_turns() -> usize {
    20
}

fn default_context_turns() -> usize {
    6
}

/// Response cleaning settings from Config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizerConfig {
    #[serde(default = "default_min_chars")]
    pub min_chars: usize,

    #[serde(default = "default_reject_markers")]
    pub reject_markers: Vec<String>,

    #[serde(default = "default_role_markers")]
    pub role_markers: Vec<String>,

    #[serde(default = "default_next_turn_markers")]
    pub next_turn_markers: Vec<String>,
}

fn default_min_chars() -> usize {
    4
}

fn default_reject_markers() -> Vec<String> {
    vec!["error".to_string()]
}

fn default_role_markers() -> Vec<String> {
    ["Human:", "AI:", "Bot:", "Assistant:", "User:"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_next_turn_markers() -> Vec<String> {
    vec!["Human:".to_string(), "User:".to_string()]
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            min_chars: default_min_chars(),
            reject_markers: default_reject_markers(),
            role_markers: default_role_markers(),
            next_turn_markers: default_next_turn_markers(),
        }
    }
}

/// User override configuration (restricted fields)
#[derive(Deserialize)]
pub struct UserOverrideConfig {
    pub api_key: Option<String>,
    pub default_model: Option<String>,
    pub strict_mode: Option<bool>,
    pub providers: Option<Vec<UserProviderConfig>>,
}

/// User provider configuration (matching user schema)
#[derive(Deserialize)]
pub struct UserProviderConfig {
    #[serde(rename = "provider_id", alias = "provider_name", alias = "model_name")]
    pub provider_id: String,
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub stop: Vec<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub max_new_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub do_sample: Option<bool>,
    #[serde(default)]
    pub repetition_penalty: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
}

impl UserProviderConfig {
    /// Converts to a chain entry; `None` when the shape name is not recognised.
    pub fn into_spec(self) -> Option<ProviderSpec> {
        let kind = match self.shape.as_deref() {
            None => ShapeKind::Completion,
            Some(name) => ShapeKind::from_name(name)?,
        };
        let defaults = GenerationParams::default();
        Some(ProviderSpec {
            name: self.provider_id,
            url: self.base_url,
            shape: RequestShape::from_kind(kind, self.template, self.stop),
            params: GenerationParams {
                max_new_tokens: self.max_new_tokens.unwrap_or(defaults.max_new_tokens),
                temperature: self.temperature.unwrap_or(defaults.temperature),
                do_sample: self.do_sample.unwrap_or(defaults.do_sample),
                repetition_penalty: self.repetition_penalty,
                top_p: self.top_p,
            },
        })
    }
}

/// Global application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bearer credential for the inference API; empty means demo mode
    #[serde(default)]
    pub api_key: String,

    /// Provider tried first (moved to the front of `providers`)
    #[serde(default)]
    pub default_model: Option<String>,

    /// Surface "no remote answer" as an error instead of answering locally
    #[serde(default)]
    pub strict_mode: bool,

    pub inference: InferenceConfig,

    pub session: SessionConfig,

    #[serde(default)]
    pub sanitizer: SanitizerConfig,

    /// Provider chain, tried in order
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,
}

impl AppConfig {
    /// Load configuration with layered strategy:
    /// 1. Defaults (Embedded Config.toml)
    /// 2. User Config (~/.relaychat/relaychat.json)
    /// 3. Project Config (./.relaychat/relaychat.json)
    /// 4. Environment (API key, RELAYCHAT_MODEL)
    pub fn load() -> Result<Self> {
        let mut config = Self::embedded()?;

        if let Some(home) = dirs::home_dir() {
            let user_path = home.join(".relaychat").join("relaychat.json");
            Self::apply_patch(&mut config, user_path);
        }

        let project_path = Path::new(".relaychat").join("relaychat.json");
        Self::apply_patch(&mut config, project_path);

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;

        if config.credential().is_none() {
            log::info!("No inference API key configured, answers will come from the local fallback");
        }
        Ok(config)
    }

    pub fn embedded() -> Result<Self> {
        let default_str = include_str!("../Config.toml");
        toml::from_str(default_str).context("Failed to parse embedded Config.toml")
    }

    pub(crate) fn apply_patch<P: AsRef<Path>>(config: &mut AppConfig, path: P) {
        let path = path.as_ref();
        if !path.exists() {
            return;
        }
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to read config patch at {}: {}", path.display(), e);
                return;
            }
        };

        let patch = match serde_json::from_str::<UserOverrideConfig>(&content) {
            Ok(patch) => patch,
            Err(e) => {
                log::warn!("Failed to parse config patch at {}: {}", path.display(), e);
                return;
            }
        };

        if let Some(api_key) = patch.api_key {
            config.api_key = api_key;
        }
        if let Some(default_model) = patch.default_model {
            config.default_model = Some(default_model);
        }
        if let Some(strict_mode) = patch.strict_mode {
            config.strict_mode = strict_mode;
        }
        if let Some(providers) = patch.providers {
            // Same name twice: last definition wins, first position is kept.
            let mut ordered_keys: Vec<String> = Vec::new();
            let mut by_key: HashMap<String, ProviderSpec> = HashMap::new();

            for p in providers {
                let name = p.provider_id.clone();
                if name.trim().is_empty() {
                    continue;
                }
                let Some(spec) = p.into_spec() else {
                    log::warn!("Skipping provider {} with unknown shape in {}", name, path.display());
                    continue;
                };
                if !by_key.contains_key(&name) {
                    ordered_keys.push(name.clone());
                }
                by_key.insert(name, spec);
            }

            config.providers = ordered_keys
                .into_iter()
                .filter_map(|k| by_key.remove(&k))
                .collect();
        }
    }

    pub(crate) fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in &self.inference.credential_env {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                self.api_key = value;
                break;
            }
        }
        if let Some(model) = lookup("RELAYCHAT_MODEL").filter(|v| !v.trim().is_empty()) {
            self.default_model = Some(model);
        }
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.inference.base_url)
            .with_context(|| format!("invalid inference.base_url: {}", self.inference.base_url))?;
        for p in &self.providers {
            if p.name.trim().is_empty() {
                anyhow::bail!("provider with empty name");
            }
            if let Some(u) = &p.url {
                url::Url::parse(u)
                    .with_context(|| format!("invalid url for provider {}: {}", p.name, u))?;
            }
        }
        Ok(())
    }

    /// The configured API key, unless it is missing or a template placeholder.
    pub fn credential(&self) -> Option<String> {
        resolve_credential(&self.api_key, &self.inference.placeholder_keys)
    }

    /// Provider chain with the default model moved to the front.
    pub fn ordered_providers(&self) -> Vec<ProviderSpec> {
        resolve_provider_order(&self.providers, self.default_model.as_deref())
    }

    pub fn to_public(&self) -> PublicAppConfig {
        PublicAppConfig {
            api_key_configured: self.credential().is_some(),
            default_model: self.default_model.clone(),
            strict_mode: self.strict_mode,
            base_url: self.inference.base_url.clone(),
            timeout_secs: self.inference.timeout_secs,
            session: self.session.clone(),
            providers: self.ordered_providers(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicAppConfig {
    pub api_key_configured: bool,
    pub default_model: Option<String>,
    pub strict_mode: bool,
    pub base_url: String,
    pub timeout_secs: u64,
    pub session: SessionConfig,
    pub providers: Vec<ProviderSpec>,
}

pub(crate) fn resolve_credential(raw: &str, placeholders: &[String]) -> Option<String> {
    let key = raw.trim();
    if key.is_empty() {
        return None;
    }
    if placeholders.iter().any(|p| p == key) {
        return None;
    }
    Some(key.to_string())
}

pub(crate) fn resolve_provider_order(
    providers: &[ProviderSpec],
    default_model: Option<&str>,
) -> Vec<ProviderSpec> {
    let Some(name) = default_model.map(str::trim).filter(|n| !n.is_empty()) else {
        return providers.to_vec();
    };

    let mut ordered = Vec::with_capacity(providers.len() + 1);
    match providers.iter().position(|p| p.name == name) {
        Some(idx) => {
            ordered.push(providers[idx].clone());
            ordered.extend(
                providers
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != idx)
                    .map(|(_, p)| p.clone()),
            );
        }
        None => {
            ordered.push(ProviderSpec::new(name, RequestShape::Completion));
            ordered.extend(providers.iter().cloned());
        }
    }
    ordered
}
