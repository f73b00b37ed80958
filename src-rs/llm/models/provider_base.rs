use serde_json::{json, Map, Value};

use crate::config::GenerationParams;
use crate::session::Turn;

/// What the caller wants answered: the new message plus recent history.
#[derive(Debug, Clone, Default)]
pub struct PromptInput {
    pub message: String,
    pub context: Vec<Turn>,
}

impl PromptInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Vec<Turn>) -> Self {
        self.context = context;
        self
    }
}

/// Provider-shaped payload plus the exact prompt text it carries, which the
/// sanitizer strips if the provider echoes it back.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedPrompt {
    pub payload: Value,
    pub prompt: String,
}

/// A single attempt against one provider. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub provider: String,
    pub url: String,
    pub payload: Value,
    pub prompt: String,
}

pub trait ShapeAdapter: Send + Sync {
    fn shape(&self, params: &GenerationParams, input: &PromptInput) -> ShapedPrompt;

    /// Best candidate text in a loosely typed response, `None` when nothing matches.
    fn extract_text(&self, response: &Value) -> Option<String>;
}

/// Handles `{"generated_text": ..}`, `[{"generated_text": ..}]`, the `text`
/// variants of both, and a bare string.
pub fn extract_generated_text(response: &Value) -> Option<String> {
    let text = match response {
        Value::String(s) => Some(s.as_str()),
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::String(s) => Some(s.as_str()),
            other => text_field(other),
        }),
        Value::Object(_) => text_field(response),
        _ => None,
    }?;

    if text.trim().is_empty() {
        return None;
    }
    Some(text.to_string())
}

fn text_field(value: &Value) -> Option<&str> {
    value
        .get("generated_text")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("text").and_then(|v| v.as_str()))
}

pub(crate) fn generation_parameters(params: &GenerationParams) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("max_new_tokens".to_string(), json!(params.max_new_tokens));
    out.insert("temperature".to_string(), json!(params.temperature));
    out.insert("do_sample".to_string(), json!(params.do_sample));
    if let Some(penalty) = params.repetition_penalty {
        out.insert("repetition_penalty".to_string(), json!(penalty));
    }
    if let Some(top_p) = params.top_p {
        out.insert("top_p".to_string(), json!(top_p));
    }
    out
}

pub(crate) fn inference_body(inputs: Value, parameters: Map<String, Value>) -> Value {
    json!({
        "inputs": inputs,
        "parameters": Value::Object(parameters),
        "options": {
            "wait_for_model": true,
            "use_cache": false,
        },
    })
}
