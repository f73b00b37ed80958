use serde_json::{json, Value};

use crate::config::GenerationParams;
use crate::llm::models::provider_base::{
    extract_generated_text, generation_parameters, inference_body, PromptInput, ShapeAdapter,
    ShapedPrompt,
};
use crate::session::render_transcript;

/// Base models steered with a fixed prefix such as `Human: {message}\nAI:`.
#[derive(Debug, Clone)]
pub struct InstructionAdapter {
    pub template: String,
    pub stop: Vec<String>,
}

impl InstructionAdapter {
    pub fn new(template: String, stop: Vec<String>) -> Self {
        Self { template, stop }
    }
}

/// Fills `{message}` and `{context}` in one pass, so placeholder-looking text
/// inside either value is left alone.
pub(crate) fn render_template(template: &str, message: &str, context: &str) -> String {
    let mut out = String::with_capacity(template.len() + message.len() + context.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{message}") {
            out.push_str(message);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{context}") {
            out.push_str(context);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

impl ShapeAdapter for InstructionAdapter {
    fn shape(&self, params: &GenerationParams, input: &PromptInput) -> ShapedPrompt {
        let context = render_transcript(&input.context);
        let prompt = render_template(&self.template, &input.message, &context);

        let mut parameters = generation_parameters(params);
        parameters.insert("return_full_text".to_string(), json!(false));
        if !self.stop.is_empty() {
            parameters.insert("stop".to_string(), json!(self.stop));
        }

        ShapedPrompt {
            payload: inference_body(json!(prompt), parameters),
            prompt,
        }
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        extract_generated_text(response)
    }
}
