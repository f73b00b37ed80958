use serde_json::{json, Value};

use crate::config::GenerationParams;
use crate::llm::models::provider_base::{
    extract_generated_text, generation_parameters, inference_body, PromptInput, ShapeAdapter,
    ShapedPrompt,
};
use crate::session::render_transcript;

/// Plain text-generation models. With history, the prompt becomes a
/// `Human:` / `Bot:` transcript ending on an open `Bot:` line.
#[derive(Debug, Clone, Default)]
pub struct CompletionAdapter;

pub(crate) fn completion_prompt(input: &PromptInput) -> String {
    if input.context.is_empty() {
        return input.message.clone();
    }
    format!(
        "{}\nHuman: {}\nBot:",
        render_transcript(&input.context),
        input.message
    )
}

impl ShapeAdapter for CompletionAdapter {
    fn shape(&self, params: &GenerationParams, input: &PromptInput) -> ShapedPrompt {
        let prompt = completion_prompt(input);
        let mut parameters = generation_parameters(params);
        parameters.insert("return_full_text".to_string(), json!(false));

        ShapedPrompt {
            payload: inference_body(json!(prompt), parameters),
            prompt,
        }
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        extract_generated_text(response)
    }
}
