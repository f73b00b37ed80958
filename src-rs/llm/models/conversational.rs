use serde_json::{json, Value};

use crate::config::GenerationParams;
use crate::llm::models::provider_base::{
    extract_generated_text, generation_parameters, inference_body, PromptInput, ShapeAdapter,
    ShapedPrompt,
};
use crate::session::Role;

/// Dialogue models that take prior turns as parallel arrays.
#[derive(Debug, Clone, Default)]
pub struct ConversationalAdapter;

impl ShapeAdapter for ConversationalAdapter {
    fn shape(&self, params: &GenerationParams, input: &PromptInput) -> ShapedPrompt {
        let mut past_user_inputs = Vec::new();
        let mut generated_responses = Vec::new();
        for turn in &input.context {
            match turn.role {
                Role::User => past_user_inputs.push(turn.content.clone()),
                Role::Assistant => generated_responses.push(turn.content.clone()),
            }
        }

        let inputs = json!({
            "past_user_inputs": past_user_inputs,
            "generated_responses": generated_responses,
            "text": input.message,
        });

        ShapedPrompt {
            payload: inference_body(inputs, generation_parameters(params)),
            prompt: input.message.clone(),
        }
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        extract_generated_text(response).or_else(|| last_generated_response(response))
    }
}

pub(crate) fn last_generated_response(response: &Value) -> Option<String> {
    response
        .pointer("/conversation/generated_responses")
        .and_then(|v| v.as_array())
        .and_then(|responses| responses.last())
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.to_string())
}
