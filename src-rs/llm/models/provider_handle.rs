use serde_json::Value;

use crate::config::{GenerationParams, ProviderSpec, RequestShape};

use super::completion::CompletionAdapter;
use super::conversational::ConversationalAdapter;
use super::instruction::InstructionAdapter;
pub use super::provider_base::{GenerationRequest, PromptInput, ShapeAdapter, ShapedPrompt};

#[derive(Debug, Clone)]
pub enum AnyShapeAdapter {
    Conversational(ConversationalAdapter),
    Completion(CompletionAdapter),
    Instruction(InstructionAdapter),
}

impl ShapeAdapter for AnyShapeAdapter {
    fn shape(&self, params: &GenerationParams, input: &PromptInput) -> ShapedPrompt {
        match self {
            AnyShapeAdapter::Conversational(a) => a.shape(params, input),
            AnyShapeAdapter::Completion(a) => a.shape(params, input),
            AnyShapeAdapter::Instruction(a) => a.shape(params, input),
        }
    }

    fn extract_text(&self, response: &Value) -> Option<String> {
        match self {
            AnyShapeAdapter::Conversational(a) => a.extract_text(response),
            AnyShapeAdapter::Completion(a) => a.extract_text(response),
            AnyShapeAdapter::Instruction(a) => a.extract_text(response),
        }
    }
}

pub fn adapter_for(shape: &RequestShape) -> AnyShapeAdapter {
    match shape {
        RequestShape::Conversational => AnyShapeAdapter::Conversational(ConversationalAdapter),
        RequestShape::Completion => AnyShapeAdapter::Completion(CompletionAdapter),
        RequestShape::Instruction { template, stop } => {
            AnyShapeAdapter::Instruction(InstructionAdapter::new(template.clone(), stop.clone()))
        }
    }
}

/// Shapes one attempt. The same adapter is later used to read the response.
pub fn build_request(
    adapter: &AnyShapeAdapter,
    spec: &ProviderSpec,
    base_url: &str,
    input: &PromptInput,
) -> GenerationRequest {
    let shaped = adapter.shape(&spec.params, input);
    GenerationRequest {
        provider: spec.name.clone(),
        url: spec.endpoint(base_url),
        payload: shaped.payload,
        prompt: shaped.prompt,
    }
}
