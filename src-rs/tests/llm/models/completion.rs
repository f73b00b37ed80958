use crate::config::GenerationParams;
use crate::llm::models::completion::*;
use crate::llm::models::provider_base::{PromptInput, ShapeAdapter};
use crate::session::Turn;
use serde_json::json;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_message_without_history() {
        let shaped = CompletionAdapter.shape(&GenerationParams::default(), &PromptInput::new("Tell me a joke"));
        assert_eq!(shaped.payload["inputs"], json!("Tell me a joke"));
        assert_eq!(shaped.payload["parameters"]["return_full_text"], json!(false));
        assert_eq!(shaped.payload["options"]["use_cache"], json!(false));
        assert_eq!(shaped.prompt, "Tell me a joke");
    }

    #[test]
    fn history_becomes_a_transcript_with_open_bot_line() {
        let input = PromptInput::new("and you?").with_context(vec![Turn::user("hi"), Turn::assistant("hello")]);
        assert_eq!(completion_prompt(&input), "Human: hi\nBot: hello\nHuman: and you?\nBot:");
    }

    #[test]
    fn optional_params_only_when_set() {
        let params = GenerationParams {
            repetition_penalty: Some(1.1),
            ..GenerationParams::default()
        };
        let shaped = CompletionAdapter.shape(&params, &PromptInput::new("x"));
        assert_eq!(shaped.payload["parameters"]["repetition_penalty"], json!(1.1));
        assert!(shaped.payload["parameters"].get("top_p").is_none());
    }

    #[test]
    fn recognised_response_shapes() {
        let a = CompletionAdapter;
        assert_eq!(a.extract_text(&json!([{ "generated_text": "one" }])).as_deref(), Some("one"));
        assert_eq!(a.extract_text(&json!([{ "text": "two" }])).as_deref(), Some("two"));
        assert_eq!(a.extract_text(&json!({ "text": "three" })).as_deref(), Some("three"));
        assert_eq!(a.extract_text(&json!(["four"])).as_deref(), Some("four"));
        assert_eq!(a.extract_text(&json!("five")).as_deref(), Some("five"));
        assert_eq!(a.extract_text(&json!([])), None);
        assert_eq!(a.extract_text(&json!({})), None);
        assert_eq!(a.extract_text(&json!("  ")), None);
        assert_eq!(a.extract_text(&json!({ "error": "Model is loading" })), None);
    }
}
