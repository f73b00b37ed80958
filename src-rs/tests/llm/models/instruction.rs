use crate::config::GenerationParams;
use crate::llm::models::instruction::*;
use crate::llm::models::provider_base::{PromptInput, ShapeAdapter};
use crate::session::Turn;
use serde_json::json;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_template_and_forwards_stop_sequences() {
        let adapter = InstructionAdapter::new(
            "Human: {message}\nAI:".to_string(),
            vec!["\n".to_string(), "Question:".to_string()],
        );
        let shaped = adapter.shape(&GenerationParams::default(), &PromptInput::new("What is Rust?"));

        assert_eq!(shaped.prompt, "Human: What is Rust?\nAI:");
        assert_eq!(shaped.payload["inputs"], json!("Human: What is Rust?\nAI:"));
        assert_eq!(shaped.payload["parameters"]["stop"], json!(["\n", "Question:"]));
        assert_eq!(shaped.payload["parameters"]["return_full_text"], json!(false));
    }

    #[test]
    fn no_stop_key_when_empty() {
        let adapter = InstructionAdapter::new("{message}".to_string(), vec![]);
        let shaped = adapter.shape(&GenerationParams::default(), &PromptInput::new("x"));
        assert!(shaped.payload["parameters"].get("stop").is_none());
    }

    #[test]
    fn context_slot_gets_the_transcript() {
        let adapter = InstructionAdapter::new("Context: {context}\nUser: {message}\nAI:".to_string(), vec![]);
        let input = PromptInput::new("and?").with_context(vec![Turn::user("hi"), Turn::assistant("hey")]);
        let shaped = adapter.shape(&GenerationParams::default(), &input);
        assert_eq!(shaped.prompt, "Context: Human: hi\nBot: hey\nUser: and?\nAI:");
    }

    #[test]
    fn placeholders_inside_values_are_not_expanded() {
        assert_eq!(render_template("[{message}]", "{context}", "ctx"), "[{context}]");
        assert_eq!(render_template("{other} {message}", "m", ""), "{other} m");
    }
}
