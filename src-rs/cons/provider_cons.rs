use serde::{Deserialize, Serialize};

/// Label attached to answers produced without a credential.
pub const DEMO_MODE_LABEL: &str = "demo-mode";

/// Label attached to answers produced after every provider failed.
pub const SMART_FALLBACK_LABEL: &str = "smart-fallback";

pub const DEFAULT_INSTRUCTION_TEMPLATE: &str = "Human: {message}\nAI:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Conversational,
    Completion,
    Instruction,
}

impl ShapeKind {
    /// Returns the identifier used in configuration (e.g., "conversational")
    pub fn shape_name(&self) -> &'static str {
        match self {
            ShapeKind::Conversational => "conversational",
            ShapeKind::Completion => "completion",
            ShapeKind::Instruction => "instruction",
        }
    }

    /// Helper to parse from a string (handles aliases)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "conversational" | "conversation" | "chat" => Some(ShapeKind::Conversational),
            "completion" | "text" | "plain" | "text-generation" => Some(ShapeKind::Completion),
            "instruction" | "instruct" | "template" => Some(ShapeKind::Instruction),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.shape_name())
    }
}
