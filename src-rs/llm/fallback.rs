//! Canned replies used when no provider produced an answer.

use std::fmt;
use std::sync::Mutex;

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use regex::Regex;
use serde::Serialize;

use crate::cons::provider_cons::{DEMO_MODE_LABEL, SMART_FALLBACK_LABEL};
use crate::llm::chain::NoAnswerReason;

lazy_static! {
    static ref GREETING: Regex =
        Regex::new(r"^(?:hi|hello|hey|good morning|good afternoon|good evening)").expect("valid greeting regex");
    static ref GRATITUDE: Regex = Regex::new(r"^(?:thank|thx\b)|\bthanks\b").expect("valid gratitude regex");
}

const GREETING_REPLIES: &[&str] = &[
    "Hello! I'm here to help you with any questions you might have.",
    "Hi there! What would you like to know today?",
    "Hey! I'm ready to assist you. What's on your mind?",
    "Hello! Feel free to ask me anything you'd like to know.",
];

const WELLBEING_REPLIES: &[&str] = &[
    "I'm doing well, thank you for asking! I'm here and ready to help you with any questions or topics you'd like to discuss.",
];

const CAPABILITY_REPLIES: &[&str] = &[
    "I can help you with a wide variety of topics including general knowledge questions, explanations of concepts, math problems, and much more. What would you like to know about?",
];

const GRATITUDE_REPLIES: &[&str] = &[
    "You're welcome! Is there anything else I can help you with?",
    "Happy to help! Let me know if something else comes up.",
];

const WHAT_REPLIES: &[&str] = &[
    "That's an interesting question about 'what'. While I'm currently having some connectivity issues with my main AI models, I'd be happy to try to help if you could be more specific about what you'd like to know.",
];

const HOW_REPLIES: &[&str] = &[
    "You're asking about 'how' something works or is done. I'd love to help explain the process, but I'm currently running on backup responses. Could you try rephrasing your question or being more specific?",
];

const WHY_REPLIES: &[&str] = &[
    "That's a thoughtful 'why' question. While my main AI models are currently unavailable, I can try to provide some insight if you could give me a bit more context about what you're curious about.",
];

const WHO_REPLIES: &[&str] = &[
    "You're asking about 'who' - that could be about a person, organization, or character. I'm currently using backup responses, but I might be able to help if you could be more specific about who you're asking about.",
];

const CONVERSATIONAL_REPLIES: &[&str] = &[
    "That's an interesting point. Could you tell me more about what you're thinking?",
    "I understand what you're saying. What would you like to explore further about that topic?",
    "That's a good question. While I'm currently running on backup responses, I'm still here to chat. What else would you like to discuss?",
    "I hear you. Even though my main AI models aren't responding right now, I'm still here to have a conversation. What's on your mind?",
    "Interesting! I'm currently using fallback responses, but I'd love to continue our conversation. What would you like to talk about next?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionWord {
    What,
    How,
    Why,
    Who,
}

impl QuestionWord {
    const ALL: [QuestionWord; 4] = [Self::What, Self::How, Self::Why, Self::Who];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::What => "what",
            Self::How => "how",
            Self::Why => "why",
            Self::Who => "who",
        }
    }

    fn leading(message: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| message.starts_with(w.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "word")]
pub enum FallbackCategory {
    Greeting,
    Wellbeing,
    Capabilities,
    Gratitude,
    Question(QuestionWord),
    Conversational,
}

impl fmt::Display for FallbackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Greeting => write!(f, "greeting"),
            Self::Wellbeing => write!(f, "wellbeing"),
            Self::Capabilities => write!(f, "capabilities"),
            Self::Gratitude => write!(f, "gratitude"),
            Self::Question(word) => write!(f, "question:{}", word.as_str()),
            Self::Conversational => write!(f, "conversational"),
        }
    }
}

/// One classification step. `matches` sees the lowercased, trimmed message.
#[derive(Clone, Copy)]
pub struct FallbackRule {
    pub name: &'static str,
    pub matches: fn(&str) -> Option<FallbackCategory>,
}

impl fmt::Debug for FallbackRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackRule").field("name", &self.name).finish()
    }
}

fn match_greeting(m: &str) -> Option<FallbackCategory> {
    GREETING.is_match(m).then_some(FallbackCategory::Greeting)
}

fn match_wellbeing(m: &str) -> Option<FallbackCategory> {
    m.contains("how are you").then_some(FallbackCategory::Wellbeing)
}

fn match_capabilities(m: &str) -> Option<FallbackCategory> {
    (m.contains("what") && (m.contains("can you") || m.contains("do you")))
        .then_some(FallbackCategory::Capabilities)
}

fn match_gratitude(m: &str) -> Option<FallbackCategory> {
    GRATITUDE.is_match(m).then_some(FallbackCategory::Gratitude)
}

fn match_question(m: &str) -> Option<FallbackCategory> {
    QuestionWord::leading(m).map(FallbackCategory::Question)
}

pub const DEFAULT_RULES: [FallbackRule; 5] = [
    FallbackRule { name: "greeting", matches: match_greeting },
    FallbackRule { name: "wellbeing", matches: match_wellbeing },
    FallbackRule { name: "capabilities", matches: match_capabilities },
    FallbackRule { name: "gratitude", matches: match_gratitude },
    FallbackRule { name: "question", matches: match_question },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackReply {
    pub text: String,
    pub category: FallbackCategory,
    pub label: &'static str,
}

pub fn label_for(reason: NoAnswerReason) -> &'static str {
    match reason {
        NoAnswerReason::NoCredential => DEMO_MODE_LABEL,
        NoAnswerReason::Exhausted => SMART_FALLBACK_LABEL,
    }
}

/// Rule-based local responder. Pure apart from the random pick inside a pool.
pub struct FallbackResponder {
    rules: Vec<FallbackRule>,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FallbackResponder {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rules: DEFAULT_RULES.to_vec(),
            rng: Mutex::new(Box::new(rng)),
        }
    }

    pub fn with_rules(mut self, rules: Vec<FallbackRule>) -> Self {
        self.rules = rules;
        self
    }

    /// First matching rule wins; anything unmatched is conversational.
    pub fn classify(&self, message: &str) -> FallbackCategory {
        let normalized = message.trim().to_lowercase();
        self.rules
            .iter()
            .find_map(|rule| (rule.matches)(&normalized))
            .unwrap_or(FallbackCategory::Conversational)
    }

    pub fn pool(category: FallbackCategory) -> &'static [&'static str] {
        match category {
            FallbackCategory::Greeting => GREETING_REPLIES,
            FallbackCategory::Wellbeing => WELLBEING_REPLIES,
            FallbackCategory::Capabilities => CAPABILITY_REPLIES,
            FallbackCategory::Gratitude => GRATITUDE_REPLIES,
            FallbackCategory::Question(QuestionWord::What) => WHAT_REPLIES,
            FallbackCategory::Question(QuestionWord::How) => HOW_REPLIES,
            FallbackCategory::Question(QuestionWord::Why) => WHY_REPLIES,
            FallbackCategory::Question(QuestionWord::Who) => WHO_REPLIES,
            FallbackCategory::Conversational => CONVERSATIONAL_REPLIES,
        }
    }

    pub fn respond(&self, message: &str, reason: NoAnswerReason) -> FallbackReply {
        let category = self.classify(message);
        let pool = Self::pool(category);
        let text = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            pool.choose(&mut **rng).copied().unwrap_or(CONVERSATIONAL_REPLIES[0])
        };
        log::debug!("fallback reply from {} pool ({})", category, label_for(reason));
        FallbackReply {
            text: text.to_string(),
            category,
            label: label_for(reason),
        }
    }
}

impl Default for FallbackResponder {
    fn default() -> Self {
        Self::new()
    }
}
