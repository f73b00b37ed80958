//! Post-processing of generated text.
//!
//! Each [`SanitizeRule`] is a standalone string transform; a [`Sanitizer`]
//! runs them in order and then decides whether the result is worth showing.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::SanitizerConfig;
use crate::errors::AttemptError;

lazy_static! {
    static ref NEWLINE_RUN: Regex = Regex::new(r"\s*\n\s*").expect("valid newline regex");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SanitizeRule {
    /// Drop the prompt if the provider echoed it at the start.
    StripPromptEcho,
    /// Drop one leading speaker tag such as `AI:`.
    StripRoleMarker,
    /// Drop leading colons, dashes and whitespace.
    StripLeadingArtifacts,
    /// Cut where the model starts writing the user's next line.
    TruncateAtNextTurn,
    /// Replace newline runs with a single space and trim.
    CollapseNewlines,
}

pub const DEFAULT_PIPELINE: [SanitizeRule; 5] = [
    SanitizeRule::StripPromptEcho,
    SanitizeRule::StripRoleMarker,
    SanitizeRule::StripLeadingArtifacts,
    SanitizeRule::TruncateAtNextTurn,
    SanitizeRule::CollapseNewlines,
];

#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Vec<SanitizeRule>,
    min_chars: usize,
    reject_markers: Vec<String>,
    role_markers: Vec<String>,
    next_turn: Option<Regex>,
}

impl Sanitizer {
    pub fn new(config: &SanitizerConfig) -> Self {
        let next_turn = if config.next_turn_markers.is_empty() {
            None
        } else {
            let alternatives = config
                .next_turn_markers
                .iter()
                .map(|m| regex::escape(m))
                .collect::<Vec<_>>()
                .join("|");
            Regex::new(&format!(r"\n\s*(?:{alternatives})")).ok()
        };

        Self {
            rules: DEFAULT_PIPELINE.to_vec(),
            min_chars: config.min_chars,
            reject_markers: config
                .reject_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            role_markers: config.role_markers.clone(),
            next_turn,
        }
    }

    pub fn with_rules(mut self, rules: Vec<SanitizeRule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &[SanitizeRule] {
        &self.rules
    }

    pub fn apply_rule(&self, rule: SanitizeRule, text: &str, prompt: &str) -> String {
        match rule {
            SanitizeRule::StripPromptEcho => strip_prompt_echo(text, prompt),
            SanitizeRule::StripRoleMarker => {
                let trimmed = text.trim_start();
                self.role_markers
                    .iter()
                    .find_map(|m| trimmed.strip_prefix(m.as_str()))
                    .unwrap_or(trimmed)
                    .to_string()
            }
            SanitizeRule::StripLeadingArtifacts => text
                .trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
                .to_string(),
            SanitizeRule::TruncateAtNextTurn => match self.next_turn.as_ref().and_then(|re| re.find(text)) {
                Some(m) => text[..m.start()].to_string(),
                None => text.to_string(),
            },
            SanitizeRule::CollapseNewlines => NEWLINE_RUN.replace_all(text, " ").trim().to_string(),
        }
    }

    /// Runs every rule in order. The result may still be unusable.
    pub fn clean(&self, raw: &str, prompt: &str) -> String {
        self.rules
            .iter()
            .fold(raw.to_string(), |text, rule| self.apply_rule(*rule, &text, prompt))
    }

    pub fn is_usable(&self, text: &str) -> bool {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.min_chars {
            return false;
        }
        let lower = trimmed.to_lowercase();
        !self.reject_markers.iter().any(|m| lower.contains(m.as_str()))
    }

    pub fn sanitize(&self, raw: &str, prompt: &str) -> Result<String, AttemptError> {
        let cleaned = self.clean(raw, prompt);
        if self.is_usable(&cleaned) {
            Ok(cleaned)
        } else {
            Err(AttemptError::UnusableText(cleaned))
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new(&SanitizerConfig::default())
    }
}

fn strip_prompt_echo(text: &str, prompt: &str) -> String {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return text.to_string();
    }
    text.trim_start()
        .strip_prefix(prompt)
        .map(|rest| rest.to_string())
        .unwrap_or_else(|| text.to_string())
}
