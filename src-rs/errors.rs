use thiserror::Error;

/// Why a single provider attempt did not produce an answer. These never leave
/// the chain runner; they only decide that the next provider is tried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptError {
    #[error("transport failure: {detail}")]
    TransportFailure { status: Option<u16>, detail: String },
    #[error("response payload has no extractable text")]
    UnextractableResponse,
    #[error("generated text is unusable: {0:?}")]
    UnusableText(String),
}

impl AttemptError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::TransportFailure {
            status: None,
            detail: detail.into(),
        }
    }

    pub fn http_status(status: u16, body: &str) -> Self {
        Self::TransportFailure {
            status: Some(status),
            detail: format!("HTTP {status}: {}", body.trim()),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::TransportFailure { .. } => "GEN-2001",
            Self::UnextractableResponse => "GEN-2002",
            Self::UnusableText(_) => "GEN-2003",
        }
    }
}

/// Errors a caller of the chat agent can observe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("session not found: {0}")]
    UnknownSession(String),
    #[error("no inference credential is configured")]
    NoCredential,
    #[error("all {attempted} providers failed to produce an answer")]
    Exhausted { attempted: usize },
}

impl ChatError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownSession(_) => "SES-1001",
            Self::NoCredential => "GEN-1001",
            Self::Exhausted { .. } => "GEN-1002",
        }
    }

    pub fn explain(&self) -> &'static str {
        match self {
            Self::UnknownSession(_) => "The session id was never created, has ended, or expired.",
            Self::NoCredential => "No API key is configured, so no remote provider was called.",
            Self::Exhausted { .. } => "Every configured provider failed or returned unusable text.",
        }
    }
}
