use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use parley_core::types::{GenerationRequest, GenerationResult};

use crate::session::ConversationSession;

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single message in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Request/response bridge to a remote generative-text service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Generate a reply to `req`, with `session` as prior context.
    async fn generate(
        &self,
        session: &ConversationSession,
        req: &GenerationRequest,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Prompt blocked: {0}")]
    Blocked(String),

    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of one remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Ok(GenerationResult),
    /// The call succeeded but produced no visible text.
    Empty,
    Failure(String),
}

impl From<Result<String, ProviderError>> for Generation {
    fn from(result: Result<String, ProviderError>) -> Self {
        match result {
            Ok(text) if text.trim().is_empty() => Generation::Empty,
            Ok(text) => Generation::Ok(GenerationResult::new(text)),
            Err(e) => Generation::Failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_empty_generation() {
        assert_eq!(Generation::from(Ok(" \n".to_string())), Generation::Empty);
    }

    #[test]
    fn errors_become_failures() {
        let generation = Generation::from(Err(ProviderError::Api {
            status: 500,
            message: "boom".into(),
        }));
        assert_eq!(
            generation,
            Generation::Failure("API error (500): boom".to_string())
        );
    }

    #[test]
    fn text_is_kept_verbatim() {
        match Generation::from(Ok("  answer ".to_string())) {
            Generation::Ok(result) => assert_eq!(result.text(), "  answer "),
            other => panic!("unexpected {other:?}"),
        }
    }
}
