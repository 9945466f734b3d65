use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TranslatorError>;

/// Which pipeline stage rejected a model reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Detection,
    Translation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Detection => "detection",
            Stage::Translation => "translation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure kinds surfaced to the caller of a turn.
///
/// Gateway and validator errors travel through the orchestrator untouched,
/// so a front end can match on the variant and render a specific message.
#[derive(Debug, Error)]
pub enum TranslatorError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider error{}: {message}", status_suffix(.status))]
    Provider {
        status: Option<u16>,
        message: String,
        rate_limited: bool,
        retry_after: Option<Duration>,
    },

    #[error("invalid {stage} response: {reason}")]
    SchemaValidation { stage: Stage, reason: String },

    #[error("unsupported language '{0}'")]
    UnsupportedLanguage(String),

    #[error("input text is empty")]
    EmptyInput,

    #[error("system instruction is empty")]
    EmptyInstruction,

    #[error("failed to render {0} prompt: {1}")]
    Prompt(Stage, String),
}

impl TranslatorError {
    pub(crate) fn schema(stage: Stage, reason: impl Into<String>) -> Self {
        TranslatorError::SchemaValidation {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn envelope(status: u16, message: impl Into<String>) -> Self {
        TranslatorError::Provider {
            status: Some(status),
            message: message.into(),
            rate_limited: false,
            retry_after: None,
        }
    }

    /// Short stable name for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TranslatorError::Auth(_) => "auth",
            TranslatorError::Network(_) => "network",
            TranslatorError::Provider { .. } => "provider",
            TranslatorError::SchemaValidation { .. } => "schema",
            TranslatorError::UnsupportedLanguage(_) => "unsupported_language",
            TranslatorError::EmptyInput => "empty_input",
            TranslatorError::EmptyInstruction => "empty_instruction",
            TranslatorError::Prompt(..) => "prompt",
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({})", code),
        None => String::new(),
    }
}
