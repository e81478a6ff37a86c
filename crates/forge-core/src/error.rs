//! Error types for Card Forge.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

/// Which user-supplied input exceeded its configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Notes,
    Prompt,
    Image,
    Instruction,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            InputKind::Notes => "notes",
            InputKind::Prompt => "prompt",
            InputKind::Image => "image",
            InputKind::Instruction => "amendment instruction",
        };
        f.write_str(label)
    }
}

/// A shared error type for the whole workspace.
///
/// Each failure mode of the gateways has its own variant so callers (and the
/// review workflow) can react to it without string matching.
#[derive(Error, Debug, Clone)]
pub enum ForgeError {
    /// Oversize input rejected before any network call.
    #[error("The {input} is too large ({actual}, limit {limit})")]
    InputTooLarge {
        input: InputKind,
        limit: usize,
        actual: usize,
    },

    /// Required input was missing or blank.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Missing or rejected API credential.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Too many calls within a short window (client guard or server 429).
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Transport-level failure reaching a remote service.
    #[error("Network error: {0}")]
    Network(String),

    /// The call did not complete within the configured timeout.
    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The AI returned text that is not valid JSON.
    #[error("AI returned invalid JSON: {0}")]
    MalformedOutput(String),

    /// The AI returned JSON that breaks the flashcard contract.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The AI returned no text at all.
    #[error("AI returned an empty response")]
    EmptyResponse,

    /// Non-success HTTP status from the AI provider.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        is_retryable: bool,
    },

    /// AnkiConnect answered but reported a failure.
    #[error("AnkiConnect error: {0}")]
    AnkiConnect(String),

    /// Sync requested while no Anki connection is available.
    #[error("Anki is not connected")]
    NotConnected,

    /// A workflow operation was invoked in a step that does not allow it.
    #[error("Cannot {action} while in the {step} step")]
    InvalidTransition { step: String, action: &'static str },

    /// Review cursor target out of range.
    #[error("Card index {index} is out of range (0..{len})")]
    InvalidIndex { index: usize, len: usize },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForgeError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn input_too_large(input: InputKind, limit: usize, actual: usize) -> Self {
        Self::InputTooLarge {
            input,
            limit,
            actual,
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self::MissingInput(message.into())
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    pub fn malformed_output(message: impl Into<String>) -> Self {
        Self::MalformedOutput(message.into())
    }

    pub fn anki(message: impl Into<String>) -> Self {
        Self::AnkiConnect(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_input_too_large(&self) -> bool {
        matches!(self, Self::InputTooLarge { .. })
    }

    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether reissuing the same call later can reasonably succeed.
    ///
    /// Credential, malformed-output and validation failures are never retried
    /// automatically; they need the user to act.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::Api { is_retryable, .. } => *is_retryable,
            _ => false,
        }
    }

    /// The single dismissible message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::InputTooLarge {
                input: InputKind::Image,
                limit,
                ..
            } => format!(
                "Image is too large. Please use an image under {}.",
                format_byte_limit(*limit)
            ),
            Self::InputTooLarge { input, limit, .. } => format!(
                "The {input} is too long. Please keep it under {limit} characters."
            ),
            Self::MissingInput(message) => message.clone(),
            Self::Credential(_) => {
                "Missing or invalid API key. Add your Gemini key to secret.json or GEMINI_API_KEY."
                    .to_string()
            }
            Self::RateLimited { retry_after, .. } => match retry_after {
                Some(delay) => format!(
                    "Rate limited - please wait {}s and try again.",
                    delay.as_secs().max(1)
                ),
                None => "Rate limited - please wait a moment and try again.".to_string(),
            },
            Self::Network(message) => message.clone(),
            Self::Timeout(limit) => format!(
                "The request timed out after {}s. Check your connection and try again.",
                limit.as_secs()
            ),
            Self::MalformedOutput(_) => {
                "AI returned invalid JSON. Try generating again.".to_string()
            }
            Self::Validation(err) => {
                let mut message = err.message.clone();
                for detail in err.details() {
                    message.push_str("\n- ");
                    message.push_str(&detail);
                }
                message
            }
            Self::EmptyResponse => "AI returned an empty response.".to_string(),
            Self::NotConnected => {
                "Anki is not connected. Start Anki with AnkiConnect, check `[anki] url` in \
                 config.toml, then run `card-forge ping`."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Renders a byte ceiling in MB with at most one decimal, or in KB below 1 MB.
fn format_byte_limit(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes < MB {
        format!("{} KB", bytes.div_ceil(KB).max(1))
    } else if bytes % MB == 0 {
        format!("{} MB", bytes / MB)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ForgeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ForgeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ForgeError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ForgeError>`.
pub type Result<T> = std::result::Result<T, ForgeError>;
