//! Seam between the gateways and the external text-generation model.

use serde_json::Value;

use crate::error::Result;
use crate::limits::ImagePayload;

/// How the model should spend effort on a request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReasoningMode {
    /// Fixed low sampling temperature for consistent output.
    Temperature(f32),
    /// Large internal reasoning budget; no fixed temperature.
    Thinking { budget: u32 },
}

/// One structured-output call to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instruction: String,
    pub text: String,
    pub image: Option<ImagePayload>,
    /// Shape the response JSON must follow.
    pub response_schema: Value,
    pub reasoning: Option<ReasoningMode>,
}

/// A model that turns a [`GenerationRequest`] into raw response text.
///
/// Implementations only move bytes; parsing and validating the text is the
/// gateway's job.
#[async_trait::async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}
