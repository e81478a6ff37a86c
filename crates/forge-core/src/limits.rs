//! Local input ceilings checked before any network call.

use serde::{Deserialize, Serialize};

use crate::error::{ForgeError, InputKind, Result};

pub const DEFAULT_MAX_NOTES_CHARS: usize = 20_000;
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 30_000;
pub const DEFAULT_MAX_INSTRUCTION_CHARS: usize = 8_000;
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 1_000;

const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Input ceilings, configurable under `[limits]` in config.toml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub max_notes_chars: usize,
    pub max_prompt_chars: usize,
    pub max_instruction_chars: usize,
    pub max_image_bytes: usize,
    pub min_request_interval_ms: u64,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_notes_chars: DEFAULT_MAX_NOTES_CHARS,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            max_instruction_chars: DEFAULT_MAX_INSTRUCTION_CHARS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            min_request_interval_ms: DEFAULT_MIN_REQUEST_INTERVAL_MS,
        }
    }
}

impl InputLimits {
    pub fn check_notes(&self, notes: &str) -> Result<()> {
        check_chars(InputKind::Notes, notes, self.max_notes_chars)
    }

    pub fn check_prompt(&self, prompt: &str) -> Result<()> {
        check_chars(InputKind::Prompt, prompt, self.max_prompt_chars)
    }

    pub fn check_instruction(&self, instruction: &str) -> Result<()> {
        check_chars(InputKind::Instruction, instruction, self.max_instruction_chars)
    }

    pub fn check_image(&self, image: &ImagePayload) -> Result<()> {
        let bytes = image.decoded_len();
        if bytes > self.max_image_bytes {
            return Err(ForgeError::input_too_large(
                InputKind::Image,
                self.max_image_bytes,
                bytes,
            ));
        }
        Ok(())
    }
}

fn check_chars(input: InputKind, text: &str, limit: usize) -> Result<()> {
    let actual = text.chars().count();
    if actual > limit {
        return Err(ForgeError::input_too_large(input, limit, actual));
    }
    Ok(())
}

/// Decoded size of a base64 payload, computed from its encoded length.
///
/// Accepts either raw base64 or a `data:<mime>;base64,<data>` URL.
pub fn estimate_base64_bytes(encoded: &str) -> usize {
    let data = match encoded.split_once(',') {
        Some((_, data)) => data,
        None => encoded,
    };
    let data = data.trim_end();
    let padding = data.len() - data.trim_end_matches('=').len();
    (data.len() * 3 / 4).saturating_sub(padding)
}

/// An image attached to a generation request, already base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Parses a data URL, or treats the input as raw base64 JPEG data.
    pub fn from_data_url(value: &str) -> Self {
        if let Some(rest) = value.strip_prefix("data:")
            && let Some((header, data)) = rest.split_once(',')
        {
            let mime_type = header
                .strip_suffix(";base64")
                .filter(|mime| !mime.is_empty())
                .unwrap_or(DEFAULT_IMAGE_MIME);
            return Self::new(mime_type, data);
        }
        Self::new(DEFAULT_IMAGE_MIME, value)
    }

    pub fn decoded_len(&self) -> usize {
        estimate_base64_bytes(&self.data)
    }
}
