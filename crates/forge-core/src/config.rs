//! Configuration model.
//!
//! `ForgeConfig` mirrors `config.toml`; every section and field has a
//! default so a missing or partial file is valid. Secrets live separately in
//! `SecretConfig` (secret.json) and are never written to config.toml.

use serde::{Deserialize, Serialize};

use crate::limits::InputLimits;
use crate::validation::CardTypePolicy;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const CAPABLE_GEMINI_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_THINKING_BUDGET: u32 = 32_768;
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_ANKI_DECK: &str = "Default";

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ForgeConfig {
    pub gemini: GeminiSettings,
    pub anki: AnkiSettings,
    pub limits: InputLimits,
    pub validation: ValidationSettings,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeminiSettings {
    /// Model used for plain-text generation and amendment.
    pub default_model: String,
    /// Model forced when an image is attached or deep reasoning is requested.
    pub capable_model: String,
    pub temperature: f32,
    pub thinking_budget: u32,
    pub timeout_secs: u64,
    /// Override for the REST base URL (tests, proxies).
    pub base_url: Option<String>,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_GEMINI_MODEL.to_string(),
            capable_model: CAPABLE_GEMINI_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            thinking_budget: DEFAULT_THINKING_BUDGET,
            timeout_secs: 120,
            base_url: None,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnkiSettings {
    /// Custom AnkiConnect endpoint; the loopback defaults are tried when unset.
    pub url: Option<String>,
    pub deck: String,
    pub timeout_secs: u64,
}

impl Default for AnkiSettings {
    fn default() -> Self {
        Self {
            url: None,
            deck: DEFAULT_ANKI_DECK.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
    pub card_type_policy: CardTypePolicy,
}

/// Root structure of secret.json
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SecretConfig {
    #[serde(default)]
    pub gemini: Option<GeminiSecret>,
}

/// Gemini API credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeminiSecret {
    pub api_key: String,
}

impl SecretConfig {
    /// The configured Gemini key, if present and non-blank.
    pub fn gemini_api_key(&self) -> Option<&str> {
        self.gemini
            .as_ref()
            .map(|gemini| gemini.api_key.trim())
            .filter(|key| !key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: ForgeConfig = toml::from_str("").unwrap();
        assert_eq!(config, ForgeConfig::default());
        assert_eq!(config.gemini.default_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.limits.max_notes_chars, 20_000);
        assert_eq!(config.validation.card_type_policy, CardTypePolicy::Strict);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: ForgeConfig = toml::from_str(
            r#"
            [anki]
            url = "127.0.0.1:8765"

            [validation]
            card_type_policy = "lenient"
            "#,
        )
        .unwrap();

        assert_eq!(config.anki.url.as_deref(), Some("127.0.0.1:8765"));
        assert_eq!(config.anki.deck, DEFAULT_ANKI_DECK);
        assert_eq!(config.validation.card_type_policy, CardTypePolicy::Lenient);
        assert_eq!(config.gemini.capable_model, CAPABLE_GEMINI_MODEL);
    }

    #[test]
    fn test_blank_api_key_counts_as_missing() {
        let secrets: SecretConfig =
            serde_json::from_str(r#"{"gemini": {"api_key": "  "}}"#).unwrap();
        assert_eq!(secrets.gemini_api_key(), None);
    }
}
