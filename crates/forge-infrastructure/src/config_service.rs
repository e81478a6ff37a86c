//! Loading of config.toml and secret.json.

use std::path::Path;

use forge_core::ForgeError;
use forge_core::config::{ForgeConfig, SecretConfig};

use crate::paths::ForgePaths;

/// Environment variable that overrides the Gemini key from secret.json.
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Reads configuration and secrets from a [`ForgePaths`] root.
#[derive(Debug, Clone)]
pub struct ConfigService {
    paths: ForgePaths,
}

impl ConfigService {
    pub fn new(paths: ForgePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ForgePaths {
        &self.paths
    }

    /// Loads config.toml, falling back to defaults when the file is absent
    /// or empty.
    pub fn load_config(&self) -> Result<ForgeConfig, ForgeError> {
        let path = self.paths.config_file();
        match read_optional(&path)? {
            Some(content) => {
                let config: ForgeConfig = toml::from_str(&content).map_err(|e| {
                    ForgeError::config(format!("Failed to parse {}: {}", path.display(), e))
                })?;
                tracing::debug!("Loaded configuration from {}", path.display());
                Ok(config)
            }
            None => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(ForgeConfig::default())
            }
        }
    }

    /// Loads secret.json; a missing file is an empty secret set.
    ///
    /// Error messages never include file contents.
    pub fn load_secrets(&self) -> Result<SecretConfig, ForgeError> {
        let path = self.paths.secret_file();
        match read_optional(&path)? {
            Some(content) => serde_json::from_str(&content).map_err(|_| {
                ForgeError::config(format!("Failed to parse {}", path.display()))
            }),
            None => Ok(SecretConfig::default()),
        }
    }

    /// Resolves the Gemini API key: environment first, then secret.json.
    pub fn gemini_api_key(&self) -> Result<String, ForgeError> {
        if let Ok(key) = std::env::var(GEMINI_API_KEY_ENV)
            && !key.trim().is_empty()
        {
            return Ok(key.trim().to_string());
        }

        self.load_secrets()?
            .gemini_api_key()
            .map(str::to_string)
            .ok_or_else(|| {
                ForgeError::credential(format!(
                    "No Gemini API key in {} or {}",
                    self.paths.secret_file().display(),
                    GEMINI_API_KEY_ENV
                ))
            })
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, ForgeError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(content))
}
