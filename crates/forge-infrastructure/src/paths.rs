//! Unified path management for card-forge files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/card-forge/        # Config directory (platform default)
//! ├── config.toml              # Application configuration
//! ├── secret.json              # API keys
//! ├── prompts.json             # Topic instruction overrides
//! └── backups/                 # Prompt backups, one directory per topic
//!     └── general/
//!         └── backup-<millis>.json
//! ```

use std::path::{Path, PathBuf};

use forge_core::ForgeError;
use forge_core::config::{GeminiSecret, SecretConfig};

const APP_DIR_NAME: &str = "card-forge";

/// Resolves every file location from one root directory.
///
/// `ForgePaths::new(None)` uses the platform config directory; tests pass an
/// explicit root.
#[derive(Debug, Clone)]
pub struct ForgePaths {
    root: PathBuf,
}

impl ForgePaths {
    pub fn new(base_path: Option<&Path>) -> Result<Self, ForgeError> {
        let root = match base_path {
            Some(path) => path.to_path_buf(),
            None => dirs::config_dir()
                .ok_or_else(|| ForgeError::config("Cannot find the config directory"))?
                .join(APP_DIR_NAME),
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to secret.json.
    ///
    /// # Security Note
    ///
    /// Keep this file at 600 permissions; [`ensure_secret_file`](Self::ensure_secret_file)
    /// creates it that way.
    pub fn secret_file(&self) -> PathBuf {
        self.root.join("secret.json")
    }

    pub fn prompts_file(&self) -> PathBuf {
        self.root.join("prompts.json")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Ensures secret.json exists, writing an empty template if it doesn't.
    pub fn ensure_secret_file(&self) -> Result<PathBuf, ForgeError> {
        let secret_path = self.secret_file();
        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            gemini: Some(GeminiSecret {
                api_key: String::new(),
            }),
        };
        std::fs::write(&secret_path, serde_json::to_string_pretty(&template)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        tracing::info!("Created secret template at {}", secret_path.display());
        Ok(secret_path)
    }
}
