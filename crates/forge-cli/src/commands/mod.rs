use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use forge_application::{FlashcardGateway, SyncGateway};
use forge_core::config::ForgeConfig;
use forge_infrastructure::{ConfigService, FilePromptStore, ForgePaths};
use forge_interaction::{AnkiConnectClient, GeminiApiAgent};

pub mod anki;
pub mod generate;
pub mod prompts;
pub mod review;

/// Loaded configuration plus constructors for the gateways.
pub struct AppContext {
    service: ConfigService,
    config: ForgeConfig,
}

impl AppContext {
    pub fn load(config_dir: Option<&Path>) -> Result<Self> {
        let paths = ForgePaths::new(config_dir)?;
        let service = ConfigService::new(paths);
        let config = service
            .load_config()
            .context("Failed to load configuration")?;
        tracing::debug!("Using config root {}", service.paths().root().display());
        Ok(Self { service, config })
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    pub fn prompt_store(&self) -> Arc<FilePromptStore> {
        Arc::new(FilePromptStore::new(self.service.paths()))
    }

    pub fn anki_client(&self) -> Result<AnkiConnectClient> {
        Ok(AnkiConnectClient::from_settings(&self.config.anki)?)
    }

    pub fn sync_gateway(&self) -> Result<SyncGateway> {
        Ok(SyncGateway::new(Arc::new(self.anki_client()?)))
    }

    /// Builds the Gemini-backed gateway.
    ///
    /// A missing API key creates a template secret.json so the user knows
    /// where to put it.
    pub fn flashcard_gateway(&self) -> Result<FlashcardGateway> {
        let api_key = match self.service.gemini_api_key() {
            Ok(key) => key,
            Err(err) => {
                let path = self.service.paths().ensure_secret_file()?;
                anyhow::bail!("{}\nSecret file: {}", err.user_message(), path.display());
            }
        };
        let agent = GeminiApiAgent::from_settings(api_key, &self.config.gemini)?;
        Ok(FlashcardGateway::new(
            Arc::new(agent),
            self.prompt_store(),
            &self.config,
        ))
    }
}
