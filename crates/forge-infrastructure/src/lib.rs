//! File-system adapters: paths, configuration/secret loading and the
//! prompt override store.

pub mod config_service;
pub mod paths;
pub mod prompt_store;

pub use config_service::ConfigService;
pub use paths::ForgePaths;
pub use prompt_store::FilePromptStore;
