//! Adapters for the two remote collaborators: the Gemini REST API and a
//! local AnkiConnect instance.

pub mod anki_connect;
pub mod gemini_api_agent;
pub mod sanitize;

pub use anki_connect::AnkiConnectClient;
pub use gemini_api_agent::GeminiApiAgent;
pub use sanitize::sanitize_card_html;
