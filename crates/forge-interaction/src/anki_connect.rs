//! AnkiConnect client.
//!
//! AnkiConnect exposes Anki over a JSON-RPC style HTTP API on the local
//! machine: every call is `POST {action, version, params}` answered by
//! `{result, error}`. Only loopback endpoints are accepted.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use forge_core::ForgeError;
use forge_core::anki::{NewNote, NoteSink};
use forge_core::config::AnkiSettings;
use forge_core::error::Result;
use reqwest::Client;
use reqwest::Url;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

pub const ANKI_CONNECT_URL_PRIMARY: &str = "http://127.0.0.1:8765";
pub const ANKI_CONNECT_URL_FALLBACK: &str = "http://localhost:8765";
const ANKI_CONNECT_VERSION: u32 = 6;

const UNREACHABLE_HELP: &str = "Network Error: Could not reach Anki.\n\
    1. Is Anki running?\n\
    2. Is AnkiConnect installed?\n\
    3. Is your 'webCorsOriginList' configured correctly?";

#[derive(Deserialize)]
struct AnkiResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

/// Client for a local AnkiConnect instance.
///
/// With no custom URL the two loopback defaults are tried in order on every
/// call.
#[derive(Debug, Clone)]
pub struct AnkiConnectClient {
    client: Client,
    endpoints: Vec<String>,
    timeout: Duration,
}

impl AnkiConnectClient {
    pub fn new(custom_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let endpoints = match custom_url.map(normalize_anki_url).transpose()?.flatten() {
            Some(url) => vec![url],
            None => vec![
                ANKI_CONNECT_URL_PRIMARY.to_string(),
                ANKI_CONNECT_URL_FALLBACK.to_string(),
            ],
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ForgeError::internal(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    pub fn from_settings(settings: &AnkiSettings) -> Result<Self> {
        Self::new(
            settings.url.as_deref(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    /// Endpoints tried by each call, in order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn invoke<T: DeserializeOwned>(&self, action: &str, params: Value) -> Result<T> {
        let payload = json!({
            "action": action,
            "version": ANKI_CONNECT_VERSION,
            "params": params,
        });

        let mut errors = Vec::new();
        let mut unreachable = false;
        let mut timed_out = false;

        for url in &self.endpoints {
            let response = match self
                .client
                .post(url)
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) => {
                    tracing::warn!("Connection attempt to {} failed: {}", url, err);
                    timed_out |= err.is_timeout();
                    unreachable |= err.is_connect();
                    errors.push(format!("{url}: {err}"));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                tracing::warn!("AnkiConnect at {} answered HTTP {}", url, status);
                errors.push(format!("{url}: HTTP {}", status.as_u16()));
                continue;
            }

            let body: AnkiResponse<T> = match response.json().await {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!("Unreadable AnkiConnect response from {}: {}", url, err);
                    timed_out |= err.is_timeout();
                    errors.push(format!("{url}: {err}"));
                    continue;
                }
            };

            if let Some(error) = body.error {
                return Err(ForgeError::anki(error));
            }
            return body
                .result
                .ok_or_else(|| ForgeError::anki(format!("'{action}' returned no result")));
        }

        if timed_out {
            Err(ForgeError::Timeout(self.timeout))
        } else if unreachable {
            Err(ForgeError::network(UNREACHABLE_HELP))
        } else {
            Err(ForgeError::anki(format!(
                "Anki Connection Failed:\n{}",
                errors.join("\n")
            )))
        }
    }
}

#[async_trait]
impl NoteSink for AnkiConnectClient {
    async fn version(&self) -> Result<u32> {
        self.invoke("version", json!({})).await
    }

    async fn deck_names(&self) -> Result<Vec<String>> {
        self.invoke("deckNames", json!({})).await
    }

    async fn add_notes(&self, notes: Vec<NewNote>) -> Result<Vec<Option<i64>>> {
        tracing::info!("Sending {} notes to AnkiConnect", notes.len());
        self.invoke("addNotes", json!({ "notes": notes })).await
    }
}

/// Normalizes a user-supplied AnkiConnect URL.
///
/// Blank input means "use the defaults" (`None`). A missing scheme gets
/// `http://`, a trailing slash is removed, and the host must be loopback.
pub fn normalize_anki_url(url: &str) -> Result<Option<String>> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let normalized = with_scheme.trim_end_matches('/').to_string();

    let parsed = Url::parse(&normalized)
        .map_err(|err| ForgeError::config(format!("Invalid AnkiConnect URL '{trimmed}': {err}")))?;
    if !is_loopback(&parsed) {
        return Err(ForgeError::config(format!(
            "AnkiConnect URL must point at this machine (127.0.0.1 or localhost), got '{trimmed}'"
        )));
    }

    Ok(Some(normalized))
}

fn is_loopback(url: &Url) -> bool {
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}
