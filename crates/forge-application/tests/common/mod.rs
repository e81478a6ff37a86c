#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use forge_application::{FlashcardGateway, ForgeSession, SyncGateway};
use forge_core::anki::{NewNote, NoteSink};
use forge_core::config::ForgeConfig;
use forge_core::error::Result;
use forge_core::generator::{ContentGenerator, GenerationRequest};
use forge_core::prompt_store::BuiltinPrompts;
use forge_core::ForgeError;

/// Replies with queued texts in order and counts calls.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Self::new(texts.iter().map(|text| Ok(text.to_string())).collect())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContentGenerator for ScriptedGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ForgeError::internal("no scripted reply left")))
    }
}

/// In-memory stand-in for AnkiConnect.
#[derive(Default)]
pub struct FakeAnki {
    pub offline: bool,
    pub probes: AtomicUsize,
    pub batches: Mutex<Vec<Vec<NewNote>>>,
}

impl FakeAnki {
    pub fn online() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            offline: true,
            ..Default::default()
        })
    }

    pub fn batches(&self) -> Vec<Vec<NewNote>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NoteSink for FakeAnki {
    async fn version(&self) -> Result<u32> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(ForgeError::network("connection refused"));
        }
        Ok(6)
    }

    async fn deck_names(&self) -> Result<Vec<String>> {
        Ok(vec!["Default".to_string()])
    }

    async fn add_notes(&self, notes: Vec<NewNote>) -> Result<Vec<Option<i64>>> {
        if self.offline {
            return Err(ForgeError::network("connection refused"));
        }
        let ids = (1..=notes.len() as i64).map(Some).collect();
        self.batches.lock().unwrap().push(notes);
        Ok(ids)
    }
}

pub fn test_config() -> ForgeConfig {
    let mut config = ForgeConfig::default();
    config.limits.min_request_interval_ms = 0;
    config
}

pub fn session(generator: Arc<ScriptedGenerator>, anki: Arc<FakeAnki>) -> ForgeSession {
    let flashcards = FlashcardGateway::new(generator, Arc::new(BuiltinPrompts), &test_config());
    ForgeSession::new(flashcards, SyncGateway::new(anki), "Biology")
}

pub const PHOTOSYNTHESIS_CARDS: &str = r#"[
    {"cardType": "Basic", "front": "Where in the plant cell does photosynthesis take place?", "back": "In the <b>chloroplasts</b>"},
    {"cardType": "Basic", "front": "Which pigment absorbs light for photosynthesis?", "back": "Chlorophyll"},
    {"cardType": "Basic (type in the answer)", "front": "Which gas do plants release during photosynthesis?", "back": "Oxygen"}
]"#;
