//! Pushes reviewed cards into Anki.

use std::sync::Arc;

use forge_core::anki::{NewNote, NoteSink};
use forge_core::error::Result;
use forge_core::{Flashcard, ForgeError};
use forge_interaction::sanitize_card_html;

pub struct SyncGateway {
    sink: Arc<dyn NoteSink>,
}

impl SyncGateway {
    pub fn new(sink: Arc<dyn NoteSink>) -> Self {
        Self { sink }
    }

    /// Probes the sink; any failure counts as "not connected".
    pub async fn is_connected(&self) -> bool {
        match self.sink.version().await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!("[SyncGateway] connectivity probe failed: {}", err);
                false
            }
        }
    }

    /// Surfaces the probe failure instead of swallowing it.
    pub async fn ping(&self) -> Result<u32> {
        self.sink.version().await
    }

    pub async fn deck_names(&self) -> Result<Vec<String>> {
        self.sink.deck_names().await
    }

    /// Adds every non-deleted card to `deck` in one batch.
    ///
    /// Card fields are sanitized first. With nothing to send the sink is
    /// never called. The push only succeeds when every note was created.
    pub async fn push(&self, cards: &[Flashcard], deck: &str) -> Result<Vec<i64>> {
        let notes: Vec<NewNote> = cards
            .iter()
            .filter(|card| card.is_live())
            .map(|card| {
                let mut clean = card.clone();
                clean.front = sanitize_card_html(&card.front);
                clean.back = sanitize_card_html(&card.back);
                NewNote::from_card(&clean, deck)
            })
            .collect();

        if notes.is_empty() {
            tracing::info!("[SyncGateway] no live cards, nothing to send");
            return Ok(Vec::new());
        }
        if deck.trim().is_empty() {
            return Err(ForgeError::missing_input("Please choose a deck."));
        }

        let requested = notes.len();
        tracing::info!("[SyncGateway] pushing {} notes to deck '{}'", requested, deck);
        let results = self.sink.add_notes(notes).await?;

        if results.len() != requested {
            return Err(ForgeError::anki(format!(
                "AnkiConnect answered for {} of {} notes",
                results.len(),
                requested
            )));
        }

        let failed = results.iter().filter(|id| id.is_none()).count();
        if failed > 0 {
            return Err(ForgeError::anki(format!(
                "{failed} of {requested} notes could not be added (duplicate or unknown note type?)"
            )));
        }

        Ok(results.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::{CardType, ValidatedFlashcard};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeAnki {
        offline: bool,
        reply: Vec<Option<i64>>,
        batches: Mutex<Vec<Vec<NewNote>>>,
    }

    #[async_trait::async_trait]
    impl NoteSink for FakeAnki {
        async fn version(&self) -> Result<u32> {
            if self.offline {
                return Err(ForgeError::network("connection refused"));
            }
            Ok(6)
        }

        async fn deck_names(&self) -> Result<Vec<String>> {
            Ok(vec!["Default".to_string()])
        }

        async fn add_notes(&self, notes: Vec<NewNote>) -> Result<Vec<Option<i64>>> {
            self.batches.lock().unwrap().push(notes);
            Ok(self.reply.clone())
        }
    }

    fn card(card_type: CardType, front: &str, back: &str) -> Flashcard {
        ValidatedFlashcard {
            card_type,
            front: front.to_string(),
            back: back.to_string(),
        }
        .into_flashcard()
    }

    #[tokio::test]
    async fn test_push_sends_live_cards_sanitized_in_one_batch() {
        let sink = Arc::new(FakeAnki {
            reply: vec![Some(11), Some(12)],
            ..Default::default()
        });
        let gateway = SyncGateway::new(sink.clone());

        let mut rejected = card(CardType::Basic, "dropped", "dropped");
        rejected.is_deleted = true;
        let cards = vec![
            card(CardType::Basic, "<b>ATP</b><script>x()</script>", "energy"),
            rejected,
            card(CardType::BasicTyping, "Keyword?", r#"<span style="color:red">let</span>"#),
        ];

        let ids = gateway.push(&cards, "Biology").await.unwrap();
        assert_eq!(ids, vec![11, 12]);

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        let notes = &batches[0];
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].fields["Front"], "<b>ATP</b>");
        assert_eq!(notes[1].model_name, "Basic (type in the answer)");
        assert_eq!(notes[1].fields["Back"], "<span>let</span>");
        assert!(notes.iter().all(|note| note.deck_name == "Biology"));
    }

    #[tokio::test]
    async fn test_push_without_live_cards_skips_the_sink() {
        let sink = Arc::new(FakeAnki::default());
        let gateway = SyncGateway::new(sink.clone());

        let mut only = card(CardType::Basic, "f", "b");
        only.is_deleted = true;

        assert!(gateway.push(&[only], "Default").await.unwrap().is_empty());
        assert!(gateway.push(&[], "Default").await.unwrap().is_empty());
        assert!(sink.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_any_missing_note_id_fails_the_push() {
        let sink = Arc::new(FakeAnki {
            reply: vec![Some(1), None],
            ..Default::default()
        });
        let gateway = SyncGateway::new(sink);
        let cards = vec![card(CardType::Basic, "a", "b"), card(CardType::Basic, "c", "d")];

        let err = gateway.push(&cards, "Default").await.unwrap_err();
        match err {
            ForgeError::AnkiConnect(message) => assert!(message.starts_with("1 of 2 notes")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_probe_is_silent_but_ping_surfaces_the_failure() {
        let online = SyncGateway::new(Arc::new(FakeAnki::default()));
        assert!(online.is_connected().await);
        assert_eq!(online.ping().await.unwrap(), 6);

        let offline = SyncGateway::new(Arc::new(FakeAnki {
            offline: true,
            ..Default::default()
        }));
        assert!(!offline.is_connected().await);
        assert!(offline.ping().await.unwrap_err().is_network());
    }
}
