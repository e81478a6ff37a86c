//! Note-creation protocol of the sync target.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::card::{CardType, Flashcard};
use crate::error::Result;

/// A note in the shape AnkiConnect's `addNotes` expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub deck_name: String,
    pub model_name: String,
    pub fields: BTreeMap<String, String>,
    pub options: NoteOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
}

impl NewNote {
    /// Maps a card onto its note template; duplicates are never allowed.
    ///
    /// Both card types use `Front`/`Back` fields. The field text is taken as
    /// given, so sanitize it before calling this.
    pub fn from_card(card: &Flashcard, deck_name: &str) -> Self {
        let model_name = match card.card_type {
            CardType::Basic => "Basic",
            CardType::BasicTyping => "Basic (type in the answer)",
        };

        let mut fields = BTreeMap::new();
        fields.insert("Front".to_string(), card.front.clone());
        fields.insert("Back".to_string(), card.back.clone());

        Self {
            deck_name: deck_name.to_string(),
            model_name: model_name.to_string(),
            fields,
            options: NoteOptions {
                allow_duplicate: false,
            },
        }
    }
}

/// The local flashcard application.
#[async_trait::async_trait]
pub trait NoteSink: Send + Sync {
    /// Connectivity probe; returns the protocol version.
    async fn version(&self) -> Result<u32>;

    async fn deck_names(&self) -> Result<Vec<String>>;

    /// Submits the whole batch in one call.
    ///
    /// Returns one entry per note, `None` where the note was not created.
    async fn add_notes(&self, notes: Vec<NewNote>) -> Result<Vec<Option<i64>>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::ValidatedFlashcard;

    #[test]
    fn test_typing_card_uses_type_answer_template() {
        let card = ValidatedFlashcard {
            card_type: CardType::BasicTyping,
            front: "Rust keyword for immutable binding?".to_string(),
            back: "let".to_string(),
        }
        .into_flashcard();

        let note = NewNote::from_card(&card, "Rust");
        let json = serde_json::to_value(&note).unwrap();

        assert_eq!(json["deckName"], "Rust");
        assert_eq!(json["modelName"], "Basic (type in the answer)");
        assert_eq!(json["fields"]["Front"], "Rust keyword for immutable binding?");
        assert_eq!(json["fields"]["Back"], "let");
        assert_eq!(json["options"]["allowDuplicate"], false);
    }
}
