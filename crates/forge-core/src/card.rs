//! Flashcard domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the receiving application presents a card.
///
/// Serialized with the exact literals the AI must produce and the note
/// templates Anki ships with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    /// Standard question-and-answer card.
    #[serde(rename = "Basic")]
    Basic,
    /// The learner types the exact answer.
    #[serde(rename = "Basic (type in the answer)")]
    BasicTyping,
}

impl CardType {
    pub const ALL: [CardType; 2] = [CardType::Basic, CardType::BasicTyping];

    /// The wire literal, also used as the Anki model name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardType::Basic => "Basic",
            CardType::BasicTyping => "Basic (type in the answer)",
        }
    }

    /// Exact-match lookup of a wire literal.
    pub fn from_literal(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == value)
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A card that passed validation but has no local identity yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedFlashcard {
    pub card_type: CardType,
    pub front: String,
    pub back: String,
}

impl ValidatedFlashcard {
    /// Assigns a fresh local id.
    pub fn into_flashcard(self) -> Flashcard {
        Flashcard {
            id: Uuid::new_v4().to_string(),
            card_type: self.card_type,
            front: self.front,
            back: self.back,
            is_deleted: false,
        }
    }
}

/// A flashcard held in the review session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub card_type: CardType,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Flashcard {
    /// Content view sent back to the AI as amendment context.
    ///
    /// Leaves out `id` and `is_deleted`; the AI never sees local bookkeeping.
    pub fn content(&self) -> ValidatedFlashcard {
        ValidatedFlashcard {
            card_type: self.card_type,
            front: self.front.clone(),
            back: self.back.clone(),
        }
    }

    /// Replaces type/front/back while keeping identity and liveness.
    pub fn replace_content(&mut self, content: ValidatedFlashcard) {
        self.card_type = content.card_type;
        self.front = content.front;
        self.back = content.back;
    }

    pub fn is_live(&self) -> bool {
        !self.is_deleted
    }
}

/// Field targeted by a manual edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    Front,
    Back,
    CardType,
}

impl std::str::FromStr for CardField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "front" => Ok(CardField::Front),
            "back" => Ok(CardField::Back),
            "type" | "cardtype" => Ok(CardField::CardType),
            other => Err(format!("unknown card field '{other}'")),
        }
    }
}
