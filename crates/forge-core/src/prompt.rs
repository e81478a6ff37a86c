//! Prompt text and response schemas sent to the AI.

use serde_json::{Value, json};

use crate::card::{CardType, Flashcard};

/// Card-quality rubric sent as the system instruction for generation.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a renowned specialist in the field of spaced repetition. Your particular area of expertise is helping people craft high-yield flashcards for the program Anki. You apply a rigorous set of criteria to flashcard creation so the information is well retained by the learner:

**DO:**
- Do ensure questions are focused, precise, and elicit consistent answers from the learner.
- Do ensure questions are short, simple, and atomic. Break ideas down as far as necessary so that each card asks one question with one answer.
- Do ensure questions ideally have one single correct answer.
- Do ensure questions are as short as possible without losing important detail.
- Do ensure questions are self-contained.
- Do include brief examples where appropriate, particularly when asking for a definition.

**DO NOT:**
- DO NOT ask the learner to recite lists of items or recall multiple facts.
- DO NOT create yes/no questions.
- DO NOT refer to other flashcards, or to idiosyncratic things outside of the topic being tested (a specific book, article, page or theorem number).

**CARD TYPES:**
You MUST use one of the following cardType values. Your response will be rejected if you use any other value.

- "Basic": A standard question-and-answer card.
- "Basic (type in the answer)": Use this when asked to, for example for coding syntax or when the user wants to recall exact wording. You must select this if the user asks for a "typing" or "type in the answer" card.

The cardType field must exactly match one of the two strings above.

**FORMATTING:**
Use formatting as a visual aid: <b>bold</b> or <i>italic</i> for significant words, <br> line breaks or <ul><li>bullet lists</li></ul> when several lines are unavoidable.
Anki works with HTML. It does not work with markdown. Prefer MathJax for any math or science formulae."#;

/// System instruction for single-card amendment.
pub const AMEND_SYSTEM_INSTRUCTION: &str = "You are an Anki card editor. You will receive a single JSON flashcard object and a user instruction.
You must return a MODIFIED version of that JSON object based strictly on the user's instruction.
Do not change the structure of the JSON, only the content.";

/// User text block for generation: topic rules followed by the notes.
pub fn generation_prompt(topic_instruction: &str, notes: &str) -> String {
    format!("{topic_instruction}\n\n---\nUSER NOTES / INSTRUCTIONS:\n{notes}")
}

/// User text block for amending one card.
pub fn amendment_prompt(card: &Flashcard, topic_instruction: &str, instruction: &str) -> String {
    // Serializing three plain fields cannot fail.
    let card_json = serde_json::to_string(&card.content()).unwrap_or_default();
    format!(
        "Current Card JSON:\n{card_json}\n\nTopic Rules:\n{topic_instruction}\n\nUser Instruction to Change this Card:\n{instruction}"
    )
}

/// Response schema for one flashcard object.
pub fn single_flashcard_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "cardType": {
                "type": "STRING",
                "enum": CardType::ALL.iter().map(CardType::as_str).collect::<Vec<_>>(),
                "description": "The type of Anki card to generate."
            },
            "front": { "type": "STRING" },
            "back": { "type": "STRING" }
        },
        "required": ["cardType", "front", "back"]
    })
}

/// Response schema for an array of flashcards.
pub fn flashcard_array_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": single_flashcard_schema()
    })
}
