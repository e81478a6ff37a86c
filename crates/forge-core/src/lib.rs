//! Domain core for Card Forge.
//!
//! Holds the flashcard model, the validation boundary around AI output, the
//! review workflow state machine and the traits the outer crates implement.
//! Nothing in this crate performs network or file I/O.

pub mod anki;
pub mod card;
pub mod config;
pub mod error;
pub mod generator;
pub mod limits;
pub mod prompt;
pub mod prompt_store;
pub mod throttle;
pub mod topic;
pub mod validation;
pub mod workflow;

pub use card::{CardField, CardType, Flashcard, ValidatedFlashcard};
pub use error::{ForgeError, InputKind, Result};
pub use topic::Topic;
pub use workflow::{ReviewWorkflow, WorkflowStep};
