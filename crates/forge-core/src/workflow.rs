//! Review workflow state machine.
//!
//! Drives a session through
//! `Setup -> Generating -> Reviewing -> Finalizing -> Sending -> Done`.
//! The machine itself never performs I/O: callers start an operation with a
//! `begin_*` method, run the gateway call, and hand the outcome back through
//! the matching `complete_*` method. Every method either applies a whole
//! transition or returns an error without touching any state.

use serde::{Deserialize, Serialize};

use crate::card::{CardField, CardType, Flashcard};
use crate::error::{ForgeError, Result};

pub const MSG_MISSING_INPUT: &str = "Please enter notes or upload an image.";
pub const MSG_NO_CARDS: &str = "AI returned no cards. Try adding more detail to your notes.";

/// The steps of a review session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WorkflowStep {
    #[default]
    Setup,
    Generating,
    Reviewing,
    Finalizing,
    Sending,
    Done,
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WorkflowStep::Setup => "setup",
            WorkflowStep::Generating => "generating",
            WorkflowStep::Reviewing => "reviewing",
            WorkflowStep::Finalizing => "finalizing",
            WorkflowStep::Sending => "sending",
            WorkflowStep::Done => "done",
        };
        f.write_str(label)
    }
}

/// In-memory review session: the generated cards, the cursor and the
/// current step.
///
/// Rejected cards stay in the list with `is_deleted` set, so indices and the
/// cursor never shift underneath the reviewer.
#[derive(Debug, Clone, Default)]
pub struct ReviewWorkflow {
    step: WorkflowStep,
    cards: Vec<Flashcard>,
    cursor: usize,
    editing: bool,
    message: Option<String>,
}

impl ReviewWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// The pending dismissible message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The card under the cursor while reviewing.
    pub fn current_card(&self) -> Option<&Flashcard> {
        if self.step == WorkflowStep::Reviewing {
            self.cards.get(self.cursor)
        } else {
            None
        }
    }

    pub fn live_cards(&self) -> impl Iterator<Item = &Flashcard> {
        self.cards.iter().filter(|card| card.is_live())
    }

    pub fn live_count(&self) -> usize {
        self.live_cards().count()
    }

    pub fn rejected_count(&self) -> usize {
        self.cards.len() - self.live_count()
    }

    // ============================================================================
    // Setup / Generating
    // ============================================================================

    /// `Setup -> Generating`, guarded by "notes non-blank or image present".
    pub fn begin_generation(&mut self, notes: &str, has_image: bool) -> Result<()> {
        self.require(WorkflowStep::Setup, "start generating")?;

        if notes.trim().is_empty() && !has_image {
            self.message = Some(MSG_MISSING_INPUT.to_string());
            return Err(ForgeError::missing_input(MSG_MISSING_INPUT));
        }

        self.message = None;
        self.step = WorkflowStep::Generating;
        tracing::debug!("[Workflow] setup -> generating");
        Ok(())
    }

    /// Leaves `Generating` with the gateway outcome.
    ///
    /// A non-empty card list starts the review at index 0. An empty list or
    /// a failure returns to `Setup` with a message and leaves any previous
    /// card list untouched.
    pub fn complete_generation(&mut self, outcome: Result<Vec<Flashcard>>) -> Result<WorkflowStep> {
        self.require(WorkflowStep::Generating, "finish generating")?;

        match outcome {
            Ok(cards) if !cards.is_empty() => {
                tracing::info!("[Workflow] generating -> reviewing ({} cards)", cards.len());
                self.cards = cards;
                self.cursor = 0;
                self.editing = false;
                self.step = WorkflowStep::Reviewing;
            }
            Ok(_) => {
                tracing::info!("[Workflow] generation returned no cards");
                self.message = Some(MSG_NO_CARDS.to_string());
                self.step = WorkflowStep::Setup;
            }
            Err(err) => {
                tracing::warn!("[Workflow] generation failed: {}", err);
                self.message = Some(err.user_message());
                self.step = WorkflowStep::Setup;
            }
        }
        Ok(self.step)
    }

    // ============================================================================
    // Reviewing
    // ============================================================================

    /// Keeps the current card and moves on.
    pub fn accept(&mut self) -> Result<WorkflowStep> {
        self.require(WorkflowStep::Reviewing, "accept a card")?;
        self.editing = false;
        Ok(self.advance())
    }

    /// Soft-deletes the current card and moves on.
    pub fn reject(&mut self) -> Result<WorkflowStep> {
        self.require(WorkflowStep::Reviewing, "reject a card")?;
        self.editing = false;
        self.cards[self.cursor].is_deleted = true;
        Ok(self.advance())
    }

    /// Jumps the cursor to `index` without touching any card.
    pub fn navigate(&mut self, index: usize) -> Result<()> {
        self.require(WorkflowStep::Reviewing, "navigate")?;
        if index >= self.cards.len() {
            return Err(ForgeError::InvalidIndex {
                index,
                len: self.cards.len(),
            });
        }
        self.editing = false;
        self.cursor = index;
        Ok(())
    }

    pub fn start_edit(&mut self) -> Result<()> {
        self.require(WorkflowStep::Reviewing, "edit a card")?;
        self.editing = true;
        Ok(())
    }

    pub fn finish_edit(&mut self) {
        self.editing = false;
    }

    /// Manually edits one field of the current card in place.
    ///
    /// Front and back may not be blanked; the card type must name one of the
    /// two variants (`basic`, `typing`, or the exact literal).
    pub fn edit_current(&mut self, field: CardField, value: &str) -> Result<()> {
        self.require(WorkflowStep::Reviewing, "edit a card")?;

        let card = &mut self.cards[self.cursor];
        match field {
            CardField::Front | CardField::Back if value.trim().is_empty() => {
                return Err(ForgeError::missing_input("Card text cannot be empty."));
            }
            CardField::Front => card.front = value.to_string(),
            CardField::Back => card.back = value.to_string(),
            CardField::CardType => card.card_type = parse_card_type(value)?,
        }
        self.editing = true;
        Ok(())
    }

    /// Replaces the current card's content with an amended version.
    ///
    /// The amended card must carry the current card's id.
    pub fn apply_amendment(&mut self, amended: Flashcard) -> Result<()> {
        self.require(WorkflowStep::Reviewing, "amend a card")?;

        let card = &mut self.cards[self.cursor];
        if card.id != amended.id {
            return Err(ForgeError::internal(format!(
                "amended card {} does not match current card {}",
                amended.id, card.id
            )));
        }
        card.replace_content(amended.content());
        Ok(())
    }

    // ============================================================================
    // Finalizing / Sending
    // ============================================================================

    /// `Finalizing -> Sending`, guarded by an available Anki connection.
    pub fn begin_sync(&mut self, connected: bool) -> Result<()> {
        self.require(WorkflowStep::Finalizing, "sync")?;

        if !connected {
            let err = ForgeError::NotConnected;
            self.message = Some(err.user_message());
            return Err(err);
        }

        self.message = None;
        self.step = WorkflowStep::Sending;
        tracing::debug!("[Workflow] finalizing -> sending");
        Ok(())
    }

    /// Leaves `Sending`: `Done` on success, back to `Finalizing` otherwise.
    pub fn complete_sync(&mut self, outcome: Result<Vec<i64>>) -> Result<WorkflowStep> {
        self.require(WorkflowStep::Sending, "finish syncing")?;

        match outcome {
            Ok(ids) => {
                tracing::info!("[Workflow] sending -> done ({} notes added)", ids.len());
                self.step = WorkflowStep::Done;
            }
            Err(err) => {
                tracing::warn!("[Workflow] sync failed: {}", err);
                self.message = Some(err.user_message());
                self.step = WorkflowStep::Finalizing;
            }
        }
        Ok(self.step)
    }

    // ============================================================================
    // Session-wide actions
    // ============================================================================

    /// The "home" affordance.
    ///
    /// Ignored while a call is in flight. From `Done` it behaves like
    /// [`reset`](Self::reset); elsewhere it returns to `Setup` keeping the
    /// card list until the next generation replaces it.
    pub fn go_home(&mut self) {
        match self.step {
            WorkflowStep::Generating | WorkflowStep::Sending => {}
            WorkflowStep::Done => self.reset(),
            _ => {
                self.editing = false;
                self.step = WorkflowStep::Setup;
            }
        }
    }

    /// Discards the session and returns to `Setup`.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records a failure that does not change the step (e.g. a failed
    /// amendment).
    pub fn report(&mut self, err: &ForgeError) {
        self.message = Some(err.user_message());
    }

    pub fn dismiss_message(&mut self) {
        self.message = None;
    }

    fn advance(&mut self) -> WorkflowStep {
        if self.cursor + 1 < self.cards.len() {
            self.cursor += 1;
        } else {
            tracing::info!(
                "[Workflow] reviewing -> finalizing ({} of {} cards kept)",
                self.live_count(),
                self.cards.len()
            );
            self.step = WorkflowStep::Finalizing;
        }
        self.step
    }

    fn require(&self, expected: WorkflowStep, action: &'static str) -> Result<()> {
        if self.step != expected {
            return Err(ForgeError::InvalidTransition {
                step: self.step.to_string(),
                action,
            });
        }
        Ok(())
    }
}

fn parse_card_type(value: &str) -> Result<CardType> {
    if let Some(card_type) = CardType::from_literal(value.trim()) {
        return Ok(card_type);
    }
    match value.trim().to_ascii_lowercase().as_str() {
        "basic" => Ok(CardType::Basic),
        "typing" | "type" | "basic-typing" => Ok(CardType::BasicTyping),
        other => Err(ForgeError::missing_input(format!(
            "Unknown card type '{other}'. Use 'basic' or 'typing'."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::ValidatedFlashcard;

    fn cards(count: usize) -> Vec<Flashcard> {
        (0..count)
            .map(|i| {
                ValidatedFlashcard {
                    card_type: CardType::Basic,
                    front: format!("Question {i}"),
                    back: format!("Answer {i}"),
                }
                .into_flashcard()
            })
            .collect()
    }

    fn reviewing(count: usize) -> ReviewWorkflow {
        let mut workflow = ReviewWorkflow::new();
        workflow.begin_generation("notes", false).unwrap();
        workflow.complete_generation(Ok(cards(count))).unwrap();
        workflow
    }

    #[test]
    fn test_generation_requires_notes_or_image() {
        let mut workflow = ReviewWorkflow::new();

        let err = workflow.begin_generation("   ", false).unwrap_err();

        assert!(matches!(err, ForgeError::MissingInput(_)));
        assert_eq!(workflow.step(), WorkflowStep::Setup);
        assert_eq!(workflow.message(), Some(MSG_MISSING_INPUT));

        workflow.begin_generation("", true).unwrap();
        assert_eq!(workflow.step(), WorkflowStep::Generating);
        assert_eq!(workflow.message(), None);
    }

    #[test]
    fn test_successful_generation_starts_review_at_zero() {
        let workflow = reviewing(3);
        assert_eq!(workflow.step(), WorkflowStep::Reviewing);
        assert_eq!(workflow.cursor(), 0);
        assert_eq!(workflow.cards().len(), 3);
    }

    #[test]
    fn test_empty_generation_returns_to_setup() {
        let mut workflow = ReviewWorkflow::new();
        workflow.begin_generation("notes", false).unwrap();

        let step = workflow.complete_generation(Ok(Vec::new())).unwrap();

        assert_eq!(step, WorkflowStep::Setup);
        assert_eq!(workflow.message(), Some(MSG_NO_CARDS));
    }

    #[test]
    fn test_failed_generation_returns_to_setup_with_message() {
        let mut workflow = ReviewWorkflow::new();
        workflow.begin_generation("notes", false).unwrap();

        workflow
            .complete_generation(Err(ForgeError::credential("missing key")))
            .unwrap();

        assert_eq!(workflow.step(), WorkflowStep::Setup);
        assert!(workflow.message().unwrap().contains("API key"));
        assert!(workflow.cards().is_empty());
    }

    #[test]
    fn test_straight_pass_advances_by_one_and_finalizes_once() {
        let mut workflow = reviewing(4);

        for expected in 1..4 {
            assert_eq!(workflow.accept().unwrap(), WorkflowStep::Reviewing);
            assert_eq!(workflow.cursor(), expected);
        }
        assert_eq!(workflow.accept().unwrap(), WorkflowStep::Finalizing);
        assert_eq!(workflow.cursor(), 3);

        assert!(matches!(
            workflow.accept(),
            Err(ForgeError::InvalidTransition { .. })
        ));
        assert_eq!(workflow.step(), WorkflowStep::Finalizing);
    }

    #[test]
    fn test_reject_soft_deletes_without_shrinking() {
        let mut workflow = reviewing(5);

        workflow.reject().unwrap();
        workflow.accept().unwrap();
        workflow.reject().unwrap();
        workflow.accept().unwrap();
        workflow.accept().unwrap();

        assert_eq!(workflow.step(), WorkflowStep::Finalizing);
        assert_eq!(workflow.cards().len(), 5);
        assert_eq!(workflow.rejected_count(), 2);
        assert_eq!(workflow.live_count(), 3);
        assert!(workflow.cards()[0].is_deleted);
        assert!(workflow.cards()[2].is_deleted);
    }

    #[test]
    fn test_navigation_moves_cursor_only() {
        let mut workflow = reviewing(3);
        let before = workflow.cards().to_vec();

        workflow.navigate(2).unwrap();
        assert_eq!(workflow.cursor(), 2);
        workflow.navigate(0).unwrap();

        assert_eq!(workflow.cards(), before.as_slice());
        assert!(matches!(
            workflow.navigate(3),
            Err(ForgeError::InvalidIndex { index: 3, len: 3 })
        ));
        assert_eq!(workflow.cursor(), 0);
    }

    #[test]
    fn test_accept_exits_edit_mode() {
        let mut workflow = reviewing(2);
        workflow.start_edit().unwrap();
        workflow.edit_current(CardField::Front, "Edited").unwrap();
        assert!(workflow.is_editing());

        workflow.accept().unwrap();

        assert!(!workflow.is_editing());
        assert_eq!(workflow.cards()[0].front, "Edited");
        assert_eq!(workflow.cursor(), 1);
    }

    #[test]
    fn test_edit_rejects_blank_text_and_unknown_type() {
        let mut workflow = reviewing(1);
        assert!(workflow.edit_current(CardField::Back, " ").is_err());
        assert!(workflow.edit_current(CardField::CardType, "cloze").is_err());

        workflow.edit_current(CardField::CardType, "typing").unwrap();
        assert_eq!(workflow.cards()[0].card_type, CardType::BasicTyping);
        assert_eq!(workflow.cards()[0].back, "Answer 0");
    }

    #[test]
    fn test_amendment_replaces_content_in_place() {
        let mut workflow = reviewing(2);
        workflow.navigate(1).unwrap();
        let mut amended = workflow.current_card().unwrap().clone();
        amended.front = "Better question".to_string();
        amended.card_type = CardType::BasicTyping;

        workflow.apply_amendment(amended.clone()).unwrap();

        assert_eq!(workflow.cursor(), 1);
        assert_eq!(workflow.cards()[1], amended);
    }

    #[test]
    fn test_amendment_with_foreign_id_is_refused() {
        let mut workflow = reviewing(2);
        let foreign = cards(1).remove(0);
        let before = workflow.cards().to_vec();

        assert!(workflow.apply_amendment(foreign).is_err());
        assert_eq!(workflow.cards(), before.as_slice());
    }

    #[test]
    fn test_sync_while_disconnected_stays_in_finalizing() {
        let mut workflow = reviewing(1);
        workflow.accept().unwrap();
        let before = workflow.cards().to_vec();

        let err = workflow.begin_sync(false).unwrap_err();

        assert!(matches!(err, ForgeError::NotConnected));
        assert_eq!(workflow.step(), WorkflowStep::Finalizing);
        assert!(workflow.message().unwrap().contains("connect"));
        assert_eq!(workflow.cards(), before.as_slice());
    }

    #[test]
    fn test_sync_failure_returns_to_finalizing() {
        let mut workflow = reviewing(2);
        workflow.accept().unwrap();
        workflow.accept().unwrap();
        workflow.begin_sync(true).unwrap();
        assert_eq!(workflow.step(), WorkflowStep::Sending);

        let step = workflow
            .complete_sync(Err(ForgeError::network("Could not reach Anki")))
            .unwrap();

        assert_eq!(step, WorkflowStep::Finalizing);
        assert_eq!(workflow.live_count(), 2);

        workflow.begin_sync(true).unwrap();
        assert_eq!(workflow.complete_sync(Ok(vec![1, 2])).unwrap(), WorkflowStep::Done);
    }

    #[test]
    fn test_home_is_ignored_while_busy() {
        let mut workflow = ReviewWorkflow::new();
        workflow.begin_generation("notes", false).unwrap();

        workflow.go_home();

        assert_eq!(workflow.step(), WorkflowStep::Generating);
    }

    #[test]
    fn test_home_from_review_keeps_cards() {
        let mut workflow = reviewing(2);
        workflow.go_home();
        assert_eq!(workflow.step(), WorkflowStep::Setup);
        assert_eq!(workflow.cards().len(), 2);
    }

    #[test]
    fn test_done_is_terminal_until_reset() {
        let mut workflow = reviewing(1);
        workflow.accept().unwrap();
        workflow.begin_sync(true).unwrap();
        workflow.complete_sync(Ok(vec![42])).unwrap();

        assert!(workflow.begin_generation("more notes", false).is_err());

        workflow.reset();
        assert_eq!(workflow.step(), WorkflowStep::Setup);
        assert!(workflow.cards().is_empty());
        assert_eq!(workflow.cursor(), 0);
    }

    #[test]
    fn test_out_of_step_operations_do_not_mutate() {
        let mut workflow = ReviewWorkflow::new();
        assert!(workflow.reject().is_err());
        assert!(workflow.begin_sync(true).is_err());
        assert!(workflow.complete_generation(Ok(cards(1))).is_err());
        assert_eq!(workflow.step(), WorkflowStep::Setup);
        assert!(workflow.cards().is_empty());
    }
}
