//! One review session: the workflow state machine wired to the gateways.

use forge_core::error::Result;
use forge_core::workflow::{ReviewWorkflow, WorkflowStep};
use forge_core::{ForgeError, Topic};

use crate::flashcard_gateway::{AmendmentParams, FlashcardGateway, GenerationParams};
use crate::sync_gateway::SyncGateway;

/// Runs the gateway calls for a [`ReviewWorkflow`].
///
/// Every method takes `&mut self`, so at most one generate, amend or sync
/// call is in flight per session. Failures of gateway calls are recorded as
/// the workflow message; only guard violations are returned as errors.
pub struct ForgeSession {
    workflow: ReviewWorkflow,
    flashcards: FlashcardGateway,
    sync: SyncGateway,
    deck: String,
    topic: Topic,
    model: Option<String>,
}

impl ForgeSession {
    pub fn new(flashcards: FlashcardGateway, sync: SyncGateway, deck: impl Into<String>) -> Self {
        Self {
            workflow: ReviewWorkflow::new(),
            flashcards,
            sync,
            deck: deck.into(),
            topic: Topic::default(),
            model: None,
        }
    }

    pub fn workflow(&self) -> &ReviewWorkflow {
        &self.workflow
    }

    /// Direct access for the review operations that need no I/O
    /// (accept, reject, navigate, edit, home).
    pub fn workflow_mut(&mut self) -> &mut ReviewWorkflow {
        &mut self.workflow
    }

    pub fn deck(&self) -> &str {
        &self.deck
    }

    pub fn sync_gateway(&self) -> &SyncGateway {
        &self.sync
    }

    /// `Setup -> Generating -> Reviewing | Setup`.
    ///
    /// The topic and model are remembered for later amendments.
    pub async fn generate(&mut self, params: GenerationParams) -> Result<WorkflowStep> {
        self.workflow
            .begin_generation(&params.notes, params.image.is_some())?;
        self.topic = params.topic;
        self.model = params.model.clone();

        let outcome = self.flashcards.generate(&params).await;
        self.workflow.complete_generation(outcome)
    }

    /// Amends the card under the cursor.
    ///
    /// On failure the card is left untouched and the error is both recorded
    /// as the message and returned.
    pub async fn amend_current(&mut self, instruction: &str) -> Result<()> {
        let card = self
            .workflow
            .current_card()
            .cloned()
            .ok_or_else(|| ForgeError::InvalidTransition {
                step: self.workflow.step().to_string(),
                action: "amend a card",
            })?;

        let params = AmendmentParams {
            instruction: instruction.to_string(),
            topic: self.topic,
            model: self.model.clone(),
        };
        match self.flashcards.amend(&card, &params).await {
            Ok(amended) => self.workflow.apply_amendment(amended),
            Err(err) => {
                self.workflow.report(&err);
                Err(err)
            }
        }
    }

    /// `Finalizing -> Sending -> Done | Finalizing`.
    ///
    /// Probes the connection first; a missing connection keeps the session in
    /// `Finalizing` and returns [`ForgeError::NotConnected`].
    pub async fn sync(&mut self) -> Result<WorkflowStep> {
        let connected =
            self.workflow.step() == WorkflowStep::Finalizing && self.sync.is_connected().await;
        self.workflow.begin_sync(connected)?;

        let outcome = self.sync.push(self.workflow.cards(), &self.deck).await;
        self.workflow.complete_sync(outcome)
    }
}
