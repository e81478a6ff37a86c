//! Flashcard generation and amendment gateway.
//!
//! Wraps a [`ContentGenerator`] with the local guards (input ceilings and the
//! call throttle), builds the prompts, and turns the raw model text into
//! validated flashcards.

use std::sync::Arc;
use std::time::Duration;

use forge_core::config::{ForgeConfig, GeminiSettings};
use forge_core::error::Result;
use forge_core::generator::{ContentGenerator, GenerationRequest, ReasoningMode};
use forge_core::limits::{ImagePayload, InputLimits};
use forge_core::prompt::{
    AMEND_SYSTEM_INSTRUCTION, SYSTEM_INSTRUCTION, amendment_prompt, flashcard_array_schema,
    generation_prompt, single_flashcard_schema,
};
use forge_core::prompt_store::PromptStore;
use forge_core::throttle::CallThrottle;
use forge_core::validation::{CardTypePolicy, validate_flashcard_response, validate_single_flashcard};
use forge_core::{Flashcard, ForgeError, Topic};
use serde_json::Value;

/// Inputs for one generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationParams {
    pub notes: String,
    pub topic: Topic,
    pub image: Option<ImagePayload>,
    pub deep_reasoning: bool,
    /// Caller-selected model; the configured default when `None`.
    pub model: Option<String>,
}

/// Inputs for one amendment call.
#[derive(Debug, Clone, Default)]
pub struct AmendmentParams {
    pub instruction: String,
    pub topic: Topic,
    pub model: Option<String>,
}

pub struct FlashcardGateway {
    generator: Arc<dyn ContentGenerator>,
    prompts: Arc<dyn PromptStore>,
    settings: GeminiSettings,
    limits: InputLimits,
    policy: CardTypePolicy,
    throttle: CallThrottle,
}

impl FlashcardGateway {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        prompts: Arc<dyn PromptStore>,
        config: &ForgeConfig,
    ) -> Self {
        Self {
            generator,
            prompts,
            settings: config.gemini.clone(),
            limits: config.limits.clone(),
            policy: config.validation.card_type_policy,
            throttle: CallThrottle::new(Duration::from_millis(
                config.limits.min_request_interval_ms,
            )),
        }
    }

    pub fn throttle(&self) -> &CallThrottle {
        &self.throttle
    }

    /// Generates a fresh card list from notes (and optionally an image).
    ///
    /// Every local check runs before the generator is called. An empty card
    /// list from the model is returned as `Ok(vec![])`.
    pub async fn generate(&self, params: &GenerationParams) -> Result<Vec<Flashcard>> {
        self.limits.check_notes(&params.notes)?;
        if let Some(image) = &params.image {
            self.limits.check_image(image)?;
        }

        let topic_instruction = self.prompts.instruction_for(params.topic).await?;
        let text = generation_prompt(&topic_instruction, &params.notes);
        self.limits.check_prompt(&text)?;
        self.throttle.check()?;

        let model = self.select_model(params);
        let reasoning = if params.deep_reasoning {
            ReasoningMode::Thinking {
                budget: self.settings.thinking_budget,
            }
        } else {
            ReasoningMode::Temperature(self.settings.temperature)
        };

        tracing::info!(
            "[FlashcardGateway] generate: model={}, topic={}, image={}, deep={}",
            model,
            params.topic,
            params.image.is_some(),
            params.deep_reasoning
        );
        tracing::debug!(
            "[FlashcardGateway] prompt chars={}, image bytes={}",
            text.chars().count(),
            params.image.as_ref().map_or(0, ImagePayload::decoded_len)
        );

        let raw = self
            .generator
            .generate(GenerationRequest {
                model,
                system_instruction: SYSTEM_INSTRUCTION.to_string(),
                text,
                image: params.image.clone(),
                response_schema: flashcard_array_schema(),
                reasoning: Some(reasoning),
            })
            .await?;

        let value = parse_response(&raw)?;
        let cards: Vec<Flashcard> = validate_flashcard_response(&value, self.policy)?
            .into_iter()
            .map(|card| card.into_flashcard())
            .collect();

        tracing::info!("[FlashcardGateway] generated {} cards", cards.len());
        Ok(cards)
    }

    /// Rewrites one card following a free-text instruction.
    ///
    /// The result keeps the original card's `id` and `is_deleted`; type,
    /// front and back come from the model.
    pub async fn amend(&self, card: &Flashcard, params: &AmendmentParams) -> Result<Flashcard> {
        if params.instruction.trim().is_empty() {
            return Err(ForgeError::missing_input(
                "Please describe how the card should change.",
            ));
        }
        self.limits.check_instruction(&params.instruction)?;

        let topic_instruction = self.prompts.instruction_for(params.topic).await?;
        let text = amendment_prompt(card, &topic_instruction, &params.instruction);
        self.limits.check_prompt(&text)?;
        self.throttle.check()?;

        let model = params
            .model
            .clone()
            .unwrap_or_else(|| self.settings.default_model.clone());
        tracing::info!("[FlashcardGateway] amend card {}: model={}", card.id, model);

        let raw = self
            .generator
            .generate(GenerationRequest {
                model,
                system_instruction: AMEND_SYSTEM_INSTRUCTION.to_string(),
                text,
                image: None,
                response_schema: single_flashcard_schema(),
                reasoning: None,
            })
            .await?;

        let value = parse_response(&raw)?;
        let content = validate_single_flashcard(&value, self.policy)?;

        let mut amended = card.clone();
        amended.replace_content(content);
        Ok(amended)
    }

    /// Image input or deep reasoning forces the capable model.
    fn select_model(&self, params: &GenerationParams) -> String {
        if params.image.is_some() || params.deep_reasoning {
            return self.settings.capable_model.clone();
        }
        params
            .model
            .clone()
            .unwrap_or_else(|| self.settings.default_model.clone())
    }
}

fn parse_response(raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Err(ForgeError::EmptyResponse);
    }
    serde_json::from_str(raw).map_err(|err| ForgeError::malformed_output(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::prompt_store::BuiltinPrompts;
    use std::sync::Mutex;

    /// Records every request and replies with a fixed text.
    struct RecordingGenerator {
        reply: String,
        requests: Mutex<Vec<GenerationRequest>>,
    }

    impl RecordingGenerator {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<GenerationRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ContentGenerator for RecordingGenerator {
        async fn generate(&self, request: GenerationRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    fn unthrottled_config() -> ForgeConfig {
        let mut config = ForgeConfig::default();
        config.limits.min_request_interval_ms = 0;
        config
    }

    fn gateway(generator: Arc<RecordingGenerator>, config: &ForgeConfig) -> FlashcardGateway {
        FlashcardGateway::new(generator, Arc::new(BuiltinPrompts), config)
    }

    const ONE_CARD: &str = r#"[{"cardType": "Basic", "front": "What is ATP?", "back": "The cell's energy currency"}]"#;

    #[tokio::test]
    async fn test_plain_generation_uses_caller_model_and_temperature() {
        let generator = RecordingGenerator::new(ONE_CARD);
        let gateway = gateway(generator.clone(), &unthrottled_config());

        let params = GenerationParams {
            notes: "ATP".to_string(),
            model: Some("gemini-2.0-flash".to_string()),
            ..Default::default()
        };
        let cards = gateway.generate(&params).await.unwrap();

        assert_eq!(cards.len(), 1);
        assert!(!cards[0].is_deleted);
        let request = &generator.requests()[0];
        assert_eq!(request.model, "gemini-2.0-flash");
        assert_eq!(request.reasoning, Some(ReasoningMode::Temperature(0.3)));
        assert!(request.text.ends_with("USER NOTES / INSTRUCTIONS:\nATP"));
        assert_eq!(request.system_instruction, SYSTEM_INSTRUCTION);
    }

    #[tokio::test]
    async fn test_image_or_deep_reasoning_forces_capable_model() {
        let generator = RecordingGenerator::new(ONE_CARD);
        let gateway = gateway(generator.clone(), &unthrottled_config());

        let with_image = GenerationParams {
            image: Some(ImagePayload::from_data_url("data:image/png;base64,aGVsbG8=")),
            model: Some("gemini-2.0-flash".to_string()),
            ..Default::default()
        };
        gateway.generate(&with_image).await.unwrap();

        let deep = GenerationParams {
            notes: "Krebs cycle".to_string(),
            deep_reasoning: true,
            ..Default::default()
        };
        gateway.generate(&deep).await.unwrap();

        let requests = generator.requests();
        assert_eq!(requests[0].model, "gemini-3-pro-preview");
        assert_eq!(requests[0].image.as_ref().unwrap().mime_type, "image/png");
        assert_eq!(requests[1].model, "gemini-3-pro-preview");
        assert_eq!(
            requests[1].reasoning,
            Some(ReasoningMode::Thinking { budget: 32_768 })
        );
    }

    #[tokio::test]
    async fn test_long_notes_are_rejected_locally() {
        let generator = RecordingGenerator::new(ONE_CARD);
        let gateway = gateway(generator.clone(), &unthrottled_config());

        let params = GenerationParams {
            notes: "x".repeat(20_001),
            ..Default::default()
        };
        let err = gateway.generate(&params).await.unwrap_err();

        assert!(err.is_input_too_large());
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_second_call_inside_window_is_rate_limited() {
        let generator = RecordingGenerator::new(ONE_CARD);
        let gateway = gateway(generator.clone(), &ForgeConfig::default());
        let params = GenerationParams {
            notes: "ATP".to_string(),
            ..Default::default()
        };

        gateway.generate(&params).await.unwrap();
        let err = gateway.generate(&params).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert!(err.is_retryable());
        assert_eq!(generator.requests().len(), 1);

        gateway.throttle().reset();
        gateway.generate(&params).await.unwrap();
        assert_eq!(generator.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_model_output_failures_are_distinguished() {
        let params = GenerationParams {
            notes: "ATP".to_string(),
            ..Default::default()
        };

        let gateway_for = |reply: &str| gateway(RecordingGenerator::new(reply), &unthrottled_config());

        let err = gateway_for("   ").generate(&params).await.unwrap_err();
        assert!(matches!(err, ForgeError::EmptyResponse));

        let err = gateway_for("not json").generate(&params).await.unwrap_err();
        assert!(matches!(err, ForgeError::MalformedOutput(_)));

        let err = gateway_for(r#"[{"cardType": "Basic", "front": "", "back": "b"}]"#)
            .generate(&params)
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let cards = gateway_for("[]").generate(&params).await.unwrap();
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn test_lenient_policy_normalizes_unknown_types() {
        let mut config = unthrottled_config();
        config.validation.card_type_policy = CardTypePolicy::Lenient;
        let generator =
            RecordingGenerator::new(r#"[{"cardType": "Typing", "front": "f", "back": "b"}]"#);
        let gateway = gateway(generator, &config);

        let params = GenerationParams {
            notes: "x".to_string(),
            ..Default::default()
        };
        let cards = gateway.generate(&params).await.unwrap();
        assert_eq!(cards[0].card_type, forge_core::CardType::BasicTyping);
    }

    #[tokio::test]
    async fn test_amend_keeps_identity_and_liveness() {
        let generator = RecordingGenerator::new(
            r#"{"cardType": "Basic (type in the answer)", "front": "Keyword for a constant?", "back": "const"}"#,
        );
        let gateway = gateway(generator.clone(), &unthrottled_config());

        let mut card = forge_core::ValidatedFlashcard {
            card_type: forge_core::CardType::Basic,
            front: "How do you declare a constant?".to_string(),
            back: "With const".to_string(),
        }
        .into_flashcard();
        card.is_deleted = true;

        let params = AmendmentParams {
            instruction: "Make it a typing card".to_string(),
            topic: Topic::Programming,
            model: None,
        };
        let amended = gateway.amend(&card, &params).await.unwrap();

        assert_eq!(amended.id, card.id);
        assert!(amended.is_deleted);
        assert_eq!(amended.card_type, forge_core::CardType::BasicTyping);
        assert_eq!(amended.back, "const");

        let request = &generator.requests()[0];
        assert_eq!(request.model, "gemini-2.5-flash");
        assert_eq!(request.system_instruction, AMEND_SYSTEM_INSTRUCTION);
        assert!(request.text.starts_with("Current Card JSON:\n"));
        assert!(request.text.contains("Make it a typing card"));
        assert_eq!(request.reasoning, None);
    }

    #[tokio::test]
    async fn test_amend_rejects_blank_or_oversized_instruction() {
        let generator = RecordingGenerator::new("{}");
        let gateway = gateway(generator.clone(), &unthrottled_config());
        let card = forge_core::ValidatedFlashcard {
            card_type: forge_core::CardType::Basic,
            front: "f".to_string(),
            back: "b".to_string(),
        }
        .into_flashcard();

        let blank = AmendmentParams {
            instruction: "  ".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            gateway.amend(&card, &blank).await,
            Err(ForgeError::MissingInput(_))
        ));

        let oversized = AmendmentParams {
            instruction: "y".repeat(8_001),
            ..Default::default()
        };
        assert!(gateway.amend(&card, &oversized).await.unwrap_err().is_input_too_large());
        assert!(generator.requests().is_empty());
    }
}
