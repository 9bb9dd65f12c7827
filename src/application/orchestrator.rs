//! Turn orchestrator - one conversational turn, end to end.
//!
//! Every turn follows the same state machine: validate the input, check
//! the session exists, persist the user message, call the generator,
//! publish any image, persist the assistant turn. The user message is
//! written before the generator runs, so a failed turn still shows what
//! the user asked for.

use std::sync::Arc;

use crate::domain::catalog::{ImagePurpose, StylePreset};
use crate::domain::foundation::{ImageId, SessionId};
use crate::domain::session::{ChatError, ChatMessage, ChatSession, GeneratedImageRecord};
use crate::ports::{
    AssistantTurn, ChatRequest, ChatStore, ConverseRequest, FileStore, GeneratedImage,
    GenerateRequest, ImageGenerator, RefineRequest, UploadRequest,
};

/// Longest accepted user message, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// A consultation turn: text in, text out.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub session_id: SessionId,
    pub message: String,
}

/// An explicit generation turn.
#[derive(Debug, Clone)]
pub struct GenerateTurn {
    pub session_id: SessionId,
    pub prompt: String,
    /// Overrides the session purpose for this turn only.
    pub purpose: Option<ImagePurpose>,
    /// Overrides the session style for this turn only.
    pub style: Option<StylePreset>,
}

/// A refinement turn against a previously generated image.
#[derive(Debug, Clone)]
pub struct RefineTurn {
    pub session_id: SessionId,
    pub feedback: String,
    /// Refine this specific image instead of the session's latest.
    pub image_id: Option<ImageId>,
}

/// A mixed-mode turn: the model decides whether to reply with text,
/// an image, or both.
#[derive(Debug, Clone)]
pub struct ConverseTurn {
    pub session_id: SessionId,
    pub message: String,
    pub purpose: Option<ImagePurpose>,
    pub style: Option<StylePreset>,
}

/// The persisted result of one turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub message: ChatMessage,
    pub image: Option<GeneratedImageRecord>,
}

/// Drives conversational turns against the generator and the stores.
pub struct TurnOrchestrator {
    store: Arc<dyn ChatStore>,
    generator: Option<Arc<dyn ImageGenerator>>,
    file_store: Option<Arc<dyn FileStore>>,
}

impl TurnOrchestrator {
    pub fn new(
        store: Arc<dyn ChatStore>,
        generator: Option<Arc<dyn ImageGenerator>>,
        file_store: Option<Arc<dyn FileStore>>,
    ) -> Self {
        Self {
            store,
            generator,
            file_store,
        }
    }

    /// Text-only consultation with the marketing advisor.
    pub async fn chat(&self, turn: ChatTurn) -> Result<TurnOutcome, ChatError> {
        // 1. Validate before touching any state
        validate_text("message", &turn.message)?;
        let generator = self.generator()?;
        self.require_session(&turn.session_id).await?;

        // 2. Persist the user's side of the turn
        let user_message = ChatMessage::user_text(turn.session_id, turn.message.clone());
        self.store.append_user_message(&user_message).await?;

        // 3. Ask the advisor
        let reply = generator
            .chat(ChatRequest::new(turn.session_id, turn.message))
            .await?;

        // 4. Persist the reply
        let message = ChatMessage::assistant_text(turn.session_id, reply.text, reply.tokens_used);
        self.store
            .record_assistant_turn(&AssistantTurn::text(message.clone(), reply.tokens_used))
            .await?;

        Ok(TurnOutcome {
            message,
            image: None,
        })
    }

    /// Generate a fresh image from an explicit prompt.
    pub async fn generate(&self, turn: GenerateTurn) -> Result<TurnOutcome, ChatError> {
        validate_text("prompt", &turn.prompt)?;
        let generator = self.generator()?;
        let session = self.require_session(&turn.session_id).await?;

        // Turn-level overrides win over the session defaults
        let purpose = turn.purpose.unwrap_or(session.purpose());
        let style = turn.style.or(session.style());

        let user_message = ChatMessage::user_text(turn.session_id, turn.prompt.clone());
        self.store.append_user_message(&user_message).await?;

        let mut request = GenerateRequest::new(turn.prompt, purpose).with_session(turn.session_id);
        if let Some(style) = style {
            request = request.with_style(style);
        }
        let image = generator.generate_image(request).await?;

        self.finish_image_turn(&session, None, image, purpose).await
    }

    /// Refine a previously generated image based on feedback.
    ///
    /// An explicit `image_id` must belong to the session; without one the
    /// session's latest image is refined. When the session has no image
    /// at all the generator reports `NoPriorImage` after the user message
    /// is already persisted, like any other turn failure.
    pub async fn refine(&self, turn: RefineTurn) -> Result<TurnOutcome, ChatError> {
        validate_text("feedback", &turn.feedback)?;
        let generator = self.generator()?;
        let session = self.require_session(&turn.session_id).await?;

        let previous_url = self
            .resolve_previous_image(&session, turn.image_id.as_ref())
            .await?;

        let user_message = ChatMessage::user_text(turn.session_id, turn.feedback.clone());
        self.store.append_user_message(&user_message).await?;

        let mut request = RefineRequest::new(turn.session_id, turn.feedback, session.purpose());
        if let Some(url) = previous_url {
            request = request.with_previous_image_url(url);
        }
        let image = generator.refine_image(request).await?;

        self.finish_image_turn(&session, None, image, session.purpose())
            .await
    }

    /// Mixed-mode turn: the model may answer with text, an image, or both.
    pub async fn converse(&self, turn: ConverseTurn) -> Result<TurnOutcome, ChatError> {
        validate_text("message", &turn.message)?;
        let generator = self.generator()?;
        let session = self.require_session(&turn.session_id).await?;

        let purpose = turn.purpose.unwrap_or(session.purpose());
        let style = turn.style.or(session.style());

        let user_message = ChatMessage::user_text(turn.session_id, turn.message.clone());
        self.store.append_user_message(&user_message).await?;

        let mut request = ConverseRequest::new(turn.session_id, turn.message, purpose);
        if let Some(style) = style {
            request = request.with_style(style);
        }
        if let Some(url) = session.final_image_url() {
            request = request.with_previous_image_url(url.to_string());
        }
        let reply = generator.converse(request).await?;

        match reply.image {
            Some(image) => {
                self.finish_image_turn(&session, reply.text, image, purpose)
                    .await
            }
            None => {
                let text = reply.text.ok_or_else(|| {
                    ChatError::generation("Model reply contained neither text nor image")
                })?;
                let message =
                    ChatMessage::assistant_text(turn.session_id, text, reply.tokens_used);
                self.store
                    .record_assistant_turn(&AssistantTurn::text(message.clone(), reply.tokens_used))
                    .await?;
                Ok(TurnOutcome {
                    message,
                    image: None,
                })
            }
        }
    }

    fn generator(&self) -> Result<&Arc<dyn ImageGenerator>, ChatError> {
        self.generator
            .as_ref()
            .ok_or(ChatError::GeneratorUnavailable)
    }

    async fn require_session(&self, id: &SessionId) -> Result<ChatSession, ChatError> {
        self.store
            .find_session(id)
            .await?
            .ok_or(ChatError::NotFound(*id))
    }

    /// Resolve which image a refinement applies to.
    async fn resolve_previous_image(
        &self,
        session: &ChatSession,
        image_id: Option<&ImageId>,
    ) -> Result<Option<String>, ChatError> {
        match image_id {
            Some(id) => {
                let record = self
                    .store
                    .find_image(id)
                    .await?
                    // An image from another session is as good as missing
                    .filter(|record| record.session_id == *session.id())
                    .ok_or(ChatError::ImageNotFound(*id))?;
                Ok(Some(record.image_url))
            }
            None => Ok(session.final_image_url().map(str::to_string)),
        }
    }

    /// Publish the image, then persist the assistant message and image
    /// record in one store transaction.
    async fn finish_image_turn(
        &self,
        session: &ChatSession,
        text: Option<String>,
        image: GeneratedImage,
        purpose: ImagePurpose,
    ) -> Result<TurnOutcome, ChatError> {
        let url = self.publish_image(&image).await?;

        let metadata = generation_metadata(&image, purpose);
        let message = ChatMessage::assistant_image(
            *session.id(),
            text,
            url.clone(),
            Some(metadata),
            image.generation_time_ms as i64,
            image.tokens_used,
        );
        let record = GeneratedImageRecord::new(
            *session.id(),
            message.id,
            url,
            image.width.map(|w| w as i32),
            image.height.map(|h| h as i32),
            image.format().map(str::to_string),
            image.prompt_used.clone(),
            image.model_used.clone(),
            purpose,
            image.estimated_cost_usd,
        );
        self.store
            .record_assistant_turn(&AssistantTurn::with_image(
                message.clone(),
                record.clone(),
                image.tokens_used,
            ))
            .await?;

        Ok(TurnOutcome {
            message,
            image: Some(record),
        })
    }

    /// Upload through the file store when one is configured; otherwise the
    /// image travels inline as a data URL.
    async fn publish_image(&self, image: &GeneratedImage) -> Result<String, ChatError> {
        match &self.file_store {
            Some(store) => {
                let extension = image.format().unwrap_or("png");
                let filename = format!("brand-atelier-{}.{}", uuid::Uuid::new_v4(), extension);
                let request =
                    UploadRequest::new(image.bytes.clone(), filename, image.mime_type.clone())
                        .with_alt(image.prompt_used.clone());
                let stored = store.upload_image(request).await?;
                Ok(stored.url)
            }
            None => Ok(image.data_url()),
        }
    }
}

fn validate_text(field: &'static str, value: &str) -> Result<(), ChatError> {
    if value.trim().is_empty() {
        return Err(ChatError::validation(field, "must not be empty"));
    }
    if value.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(ChatError::validation(
            field,
            format!("must be at most {MAX_MESSAGE_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn generation_metadata(image: &GeneratedImage, purpose: ImagePurpose) -> serde_json::Value {
    serde_json::json!({
        "model": image.model_used,
        "purpose": purpose.as_str(),
        "aspect_ratio": purpose.aspect_ratio(),
        "prompt": image.prompt_used,
        "tokens_used": image.tokens_used,
        "estimated_cost_usd": image.estimated_cost_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::session::MessageRole;
    use crate::ports::{
        ChatReply, ConverseReply, GenerationError, SessionFilter, SessionPage, StoreError,
        StoredFile, UploadError,
    };
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
    use base64::Engine;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // === Mocks ===

    #[derive(Default)]
    struct MockStore {
        sessions: Mutex<HashMap<SessionId, ChatSession>>,
        messages: Mutex<Vec<ChatMessage>>,
        images: Mutex<Vec<GeneratedImageRecord>>,
    }

    impl MockStore {
        fn seed_session(&self, session: &ChatSession) {
            self.sessions
                .lock()
                .unwrap()
                .insert(*session.id(), session.clone());
        }

        fn seed_image(&self, record: &GeneratedImageRecord) {
            self.images.lock().unwrap().push(record.clone());
        }

        fn messages(&self) -> Vec<ChatMessage> {
            self.messages.lock().unwrap().clone()
        }

        fn image_count(&self) -> usize {
            self.images.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatStore for MockStore {
        async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError> {
            self.seed_session(session);
            Ok(())
        }

        async fn find_session(&self, id: &SessionId) -> Result<Option<ChatSession>, StoreError> {
            Ok(self.sessions.lock().unwrap().get(id).cloned())
        }

        async fn list_sessions(&self, _filter: SessionFilter) -> Result<SessionPage, StoreError> {
            Ok(SessionPage {
                sessions: vec![],
                total: 0,
            })
        }

        async fn delete_session(&self, id: &SessionId) -> Result<bool, StoreError> {
            Ok(self.sessions.lock().unwrap().remove(id).is_some())
        }

        async fn list_messages(
            &self,
            session_id: &SessionId,
        ) -> Result<Vec<ChatMessage>, StoreError> {
            Ok(self
                .messages()
                .into_iter()
                .filter(|m| m.session_id == *session_id)
                .collect())
        }

        async fn append_user_message(&self, message: &ChatMessage) -> Result<(), StoreError> {
            if !self
                .sessions
                .lock()
                .unwrap()
                .contains_key(&message.session_id)
            {
                return Err(StoreError::SessionNotFound(message.session_id));
            }
            self.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn record_assistant_turn(&self, turn: &AssistantTurn) -> Result<(), StoreError> {
            if !self
                .sessions
                .lock()
                .unwrap()
                .contains_key(&turn.message.session_id)
            {
                return Err(StoreError::SessionNotFound(turn.message.session_id));
            }
            self.messages.lock().unwrap().push(turn.message.clone());
            if let Some(image) = &turn.image {
                self.images.lock().unwrap().push(image.clone());
            }
            Ok(())
        }

        async fn find_image(
            &self,
            id: &ImageId,
        ) -> Result<Option<GeneratedImageRecord>, StoreError> {
            Ok(self
                .images
                .lock()
                .unwrap()
                .iter()
                .find(|r| r.id == *id)
                .cloned())
        }
    }

    #[derive(Default)]
    struct MockGenerator {
        generate_requests: Mutex<Vec<GenerateRequest>>,
        refine_requests: Mutex<Vec<RefineRequest>>,
        converse_requests: Mutex<Vec<ConverseRequest>>,
        converse_reply: Mutex<Option<ConverseReply>>,
        fail_generation: bool,
    }

    impl MockGenerator {
        fn failing() -> Self {
            Self {
                fail_generation: true,
                ..Self::default()
            }
        }

        fn script_converse(&self, reply: ConverseReply) {
            *self.converse_reply.lock().unwrap() = Some(reply);
        }

        fn last_generate(&self) -> GenerateRequest {
            self.generate_requests.lock().unwrap().last().unwrap().clone()
        }

        fn last_refine(&self) -> RefineRequest {
            self.refine_requests.lock().unwrap().last().unwrap().clone()
        }

        fn last_converse(&self) -> ConverseRequest {
            self.converse_requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageGenerator for MockGenerator {
        async fn generate_image(
            &self,
            request: GenerateRequest,
        ) -> Result<GeneratedImage, GenerationError> {
            let prompt = request.prompt.clone();
            self.generate_requests.lock().unwrap().push(request);
            if self.fail_generation {
                return Err(GenerationError::generation_failed("Simulated failure"));
            }
            Ok(test_image(&prompt))
        }

        async fn refine_image(
            &self,
            request: RefineRequest,
        ) -> Result<GeneratedImage, GenerationError> {
            let feedback = request.feedback.clone();
            let previous = request.previous_image_url.clone();
            self.refine_requests.lock().unwrap().push(request);
            if previous.is_none() {
                return Err(GenerationError::NoPriorImage);
            }
            Ok(test_image(&feedback))
        }

        async fn chat(&self, _request: ChatRequest) -> Result<ChatReply, GenerationError> {
            Ok(ChatReply {
                text: "A warm palette would suit a spring campaign.".to_string(),
                model_used: "mock-model".to_string(),
                tokens_used: 64,
            })
        }

        async fn converse(
            &self,
            request: ConverseRequest,
        ) -> Result<ConverseReply, GenerationError> {
            self.converse_requests.lock().unwrap().push(request);
            let scripted = self.converse_reply.lock().unwrap().clone();
            Ok(scripted.unwrap_or(ConverseReply {
                text: Some("Let's talk palettes first.".to_string()),
                image: None,
                model_used: "mock-model".to_string(),
                tokens_used: 42,
            }))
        }

        async fn clear_session(&self, _session_id: &SessionId) {}

        fn model_id(&self) -> &str {
            "mock-model"
        }
    }

    #[derive(Default)]
    struct MockFileStore {
        requests: Mutex<Vec<UploadRequest>>,
        fail: bool,
    }

    impl MockFileStore {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn last_request(&self) -> UploadRequest {
            self.requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl FileStore for MockFileStore {
        async fn upload_image(&self, request: UploadRequest) -> Result<StoredFile, UploadError> {
            self.requests.lock().unwrap().push(request);
            if self.fail {
                return Err(UploadError::upload_failed("Simulated target failure"));
            }
            Ok(StoredFile {
                url: "https://cdn.shopify.com/files/mock.png".to_string(),
                file_id: Some("gid://shopify/MediaImage/1".to_string()),
            })
        }
    }

    fn test_image(prompt: &str) -> GeneratedImage {
        let bytes = vec![0x89, 0x50, 0x4E, 0x47];
        GeneratedImage {
            base64_data: BASE64_STANDARD.encode(&bytes),
            bytes,
            mime_type: "image/png".to_string(),
            prompt_used: prompt.to_string(),
            model_used: "mock-model".to_string(),
            width: Some(1080),
            height: Some(1080),
            generation_time_ms: 1200,
            tokens_used: 257,
            estimated_cost_usd: 0.04,
        }
    }

    fn session_with(purpose: ImagePurpose, style: Option<StylePreset>) -> ChatSession {
        ChatSession::new(SessionId::new(), None, purpose, style, None).unwrap()
    }

    fn orchestrator(
        store: Arc<MockStore>,
        generator: Option<Arc<MockGenerator>>,
        file_store: Option<Arc<MockFileStore>>,
    ) -> TurnOrchestrator {
        TurnOrchestrator::new(
            store,
            generator.map(|g| g as Arc<dyn ImageGenerator>),
            file_store.map(|f| f as Arc<dyn FileStore>),
        )
    }

    // === Chat ===

    #[tokio::test]
    async fn chat_persists_both_sides_of_the_turn() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let outcome = orchestrator
            .chat(ChatTurn {
                session_id: *session.id(),
                message: "What colors work for spring?".to_string(),
            })
            .await
            .unwrap();

        let messages = store.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert!(outcome.image.is_none());
        assert_eq!(
            outcome.message.text_content.as_deref(),
            Some("A warm palette would suit a spring campaign.")
        );
    }

    #[tokio::test]
    async fn chat_without_a_generator_fails_before_any_writes() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), None, None);

        let result = orchestrator
            .chat(ChatTurn {
                session_id: *session.id(),
                message: "Hello".to_string(),
            })
            .await;

        assert_eq!(result.unwrap_err(), ChatError::GeneratorUnavailable);
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn chat_with_a_missing_session_is_not_found() {
        let store = Arc::new(MockStore::default());
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let id = SessionId::new();
        let result = orchestrator
            .chat(ChatTurn {
                session_id: id,
                message: "Hello".to_string(),
            })
            .await;

        assert_eq!(result.unwrap_err(), ChatError::NotFound(id));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn blank_message_is_rejected_before_any_writes() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let result = orchestrator
            .chat(ChatTurn {
                session_id: *session.id(),
                message: "   ".to_string(),
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            ChatError::ValidationFailed { .. }
        ));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn oversized_message_is_rejected() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let result = orchestrator
            .chat(ChatTurn {
                session_id: *session.id(),
                message: "x".repeat(MAX_MESSAGE_LENGTH + 1),
            })
            .await;

        assert!(matches!(
            result.unwrap_err(),
            ChatError::ValidationFailed { .. }
        ));
    }

    // === Generate ===

    #[tokio::test]
    async fn generate_uploads_via_the_file_store() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let uploader = Arc::new(MockFileStore::default());
        let orchestrator = orchestrator(
            store.clone(),
            Some(Arc::new(MockGenerator::default())),
            Some(uploader.clone()),
        );

        let outcome = orchestrator
            .generate(GenerateTurn {
                session_id: *session.id(),
                prompt: "A spring banner".to_string(),
                purpose: None,
                style: None,
            })
            .await
            .unwrap();

        let record = outcome.image.unwrap();
        assert_eq!(record.image_url, "https://cdn.shopify.com/files/mock.png");
        assert_eq!(
            outcome.message.image_url.as_deref(),
            Some("https://cdn.shopify.com/files/mock.png")
        );

        let upload = uploader.last_request();
        assert!(upload.filename.starts_with("brand-atelier-"));
        assert!(upload.filename.ends_with(".png"));
        assert_eq!(upload.mime_type, "image/png");
        assert!(upload.alt.as_deref().unwrap().contains("spring banner"));
    }

    #[tokio::test]
    async fn generate_without_a_file_store_inlines_a_data_url() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let outcome = orchestrator
            .generate(GenerateTurn {
                session_id: *session.id(),
                prompt: "A spring banner".to_string(),
                purpose: None,
                style: None,
            })
            .await
            .unwrap();

        let record = outcome.image.unwrap();
        assert!(record.image_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn upload_failure_fails_the_turn_but_keeps_the_user_message() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(
            store.clone(),
            Some(Arc::new(MockGenerator::default())),
            Some(Arc::new(MockFileStore::failing())),
        );

        let result = orchestrator
            .generate(GenerateTurn {
                session_id: *session.id(),
                prompt: "A spring banner".to_string(),
                purpose: None,
                style: None,
            })
            .await;

        assert!(matches!(result.unwrap_err(), ChatError::Upload(_)));
        let messages = store.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(store.image_count(), 0);
    }

    #[tokio::test]
    async fn generation_failure_keeps_the_user_message() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::failing())), None);

        let result = orchestrator
            .generate(GenerateTurn {
                session_id: *session.id(),
                prompt: "A spring banner".to_string(),
                purpose: None,
                style: None,
            })
            .await;

        assert!(matches!(result.unwrap_err(), ChatError::Generation(_)));
        assert_eq!(store.messages().len(), 1);
    }

    #[tokio::test]
    async fn turn_overrides_reach_the_generator() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, Some(StylePreset::Minimal));
        store.seed_session(&session);
        let generator = Arc::new(MockGenerator::default());
        let orchestrator = orchestrator(store.clone(), Some(generator.clone()), None);

        orchestrator
            .generate(GenerateTurn {
                session_id: *session.id(),
                prompt: "A web banner".to_string(),
                purpose: Some(ImagePurpose::BannerWeb),
                style: Some(StylePreset::Tech),
            })
            .await
            .unwrap();

        let request = generator.last_generate();
        assert_eq!(request.purpose, ImagePurpose::BannerWeb);
        assert_eq!(request.style, Some(StylePreset::Tech));
        assert_eq!(request.session_id, Some(*session.id()));
    }

    #[tokio::test]
    async fn session_defaults_apply_without_overrides() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::BannerMobile, Some(StylePreset::Vibrant));
        store.seed_session(&session);
        let generator = Arc::new(MockGenerator::default());
        let orchestrator = orchestrator(store.clone(), Some(generator.clone()), None);

        let outcome = orchestrator
            .generate(GenerateTurn {
                session_id: *session.id(),
                prompt: "A mobile banner".to_string(),
                purpose: None,
                style: None,
            })
            .await
            .unwrap();

        let request = generator.last_generate();
        assert_eq!(request.purpose, ImagePurpose::BannerMobile);
        assert_eq!(request.style, Some(StylePreset::Vibrant));
        assert_eq!(
            outcome.image.unwrap().image_purpose,
            ImagePurpose::BannerMobile
        );
    }

    // === Refine ===

    #[tokio::test]
    async fn refine_uses_the_explicitly_named_image() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let record = GeneratedImageRecord::new(
            *session.id(),
            crate::domain::foundation::MessageId::new(),
            "https://cdn.example/chosen.png",
            Some(1080),
            Some(1080),
            Some("png".to_string()),
            "A banner",
            "mock-model",
            ImagePurpose::SnsInstagramSquare,
            0.04,
        );
        store.seed_image(&record);
        let generator = Arc::new(MockGenerator::default());
        let orchestrator = orchestrator(store.clone(), Some(generator.clone()), None);

        orchestrator
            .refine(RefineTurn {
                session_id: *session.id(),
                feedback: "Make it warmer".to_string(),
                image_id: Some(record.id),
            })
            .await
            .unwrap();

        let request = generator.last_refine();
        assert_eq!(
            request.previous_image_url.as_deref(),
            Some("https://cdn.example/chosen.png")
        );
    }

    #[tokio::test]
    async fn refine_falls_back_to_the_latest_session_image() {
        let store = Arc::new(MockStore::default());
        let mut session = session_with(ImagePurpose::SnsInstagramSquare, None);
        session.count_image("https://cdn.example/latest.png");
        store.seed_session(&session);
        let generator = Arc::new(MockGenerator::default());
        let orchestrator = orchestrator(store.clone(), Some(generator.clone()), None);

        orchestrator
            .refine(RefineTurn {
                session_id: *session.id(),
                feedback: "Make it warmer".to_string(),
                image_id: None,
            })
            .await
            .unwrap();

        let request = generator.last_refine();
        assert_eq!(
            request.previous_image_url.as_deref(),
            Some("https://cdn.example/latest.png")
        );
        assert_eq!(request.purpose, ImagePurpose::SnsInstagramSquare);
    }

    #[tokio::test]
    async fn refine_with_an_unknown_image_id_is_image_not_found() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let id = ImageId::new();
        let result = orchestrator
            .refine(RefineTurn {
                session_id: *session.id(),
                feedback: "Make it warmer".to_string(),
                image_id: Some(id),
            })
            .await;

        assert_eq!(result.unwrap_err(), ChatError::ImageNotFound(id));
        assert!(store.messages().is_empty());
    }

    #[tokio::test]
    async fn refine_rejects_an_image_from_another_session() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let other = session_with(ImagePurpose::BannerWeb, None);
        let foreign = GeneratedImageRecord::new(
            *other.id(),
            crate::domain::foundation::MessageId::new(),
            "https://cdn.example/foreign.png",
            None,
            None,
            None,
            "A banner",
            "mock-model",
            ImagePurpose::BannerWeb,
            0.04,
        );
        store.seed_image(&foreign);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let result = orchestrator
            .refine(RefineTurn {
                session_id: *session.id(),
                feedback: "Make it warmer".to_string(),
                image_id: Some(foreign.id),
            })
            .await;

        assert_eq!(result.unwrap_err(), ChatError::ImageNotFound(foreign.id));
    }

    #[tokio::test]
    async fn refine_without_any_image_fails_after_the_user_message() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let result = orchestrator
            .refine(RefineTurn {
                session_id: *session.id(),
                feedback: "Make it warmer".to_string(),
                image_id: None,
            })
            .await;

        assert_eq!(result.unwrap_err(), ChatError::NoPriorImage);
        // The ask is preserved even though nothing could be refined
        assert_eq!(store.messages().len(), 1);
    }

    // === Converse ===

    #[tokio::test]
    async fn converse_text_reply_persists_as_a_text_message() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let orchestrator = orchestrator(store.clone(), Some(Arc::new(MockGenerator::default())), None);

        let outcome = orchestrator
            .converse(ConverseTurn {
                session_id: *session.id(),
                message: "What would you suggest?".to_string(),
                purpose: None,
                style: None,
            })
            .await
            .unwrap();

        assert!(outcome.image.is_none());
        assert_eq!(
            outcome.message.text_content.as_deref(),
            Some("Let's talk palettes first.")
        );
        assert_eq!(store.messages().len(), 2);
    }

    #[tokio::test]
    async fn converse_image_reply_persists_message_and_record() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let generator = Arc::new(MockGenerator::default());
        generator.script_converse(ConverseReply {
            text: Some("Here is a first draft.".to_string()),
            image: Some(test_image("A spring banner")),
            model_used: "mock-model".to_string(),
            tokens_used: 300,
        });
        let orchestrator = orchestrator(store.clone(), Some(generator), None);

        let outcome = orchestrator
            .converse(ConverseTurn {
                session_id: *session.id(),
                message: "Show me something".to_string(),
                purpose: None,
                style: None,
            })
            .await
            .unwrap();

        let record = outcome.image.unwrap();
        assert_eq!(record.image_purpose, ImagePurpose::SnsInstagramSquare);
        assert_eq!(
            outcome.message.text_content.as_deref(),
            Some("Here is a first draft.")
        );
        assert!(outcome.message.image_url.is_some());
        assert_eq!(store.image_count(), 1);
    }

    #[tokio::test]
    async fn converse_forwards_the_sessions_latest_image() {
        let store = Arc::new(MockStore::default());
        let mut session = session_with(ImagePurpose::SnsInstagramSquare, None);
        session.count_image("https://cdn.example/latest.png");
        store.seed_session(&session);
        let generator = Arc::new(MockGenerator::default());
        let orchestrator = orchestrator(store.clone(), Some(generator.clone()), None);

        orchestrator
            .converse(ConverseTurn {
                session_id: *session.id(),
                message: "Tweak the last one".to_string(),
                purpose: None,
                style: None,
            })
            .await
            .unwrap();

        let request = generator.last_converse();
        assert_eq!(
            request.previous_image_url.as_deref(),
            Some("https://cdn.example/latest.png")
        );
    }

    #[tokio::test]
    async fn converse_empty_reply_is_a_generation_error() {
        let store = Arc::new(MockStore::default());
        let session = session_with(ImagePurpose::SnsInstagramSquare, None);
        store.seed_session(&session);
        let generator = Arc::new(MockGenerator::default());
        generator.script_converse(ConverseReply {
            text: None,
            image: None,
            model_used: "mock-model".to_string(),
            tokens_used: 0,
        });
        let orchestrator = orchestrator(store.clone(), Some(generator), None);

        let result = orchestrator
            .converse(ConverseTurn {
                session_id: *session.id(),
                message: "Show me something".to_string(),
                purpose: None,
                style: None,
            })
            .await;

        assert!(matches!(result.unwrap_err(), ChatError::Generation(_)));
    }
}
