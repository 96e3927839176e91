use async_trait::async_trait;
use genai::Client;
use genai::chat::{ChatMessage, ChatRequest};
use tracing::{error, instrument};

use super::error::{ProviderError, ProviderResult};
use super::{NarrativeContext, Narrator};

const SYSTEM_PROMPT: &str = "You write short, factual travel notes. Using only the JSON context \
provided, describe the identified place in at most four sentences: what it is, where it is, and \
any practical details (opening hours, tickets) present in the context. Do not invent facts.";

/// Narrative summary through any `genai`-supported chat model.
pub struct GenaiNarrator {
    client: Client,
    model: String,
}

impl GenaiNarrator {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::default(),
            model: model.into(),
        }
    }
}

impl std::fmt::Debug for GenaiNarrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiNarrator")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Narrator for GenaiNarrator {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn narrate(&self, context: NarrativeContext<'_>) -> ProviderResult<String> {
        let payload = serde_json::to_string(&context)
            .map_err(|e| ProviderError::Generation(format!("context serialization: {e}")))?;

        let request = ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(payload),
        ]);

        let response = self
            .client
            .exec_chat(&self.model, request, None)
            .await
            .map_err(|e| {
                error!("narrative provider error: {}", e);
                ProviderError::Generation(e.to_string())
            })?;

        let text = response.first_text().unwrap_or_default().trim().to_string();
        if text.is_empty() {
            return Err(ProviderError::Generation("empty narrative".to_string()));
        }
        Ok(text)
    }
}
