use async_trait::async_trait;
use tracing::instrument;

use super::TextRecognizer;
use super::error::ProviderResult;
use super::gemini::{GeminiClient, ResponseMode};
use crate::constants::OCR_PROMPT;

/// OCR stand-in when no backend is configured: always returns empty text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledOcr;

#[async_trait]
impl TextRecognizer for DisabledOcr {
    async fn extract_text(&self, _image: &[u8]) -> ProviderResult<String> {
        Ok(String::new())
    }
}

/// OCR through a Gemini transcription prompt.
#[derive(Debug, Clone)]
pub struct GeminiOcr {
    client: GeminiClient,
}

impl GeminiOcr {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TextRecognizer for GeminiOcr {
    #[instrument(skip_all, fields(model = %self.client.model()))]
    async fn extract_text(&self, image: &[u8]) -> ProviderResult<String> {
        let text = self
            .client
            .generate(OCR_PROMPT, image, ResponseMode::Text)
            .await?
            .unwrap_or_default();
        Ok(text.trim().to_string())
    }
}
