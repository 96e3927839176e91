//! Gemini multimodal landmark recognizer.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::error::{ProviderError, ProviderResult};
use super::gemini::{GeminiClient, ResponseMode, strip_code_fence};
use super::VisionRecognizer;
use crate::model::Candidate;

#[derive(Debug, Clone)]
pub struct GeminiVision {
    client: GeminiClient,
}

impl GeminiVision {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VisionRecognizer for GeminiVision {
    #[instrument(skip_all, fields(model = %self.client.model()))]
    async fn recognize(&self, image: &[u8], prompt: &str) -> ProviderResult<Vec<Candidate>> {
        let text = self
            .client
            .generate(prompt, image, ResponseMode::Json)
            .await?
            .ok_or_else(|| {
                ProviderError::MalformedResponse(
                    "Gemini response contained no text part".to_string(),
                )
            })?;
        let candidates = parse_candidates(&text)?;
        debug!(count = candidates.len(), "vision candidates parsed");
        Ok(candidates)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CandidatePayload {
    Wrapped {
        #[serde(default)]
        candidates: Vec<Candidate>,
    },
    Bare(Vec<Candidate>),
}

/// Parses the model answer: `{"candidates": [...]}` or a bare array, optionally fenced.
///
/// Confidences are clamped to `[0, 1]`; non-finite values are dropped.
pub fn parse_candidates(text: &str) -> ProviderResult<Vec<Candidate>> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Ok(Vec::new());
    }
    let payload: CandidatePayload = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("vision candidates: {e}")))?;
    let mut candidates = match payload {
        CandidatePayload::Wrapped { candidates } => candidates,
        CandidatePayload::Bare(candidates) => candidates,
    };
    for candidate in &mut candidates {
        candidate.confidence = candidate
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.clamp(0.0, 1.0));
    }
    Ok(candidates)
}
