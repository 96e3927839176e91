//! External capabilities consumed by the pipeline.
//!
//! Each capability is an object-safe async trait so the pipeline can hold `Arc<dyn ...>`
//! implementations chosen at startup. Adapters contain no decision logic: ordering, fallback
//! and error recovery all live in [`crate::pipeline`] and [`crate::enrichment`].

pub mod error;
pub mod gemini;
pub mod index;
pub mod narrative;
pub mod ocr;
pub mod places;
pub mod search;
pub mod vision;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

pub use error::{ProviderError, ProviderResult};
pub use gemini::GeminiClient;
pub use index::EmptyLandmarkIndex;
pub use narrative::GenaiNarrator;
pub use ocr::{DisabledOcr, GeminiOcr};
pub use places::GooglePlaces;
pub use search::HttpWebSearcher;
pub use vision::GeminiVision;

#[cfg(any(test, feature = "mock"))]
pub use mock::{
    CallJournal, MockLandmarkIndex, MockNarrator, MockPlaceLookup, MockProviders,
    MockTextRecognizer, MockVisionRecognizer, MockWebSearcher, RecordedQuery,
};

use crate::config::Config;
use crate::model::{Candidate, EnrichedPlace, PlaceRecord, SourceSummary};

/// Multimodal recognizer: image plus instruction prompt to candidates.
#[async_trait]
pub trait VisionRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8], prompt: &str) -> ProviderResult<Vec<Candidate>>;
}

/// OCR. Empty text is a valid result.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn extract_text(&self, image: &[u8]) -> ProviderResult<String>;
}

/// Prebuilt visual index of known landmarks.
#[async_trait]
pub trait LandmarkIndex: Send + Sync {
    /// `hint` is OCR text; implementations may use it to break ties but must not filter on it.
    async fn search(
        &self,
        image: &[u8],
        hint: Option<&str>,
        top_k: usize,
    ) -> ProviderResult<Vec<Candidate>>;
}

/// Arguments for a structured place lookup.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlaceQuery<'a> {
    pub name: Option<&'a str>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl<'a> PlaceQuery<'a> {
    pub fn for_candidate(candidate: &'a Candidate) -> Self {
        Self {
            name: candidate.usable_name(),
            lat: candidate.lat,
            lng: candidate.lng,
        }
    }

    #[inline]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }
}

/// Structured place lookup by name and/or coordinates.
///
/// Results are in provider order; the first one is treated as authoritative.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    async fn lookup(&self, query: PlaceQuery<'_>) -> ProviderResult<Vec<PlaceRecord>>;
}

/// Web search followed by per-page summarization.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search_and_summarize(
        &self,
        query: &str,
        top_k: usize,
    ) -> ProviderResult<Vec<SourceSummary>>;
}

/// Everything the narrator sees.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NarrativeContext<'a> {
    pub candidates: &'a [Candidate],
    pub place: Option<&'a EnrichedPlace>,
    pub places: &'a [PlaceRecord],
    pub sources: &'a [SourceSummary],
}

/// Narrative summary generator.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn narrate(&self, context: NarrativeContext<'_>) -> ProviderResult<String>;
}

/// Capability with no configured backend. Every call fails with
/// [`ProviderError::NotConfigured`].
#[derive(Debug, Clone, Copy)]
pub struct Unconfigured {
    pub provider: &'static str,
}

impl Unconfigured {
    pub const fn new(provider: &'static str) -> Self {
        Self { provider }
    }

    fn error(&self) -> ProviderError {
        ProviderError::NotConfigured {
            provider: self.provider,
        }
    }
}

#[async_trait]
impl VisionRecognizer for Unconfigured {
    async fn recognize(&self, _image: &[u8], _prompt: &str) -> ProviderResult<Vec<Candidate>> {
        Err(self.error())
    }
}

#[async_trait]
impl PlaceLookup for Unconfigured {
    async fn lookup(&self, _query: PlaceQuery<'_>) -> ProviderResult<Vec<PlaceRecord>> {
        Err(self.error())
    }
}

#[async_trait]
impl Narrator for Unconfigured {
    async fn narrate(&self, _context: NarrativeContext<'_>) -> ProviderResult<String> {
        Err(self.error())
    }
}

/// The full set of capabilities used by one pipeline.
#[derive(Clone)]
pub struct Providers {
    pub vision: Arc<dyn VisionRecognizer>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub index: Arc<dyn LandmarkIndex>,
    pub places: Arc<dyn PlaceLookup>,
    pub search: Arc<dyn WebSearcher>,
    pub narrator: Arc<dyn Narrator>,
}

impl Providers {
    /// Builds real adapters for every capability with credentials in `config`.
    ///
    /// Missing credentials produce [`Unconfigured`] (or the empty OCR/index stand-ins) rather
    /// than an error, so the service always starts and degrades through its fallbacks.
    pub fn from_config(config: &Config) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.provider_timeout)
            .build()?;

        let (vision, ocr): (Arc<dyn VisionRecognizer>, Arc<dyn TextRecognizer>) =
            match &config.gemini_api_key {
                Some(key) => {
                    let gemini = GeminiClient::new(http.clone(), key.clone(), &config.vision_model);
                    (
                        Arc::new(GeminiVision::new(gemini.clone())),
                        Arc::new(GeminiOcr::new(gemini)),
                    )
                }
                None => {
                    info!("no Gemini API key; vision recognizer disabled and OCR returns no text");
                    (Arc::new(Unconfigured::new("vision")), Arc::new(DisabledOcr))
                }
            };

        let places: Arc<dyn PlaceLookup> = match &config.maps_api_key {
            Some(key) => Arc::new(GooglePlaces::new(http.clone(), key.clone())),
            None => {
                info!("no Maps API key; place lookup disabled");
                Arc::new(Unconfigured::new("places"))
            }
        };

        let search: Arc<dyn WebSearcher> = Arc::new(HttpWebSearcher::from_config(http, config));

        let narrator: Arc<dyn Narrator> = match &config.narrative_model {
            Some(model) => Arc::new(GenaiNarrator::new(model.clone())),
            None => Arc::new(Unconfigured::new("narrator")),
        };

        Ok(Self {
            vision,
            ocr,
            index: Arc::new(EmptyLandmarkIndex),
            places,
            search,
            narrator,
        })
    }
}

impl std::fmt::Debug for Providers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Providers").finish_non_exhaustive()
    }
}

/// Runs a provider call under `timeout`; an elapsed timeout becomes [`ProviderError::Timeout`].
pub async fn with_timeout<T, F>(
    provider: &'static str,
    timeout: Duration,
    call: F,
) -> ProviderResult<T>
where
    F: Future<Output = ProviderResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout {
            provider,
            timeout,
        }),
    }
}
