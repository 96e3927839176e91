//! The identification pipeline.
//!
//! One call to [`IdentifyPipeline::identify`] runs:
//!
//! 1. input validation,
//! 2. the result cache probe (a hit returns the stored envelope unchanged),
//! 3. [`CandidateSourcing`] (vision, then OCR plus local index, then web-only search),
//! 4. [`rank_candidates`](crate::ranking::rank_candidates),
//! 5. [`EnrichmentResolver`] (place lookup and per-candidate web search),
//! 6. [`ResponseAssembler`] (narrative, envelope, cache write).
//!
//! Provider failures never reach the caller. Only malformed input does.

pub mod assembler;
pub mod error;
pub mod sourcing;

#[cfg(test)]
mod tests;

pub use assembler::{ResponseAssembler, fallback_summary};
pub use error::{PipelineError, PipelineResult};
pub use sourcing::{CandidateSourcing, SourcingOutcome, SourcingState};

use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::cache::{CacheStatus, ResultCache};
use crate::config::Config;
use crate::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PROVIDER_TIMEOUT_SECS, cache_key};
use crate::enrichment::EnrichmentResolver;
use crate::model::{IdentifyRequest, ResponseEnvelope};
use crate::providers::Providers;
use crate::ranking::rank_candidates;
use crate::trace::DecisionLog;

/// Knobs that change pipeline decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineSettings {
    pub use_vision: bool,
    pub confidence_threshold: f32,
    pub provider_timeout: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            use_vision: true,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            use_vision: config.use_vision,
            confidence_threshold: config.confidence_threshold,
            provider_timeout: config.provider_timeout,
        }
    }
}

/// Result of one `identify` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub envelope: ResponseEnvelope,
    pub status: CacheStatus,
}

impl Identification {
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.status.is_hit()
    }
}

/// Cloneable pipeline handle; clones share providers and cache.
#[derive(Clone)]
pub struct IdentifyPipeline {
    providers: Providers,
    cache: ResultCache,
    settings: PipelineSettings,
}

impl IdentifyPipeline {
    pub fn new(providers: Providers, cache: ResultCache, settings: PipelineSettings) -> Self {
        Self {
            providers,
            cache,
            settings,
        }
    }

    pub fn from_config(providers: Providers, cache: ResultCache, config: &Config) -> Self {
        Self::new(providers, cache, PipelineSettings::from_config(config))
    }

    #[inline]
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    #[inline]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Identifies the place shown in `request.image`.
    ///
    /// Fails only on invalid input. A cache hit returns the previously stored envelope without
    /// calling any provider.
    #[instrument(skip_all, fields(image_id = %request.image_id, bytes = request.image.len()))]
    pub async fn identify(&self, request: IdentifyRequest) -> PipelineResult<Identification> {
        validate(&request)?;

        let key = cache_key(&request.image_id);
        if let Some(envelope) = self.cache.get(&key) {
            debug!("result cache hit");
            return Ok(Identification {
                envelope,
                status: CacheStatus::Hit,
            });
        }

        let mut log = DecisionLog::new();
        let timeout = self.settings.provider_timeout;

        let sourcing = CandidateSourcing::new(&self.providers, self.settings.use_vision, timeout)
            .run(&request, &mut log)
            .await;

        let ranked = rank_candidates(sourcing.candidates);

        let resolution = EnrichmentResolver::new(
            self.providers.places.clone(),
            self.providers.search.clone(),
        )
        .with_threshold(self.settings.confidence_threshold)
        .with_timeout(timeout)
        .resolve(&ranked, &mut log)
        .await;

        let envelope = ResponseAssembler::new(
            self.providers.narrator.clone(),
            self.cache.clone(),
            timeout,
        )
        .assemble(
            &request.image_id,
            ranked,
            resolution,
            sourcing.web_hits,
            log,
        )
        .await;

        info!(
            candidates = envelope.candidates.len(),
            place = envelope.place.as_ref().and_then(|p| p.display_name()),
            "identification complete"
        );
        Ok(Identification {
            envelope,
            status: CacheStatus::Miss,
        })
    }
}

impl std::fmt::Debug for IdentifyPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifyPipeline")
            .field("cache", &self.cache)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn validate(request: &IdentifyRequest) -> PipelineResult<()> {
    if request.image_id.trim().is_empty() {
        return Err(PipelineError::MissingImageId);
    }
    if request.image.is_empty() {
        return Err(PipelineError::EmptyImage);
    }
    Ok(())
}
