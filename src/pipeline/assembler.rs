use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::constants::{SUMMARY_UNAVAILABLE, SUMMARY_UNAVAILABLE_SUFFIX, cache_key};
use crate::enrichment::Resolution;
use crate::model::{AggregatedInfo, EnrichedPlace, ResponseEnvelope, SourceSummary, UiHints};
use crate::providers::{NarrativeContext, Narrator, with_timeout};
use crate::ranking::RankedCandidates;
use crate::trace::{DecisionLog, TAG_NARRATIVE_ERROR};

/// Summary used when narration fails.
pub fn fallback_summary(place: Option<&EnrichedPlace>) -> String {
    match place.and_then(EnrichedPlace::display_name) {
        Some(name) => format!("{name}{SUMMARY_UNAVAILABLE_SUFFIX}"),
        None => SUMMARY_UNAVAILABLE.to_string(),
    }
}

/// Builds the response envelope and commits it to the result cache.
pub struct ResponseAssembler {
    narrator: Arc<dyn Narrator>,
    cache: ResultCache,
    timeout: Duration,
}

impl ResponseAssembler {
    pub fn new(narrator: Arc<dyn Narrator>, cache: ResultCache, timeout: Duration) -> Self {
        Self {
            narrator,
            cache,
            timeout,
        }
    }

    pub async fn assemble(
        &self,
        image_id: &str,
        candidates: RankedCandidates,
        resolution: Resolution,
        web_hits: Vec<SourceSummary>,
        mut log: DecisionLog,
    ) -> ResponseEnvelope {
        let Resolution {
            chosen,
            places,
            sources,
        } = resolution;

        let summary = self
            .narrate(&candidates, chosen.as_ref(), &places, &sources, &mut log)
            .await;

        let envelope = ResponseEnvelope {
            image_id: image_id.to_string(),
            timestamp: self.cache.now().timestamp(),
            ui_hints: UiHints::for_place(chosen.as_ref()),
            candidates,
            place: chosen,
            info: AggregatedInfo {
                sources,
                places,
                web_hits,
                summary,
            },
            logs: log.into_entries(),
        };

        self.cache.set(cache_key(image_id), envelope.clone());
        debug!(image_id, "envelope cached");
        envelope
    }

    async fn narrate(
        &self,
        candidates: &RankedCandidates,
        place: Option<&EnrichedPlace>,
        places: &[crate::model::PlaceRecord],
        sources: &[SourceSummary],
        log: &mut DecisionLog,
    ) -> String {
        let context = NarrativeContext {
            candidates,
            place,
            places,
            sources,
        };
        match with_timeout("narrator", self.timeout, self.narrator.narrate(context)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "narrative generation failed; using fallback summary");
                log.record_with(TAG_NARRATIVE_ERROR, &e);
                fallback_summary(place)
            }
        }
    }
}

impl std::fmt::Debug for ResponseAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseAssembler")
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
