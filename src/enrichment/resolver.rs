use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::constants::{
    CANDIDATE_SEARCH_TOP_K, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PROVIDER_TIMEOUT_SECS,
};
use crate::model::{Candidate, EnrichedPlace, PlaceRecord, SourceSummary};
use crate::providers::{PlaceLookup, PlaceQuery, WebSearcher, with_timeout};
use crate::ranking::RankedCandidates;
use crate::trace::{
    DecisionLog, TAG_CHOSEN_BY_PLACES, TAG_CHOSEN_BY_WEB, TAG_FALLBACK_TOP, TAG_LOOKUP_FOR,
    TAG_PLACES_ERROR, TAG_WEBSEARCH_ERROR, TAG_WEBSEARCH_FOR,
};

/// Output of one resolution pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    /// At most one place; `None` only when there were no candidates.
    pub chosen: Option<EnrichedPlace>,
    /// Accepted lookup records with their stamped confidence, in candidate order.
    pub places: Vec<PlaceRecord>,
    /// Every web summary collected, in candidate order.
    pub sources: Vec<SourceSummary>,
}

/// Outcome of the lookup step for a single candidate.
enum LookupOutcome {
    Accepted,
    NoResults,
    Skipped,
}

pub struct EnrichmentResolver {
    places: Arc<dyn PlaceLookup>,
    search: Arc<dyn WebSearcher>,
    threshold: f32,
    timeout: Duration,
}

impl EnrichmentResolver {
    pub fn new(places: Arc<dyn PlaceLookup>, search: Arc<dyn WebSearcher>) -> Self {
        Self {
            places,
            search,
            threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }

    /// Sets the lookup eligibility threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the per-call provider timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[inline]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// A candidate goes to lookup when `confidence >= threshold` or it has both coordinates.
    #[inline]
    pub fn is_lookup_eligible(&self, candidate: &Candidate) -> bool {
        candidate.confidence_or_zero() >= self.threshold || candidate.coordinates().is_some()
    }

    /// Walks the ranked candidates in order and picks the chosen place.
    ///
    /// Provider failures are logged and treated as empty answers; this never fails.
    #[instrument(skip_all, fields(candidates = ranked.len()))]
    pub async fn resolve(&self, ranked: &RankedCandidates, log: &mut DecisionLog) -> Resolution {
        let mut resolution = Resolution::default();

        for candidate in ranked {
            match self.try_lookup(candidate, &mut resolution, log).await {
                LookupOutcome::Accepted => continue,
                LookupOutcome::NoResults | LookupOutcome::Skipped => {}
            }

            if let Some(name) = candidate.usable_name() {
                self.try_web(candidate, name, &mut resolution, log).await;
            }
        }

        if resolution.chosen.is_none()
            && let Some(top) = ranked.top()
        {
            log.record(TAG_FALLBACK_TOP);
            resolution.chosen = Some(EnrichedPlace::from_candidate(top));
        }

        debug!(
            chosen = resolution.chosen.as_ref().and_then(|p| p.display_name()),
            places = resolution.places.len(),
            sources = resolution.sources.len(),
            "enrichment resolved"
        );
        resolution
    }

    async fn try_lookup(
        &self,
        candidate: &Candidate,
        resolution: &mut Resolution,
        log: &mut DecisionLog,
    ) -> LookupOutcome {
        if !self.is_lookup_eligible(candidate) {
            return LookupOutcome::Skipped;
        }

        log.record_with(TAG_LOOKUP_FOR, candidate.label());
        let query = PlaceQuery::for_candidate(candidate);
        let records = match with_timeout("places", self.timeout, self.places.lookup(query)).await {
            Ok(records) => records,
            Err(e) => {
                warn!(candidate = candidate.label(), error = %e, "place lookup failed");
                log.record_with(TAG_PLACES_ERROR, &e);
                return LookupOutcome::NoResults;
            }
        };

        let Some(mut record) = records.into_iter().next() else {
            return LookupOutcome::NoResults;
        };

        let confidence = candidate.confidence_or_zero();
        record.confidence = Some(
            record
                .match_score
                .map_or(confidence, |score| confidence.max(score)),
        );

        if resolution.chosen.is_none() {
            let place = EnrichedPlace::from_lookup(candidate, &record);
            log.record_with(
                TAG_CHOSEN_BY_PLACES,
                place.display_name().unwrap_or(candidate.label()),
            );
            resolution.chosen = Some(place);
        }
        resolution.places.push(record);
        LookupOutcome::Accepted
    }

    async fn try_web(
        &self,
        candidate: &Candidate,
        name: &str,
        resolution: &mut Resolution,
        log: &mut DecisionLog,
    ) {
        log.record_with(TAG_WEBSEARCH_FOR, name);
        let summaries = match with_timeout(
            "websearch",
            self.timeout,
            self.search.search_and_summarize(name, CANDIDATE_SEARCH_TOP_K),
        )
        .await
        {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(candidate = name, error = %e, "web search failed");
                log.record_with(TAG_WEBSEARCH_ERROR, &e);
                return;
            }
        };

        if resolution.chosen.is_none()
            && let Some(first) = summaries.first()
        {
            log.record_with(TAG_CHOSEN_BY_WEB, name);
            resolution.chosen = Some(EnrichedPlace::from_web(candidate, first.clone()));
        }
        resolution.sources.extend(summaries);
    }
}

impl std::fmt::Debug for EnrichmentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentResolver")
            .field("threshold", &self.threshold)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
