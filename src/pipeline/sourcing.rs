//! Candidate sourcing: the provider fallback chain.
//!
//! ```text
//! Primary ──ok──────────────┐
//!    │ err                  ▼
//!    └──► Secondary ──► LocationBias ──non-empty──► Resolved
//!                             │ empty
//!                             ▼
//!                      TertiaryWebOnly ──► Empty
//! ```
//!
//! Primary is skipped entirely when vision is disabled. An empty but successful primary answer
//! goes straight to the bias step and then the web-only path; it does not trigger the
//! secondary path. The web-only path collects `web_hits` but never produces candidates.

use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::constants::{
    FALLBACK_SEARCH_QUERY, LOCAL_INDEX_TOP_K, NO_CANDIDATE_SEARCH_TOP_K, VISION_PROMPT,
};
use crate::model::{Candidate, IdentifyRequest, SourceSummary};
use crate::providers::{ProviderResult, Providers, with_timeout};
use crate::trace::{
    DecisionLog, TAG_LOCAL_CANDIDATES, TAG_LOCAL_ERROR, TAG_LOCATION_BIAS, TAG_NO_CANDIDATES,
    TAG_OCR_DONE, TAG_OCR_ERROR, TAG_OCR_HINT, TAG_USE_VISION, TAG_VISION_CANDIDATES,
    TAG_VISION_DISABLED, TAG_VISION_ERROR, TAG_WEB_HITS, TAG_WEBSEARCH_ERROR,
};

/// States of the sourcing machine. `Resolved` and `Empty` are terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcingState {
    Primary,
    Secondary,
    LocationBias(Vec<Candidate>),
    TertiaryWebOnly,
    Resolved(Vec<Candidate>),
    Empty,
}

impl SourcingState {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SourcingState::Resolved(_) | SourcingState::Empty)
    }
}

/// What sourcing hands to ranking.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourcingOutcome {
    /// Raw provider candidates, unranked.
    pub candidates: Vec<Candidate>,
    /// Web-only search results; populated only when no candidates were found.
    pub web_hits: Vec<SourceSummary>,
}

pub struct CandidateSourcing<'a> {
    providers: &'a Providers,
    use_vision: bool,
    timeout: Duration,
}

/// Per-run scratch state carried between states.
struct Run<'r> {
    request: &'r IdentifyRequest,
    ocr_text: Option<String>,
    web_hits: Vec<SourceSummary>,
}

impl<'a> CandidateSourcing<'a> {
    pub fn new(providers: &'a Providers, use_vision: bool, timeout: Duration) -> Self {
        Self {
            providers,
            use_vision,
            timeout,
        }
    }

    /// Drives the machine from its initial state to a terminal one.
    #[instrument(skip_all, fields(image_id = %request.image_id))]
    pub async fn run(&self, request: &IdentifyRequest, log: &mut DecisionLog) -> SourcingOutcome {
        let mut run = Run {
            request,
            ocr_text: None,
            web_hits: Vec::new(),
        };

        let mut state = self.initial_state(log);
        while !state.is_terminal() {
            state = self.step(state, &mut run, log).await;
        }

        let candidates = match state {
            SourcingState::Resolved(candidates) => candidates,
            _ => Vec::new(),
        };
        debug!(
            candidates = candidates.len(),
            web_hits = run.web_hits.len(),
            "candidate sourcing finished"
        );
        SourcingOutcome {
            candidates,
            web_hits: run.web_hits,
        }
    }

    fn initial_state(&self, log: &mut DecisionLog) -> SourcingState {
        if self.use_vision {
            SourcingState::Primary
        } else {
            log.record(TAG_VISION_DISABLED);
            SourcingState::Secondary
        }
    }

    async fn step(
        &self,
        state: SourcingState,
        run: &mut Run<'_>,
        log: &mut DecisionLog,
    ) -> SourcingState {
        match state {
            SourcingState::Primary => self.primary(run, log).await,
            SourcingState::Secondary => self.secondary(run, log).await,
            SourcingState::LocationBias(candidates) => {
                // Distance-based reweighting is not implemented; the step is only recorded.
                if run.request.user_location.is_some() {
                    log.record(TAG_LOCATION_BIAS);
                }
                if candidates.is_empty() {
                    SourcingState::TertiaryWebOnly
                } else {
                    SourcingState::Resolved(candidates)
                }
            }
            SourcingState::TertiaryWebOnly => self.tertiary(run, log).await,
            terminal @ (SourcingState::Resolved(_) | SourcingState::Empty) => terminal,
        }
    }

    async fn primary(&self, run: &mut Run<'_>, log: &mut DecisionLog) -> SourcingState {
        log.record(TAG_USE_VISION);
        let call = self
            .providers
            .vision
            .recognize(&run.request.image, VISION_PROMPT);
        match with_timeout("vision", self.timeout, call).await {
            Ok(candidates) => {
                log.record_with(TAG_VISION_CANDIDATES, candidates.len());
                SourcingState::LocationBias(candidates)
            }
            Err(e) => {
                warn!(error = %e, "vision recognizer failed; falling back to OCR and local index");
                log.record_with(TAG_VISION_ERROR, &e);
                SourcingState::Secondary
            }
        }
    }

    async fn secondary(&self, run: &mut Run<'_>, log: &mut DecisionLog) -> SourcingState {
        match self.local_search(run, log).await {
            Ok(candidates) => {
                log.record_with(TAG_LOCAL_CANDIDATES, candidates.len());
                SourcingState::LocationBias(candidates)
            }
            Err(e) => {
                warn!(error = %e, "local fallback failed");
                log.record_with(TAG_LOCAL_ERROR, &e);
                SourcingState::LocationBias(Vec::new())
            }
        }
    }

    async fn local_search(
        &self,
        run: &mut Run<'_>,
        log: &mut DecisionLog,
    ) -> ProviderResult<Vec<Candidate>> {
        let text = self.ocr(run).await?;
        log.record(TAG_OCR_DONE);

        let hint = (!text.is_empty()).then_some(text.as_str());
        if hint.is_some() {
            log.record(TAG_OCR_HINT);
        }

        let call = self
            .providers
            .index
            .search(&run.request.image, hint, LOCAL_INDEX_TOP_K);
        with_timeout("local_index", self.timeout, call).await
    }

    async fn tertiary(&self, run: &mut Run<'_>, log: &mut DecisionLog) -> SourcingState {
        log.record(TAG_NO_CANDIDATES);

        let text = match self.ocr(run).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "OCR failed on the web-only path");
                log.record_with(TAG_OCR_ERROR, &e);
                String::new()
            }
        };
        let query = if text.is_empty() {
            FALLBACK_SEARCH_QUERY
        } else {
            text.as_str()
        };

        let call = self
            .providers
            .search
            .search_and_summarize(query, NO_CANDIDATE_SEARCH_TOP_K);
        match with_timeout("websearch", self.timeout, call).await {
            Ok(hits) => {
                log.record_with(TAG_WEB_HITS, hits.len());
                run.web_hits = hits;
            }
            Err(e) => {
                warn!(error = %e, "web-only search failed");
                log.record_with(TAG_WEBSEARCH_ERROR, &e);
            }
        }

        // Hits are kept for the response but are not promoted to candidates.
        SourcingState::Empty
    }

    /// OCR, memoized for the run. Failures are not memoized.
    async fn ocr(&self, run: &mut Run<'_>) -> ProviderResult<String> {
        if let Some(text) = &run.ocr_text {
            return Ok(text.clone());
        }
        let call = self.providers.ocr.extract_text(&run.request.image);
        let text = with_timeout("ocr", self.timeout, call)
            .await?
            .trim()
            .to_string();
        run.ocr_text = Some(text.clone());
        Ok(text)
    }
}
