//! Per-request decision log.
//!
//! The tags collected here are returned to the caller in the envelope `logs` field, so their
//! spelling is part of the response contract. Each tag is mirrored as a `tracing` debug event.

use std::fmt::Display;

use tracing::debug;

pub const TAG_USE_VISION: &str = "use_gemini_multimodal";
pub const TAG_VISION_DISABLED: &str = "vision_disabled";
pub const TAG_VISION_CANDIDATES: &str = "gemini_candidates";
pub const TAG_VISION_ERROR: &str = "gemini_error";
pub const TAG_OCR_DONE: &str = "ocr_done";
pub const TAG_OCR_ERROR: &str = "ocr_error";
pub const TAG_OCR_HINT: &str = "ocr_used_for_disambiguation";
pub const TAG_LOCAL_CANDIDATES: &str = "local_candidates";
pub const TAG_LOCAL_ERROR: &str = "local_vision_error";
pub const TAG_LOCATION_BIAS: &str = "applied_user_location_bias";
pub const TAG_NO_CANDIDATES: &str = "no_candidates_fallback_to_websearch";
pub const TAG_WEB_HITS: &str = "web_hits";
pub const TAG_WEBSEARCH_ERROR: &str = "websearch_error";
pub const TAG_LOOKUP_FOR: &str = "lookup_places_for";
pub const TAG_PLACES_ERROR: &str = "places_error";
pub const TAG_CHOSEN_BY_PLACES: &str = "chosen_place_by_places";
pub const TAG_WEBSEARCH_FOR: &str = "websearch_for";
pub const TAG_CHOSEN_BY_WEB: &str = "chosen_place_by_web";
pub const TAG_FALLBACK_TOP: &str = "fallback_chosen_top_candidate";
pub const TAG_NARRATIVE_ERROR: &str = "narrative_error";

/// Ordered list of decision tags for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionLog {
    entries: Vec<String>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bare tag.
    pub fn record(&mut self, tag: &str) {
        debug!(decision = tag, "pipeline decision");
        self.entries.push(tag.to_string());
    }

    /// Appends `tag:detail`.
    pub fn record_with(&mut self, tag: &str, detail: impl Display) {
        let entry = format!("{tag}:{detail}");
        debug!(decision = %entry, "pipeline decision");
        self.entries.push(entry);
    }

    #[inline]
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    #[inline]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}
