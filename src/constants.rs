//! Cross-cutting, shared constants.
//!
//! Limits that shape the response contract (candidate cap, search fan-out) live here so the
//! pipeline stages and their tests agree on them.

/// Maximum number of ranked candidates carried past the ranker and into the response.
pub const MAX_RANKED_CANDIDATES: usize = 5;

/// Default confidence at or above which a candidate is sent to structured place lookup.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Default result-cache TTL (24 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 24 * 3600;

/// Default interval between sweeps of expired result-cache entries.
pub const DEFAULT_CACHE_PURGE_INTERVAL_SECS: u64 = 5 * 60;

/// Default per-call timeout applied to every external provider.
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 20;

/// Default maximum accepted image upload size (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// `top_k` for the local visual-index search on the secondary path.
pub const LOCAL_INDEX_TOP_K: usize = 5;

/// `top_k` for the per-candidate web search fallback.
pub const CANDIDATE_SEARCH_TOP_K: usize = 3;

/// `top_k` for the web-only search when no candidates exist.
pub const NO_CANDIDATE_SEARCH_TOP_K: usize = 5;

/// Query sent to web search when no candidates exist and OCR found no text.
pub const FALLBACK_SEARCH_QUERY: &str = "landmark in image";

/// Prefix for result-cache keys.
pub const CACHE_KEY_PREFIX: &str = "imghash:";

/// Summary used when narrative generation fails and there is no named chosen place.
pub const SUMMARY_UNAVAILABLE: &str = "Information summary not available.";

/// Suffix appended to the chosen place name when narrative generation fails.
pub const SUMMARY_UNAVAILABLE_SUFFIX: &str = " - information summary not available.";

/// Instruction sent with the image to the vision recognizer.
pub const VISION_PROMPT: &str = "You are an assistant that identifies landmarks in the provided image. \
Return JSON: candidates list with fields: name, lat, lng (optional), confidence (0-1), evidence.";

/// Instruction sent with the image to the OCR recognizer.
pub const OCR_PROMPT: &str = "Transcribe every legible piece of text in this image (signs, plaques, \
storefronts, street names). Return only the text, one line per sign. Return an empty response if \
there is no text.";

/// Builds the result-cache key for an image id.
#[inline]
pub fn cache_key(image_id: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{image_id}")
}
