//! Sightline library crate (used by the server and integration tests).
//!
//! Sightline turns a photograph into an identified place: candidate places are sourced from a
//! vision recognizer (falling back to OCR plus a local landmark index, then to a web-only
//! search), ranked, enriched through structured place lookup and web search, summarized, and
//! returned as a [`ResponseEnvelope`]. Envelopes are cached by image id.
//!
//! ## Modules
//! - [`pipeline`] - [`IdentifyPipeline`], the request entry point
//! - [`providers`] - capability traits and their HTTP adapters
//! - [`enrichment`] - per-candidate lookup and web search
//! - [`ranking`] - confidence ordering and truncation
//! - [`cache`] - TTL result cache with an injectable clock
//! - [`gateway`] - Axum router
//!
//! ## Test/Mock Support
//! Scripted providers and a manual clock are available behind
//! `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod gateway;
pub mod model;
pub mod pipeline;
pub mod providers;
pub mod ranking;
pub mod trace;

#[cfg(any(test, feature = "mock"))]
pub use cache::ManualClock;
pub use cache::{CacheStatus, Clock, ResultCache, SIGHTLINE_STATUS_HEADER, SystemClock};

pub use config::{Config, ConfigError, SearchBackendKind};
pub use enrichment::{EnrichmentResolver, Resolution};
pub use gateway::{GatewayError, HandlerState, create_router_with_state};
pub use model::{
    Candidate, EnrichedPlace, IdentifyRequest, PlaceRecord, ResponseEnvelope, SourceSummary,
    UserLocation,
};
pub use pipeline::{Identification, IdentifyPipeline, PipelineError, PipelineSettings};
#[cfg(any(test, feature = "mock"))]
pub use providers::MockProviders;
pub use providers::{ProviderError, Providers};
pub use ranking::{RankedCandidates, rank_candidates};
pub use trace::DecisionLog;
