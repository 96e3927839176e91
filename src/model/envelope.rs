use serde::{Deserialize, Serialize};

use super::{EnrichedPlace, PlaceRecord, SourceSummary, UserLocation};
use crate::ranking::RankedCandidates;

/// Input to one pipeline run.
#[derive(Debug, Clone)]
pub struct IdentifyRequest {
    /// Caller-chosen id; also the cache identity of the request.
    pub image_id: String,
    pub image: Vec<u8>,
    pub user_location: Option<UserLocation>,
}

impl IdentifyRequest {
    pub fn new(image_id: impl Into<String>, image: Vec<u8>) -> Self {
        Self {
            image_id: image_id.into(),
            image,
            user_location: None,
        }
    }

    pub fn with_location(mut self, location: UserLocation) -> Self {
        self.user_location = Some(location);
        self
    }
}

/// Everything gathered while enriching candidates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AggregatedInfo {
    /// Web summaries collected by per-candidate search fallback.
    pub sources: Vec<SourceSummary>,
    /// Accepted lookup records, one per candidate that resolved through lookup.
    pub places: Vec<PlaceRecord>,
    /// Results of the web-only search that runs when no candidates exist.
    pub web_hits: Vec<SourceSummary>,
    /// Narrative summary, or a deterministic fallback when narration fails.
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ViewOnMap,
    OpenDetails,
    AskFollowup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
}

/// Display hints for the client UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiHints {
    pub confidence: f32,
    pub suggested_actions: Vec<SuggestedAction>,
}

impl UiHints {
    const ACTIONS: [ActionKind; 3] = [
        ActionKind::ViewOnMap,
        ActionKind::OpenDetails,
        ActionKind::AskFollowup,
    ];

    pub fn for_place(place: Option<&EnrichedPlace>) -> Self {
        Self {
            confidence: place.map_or(0.0, |p| p.confidence),
            suggested_actions: Self::ACTIONS
                .into_iter()
                .map(|kind| SuggestedAction { kind })
                .collect(),
        }
    }
}

/// The caller-facing result of one identification; also the cached value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseEnvelope {
    pub image_id: String,
    /// Unix seconds at assembly time.
    pub timestamp: i64,
    pub candidates: RankedCandidates,
    pub place: Option<EnrichedPlace>,
    pub info: AggregatedInfo,
    pub ui_hints: UiHints,
    pub logs: Vec<String>,
}
