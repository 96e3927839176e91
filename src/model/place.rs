use serde::{Deserialize, Serialize};

use super::Candidate;

/// One result from the structured place-lookup provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opening_hours: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    /// Provider-side similarity between the query and this record, in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,

    /// Confidence stamped by the resolver when the record is accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Official,
    Wiki,
    Blog,
    #[default]
    Web,
}

/// A summarized web page returned by the search provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceSummary {
    /// URL (or provider label) the summary was taken from.
    pub source: String,
    pub summary: String,
    #[serde(rename = "type", default)]
    pub kind: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<f32>,
}

/// Which step of the resolver produced the chosen place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Places,
    Web,
    TopCandidate,
}

/// The single place the pipeline answers with: a candidate merged with lookup or web data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPlace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    pub confidence: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub opening_hours: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_score: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_summary: Option<SourceSummary>,

    pub resolved_by: ResolvedBy,
}

impl EnrichedPlace {
    /// Merges a lookup record over its candidate: record fields win where present.
    ///
    /// `record.confidence` must already be stamped by the resolver; the candidate confidence
    /// is used otherwise.
    pub fn from_lookup(candidate: &Candidate, record: &PlaceRecord) -> Self {
        Self {
            name: record.name.clone().or_else(|| candidate.name.clone()),
            lat: record.lat.or(candidate.lat),
            lng: record.lng.or(candidate.lng),
            confidence: record
                .confidence
                .unwrap_or_else(|| candidate.confidence_or_zero()),
            evidence: candidate.evidence.clone(),
            place_id: record.place_id.clone(),
            address: record.address.clone(),
            opening_hours: record.opening_hours.clone(),
            rating: record.rating,
            price_level: record.price_level.clone(),
            types: record.types.clone(),
            match_score: record.match_score,
            info_summary: None,
            resolved_by: ResolvedBy::Places,
        }
    }

    /// Attaches a web summary to an otherwise unchanged candidate.
    pub fn from_web(candidate: &Candidate, summary: SourceSummary) -> Self {
        Self {
            info_summary: Some(summary),
            resolved_by: ResolvedBy::Web,
            ..Self::from_candidate(candidate)
        }
    }

    /// Promotes a bare candidate, defaulting a missing confidence to `0.0`.
    pub fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            name: candidate.name.clone(),
            lat: candidate.lat,
            lng: candidate.lng,
            confidence: candidate.confidence_or_zero(),
            evidence: candidate.evidence.clone(),
            place_id: None,
            address: None,
            opening_hours: Vec::new(),
            rating: None,
            price_level: None,
            types: Vec::new(),
            match_score: None,
            info_summary: None,
            resolved_by: ResolvedBy::TopCandidate,
        }
    }

    /// Non-blank name, if any.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}
