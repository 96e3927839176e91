use serde::{Deserialize, Serialize};

/// A hypothesized place match produced by a candidate provider.
///
/// Every field is optional because recognizers often know only part of the answer (a name
/// without coordinates, or a coordinate without a name). Candidates sharing a name are
/// independent hypotheses and are never merged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,

    /// Recognizer confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,

    /// Short justification from the recognizer ("distinctive iron lattice").
    #[serde(default, alias = "reason", skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
}

impl Candidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn at(lat: f64, lng: f64) -> Self {
        Self {
            lat: Some(lat),
            lng: Some(lng),
            ..Default::default()
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_coordinates(mut self, lat: f64, lng: f64) -> Self {
        self.lat = Some(lat);
        self.lng = Some(lng);
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence = Some(evidence.into());
        self
    }

    /// Confidence with missing and NaN values read as `0.0`.
    #[inline]
    pub fn confidence_or_zero(&self) -> f32 {
        self.confidence.filter(|c| !c.is_nan()).unwrap_or(0.0)
    }

    /// Both coordinates, if the candidate carries a full location.
    #[inline]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lng)
    }

    /// Non-blank name, if any.
    #[inline]
    pub fn usable_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    /// Label used in decision-log tags: the name, or `coord` for unnamed candidates.
    pub fn label(&self) -> &str {
        self.usable_name().unwrap_or("coord")
    }
}

/// Caller-supplied position used for the (currently inert) location-bias step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    pub lat: f64,
    pub lng: f64,
}

impl UserLocation {
    /// Returns `None` unless the point lies within valid latitude/longitude ranges.
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }
}
