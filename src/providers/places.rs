//! Google Places API (v1) lookup.
//!
//! Named queries go through `places:searchText`, biased to the candidate coordinate when one is
//! known. Coordinate-only queries go through `places:searchNearby`.

use std::collections::HashSet;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::error::{ProviderError, ProviderResult};
use super::{PlaceLookup, PlaceQuery};
use crate::model::PlaceRecord;

pub const DEFAULT_PLACES_BASE_URL: &str = "https://places.googleapis.com/v1";

const FIELD_MASK: &str = "places.id,places.displayName,places.formattedAddress,places.location,\
places.types,places.rating,places.priceLevel,places.regularOpeningHours.weekdayDescriptions";

const BIAS_RADIUS_METERS: f64 = 500.0;
const MAX_RESULTS: u8 = 5;

#[derive(Clone)]
pub struct GooglePlaces {
    http: reqwest::Client,
    api_key: SecretString,
    base_url: String,
}

impl GooglePlaces {
    pub fn new(http: reqwest::Client, api_key: SecretString) -> Self {
        Self {
            http,
            api_key,
            base_url: DEFAULT_PLACES_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn post<B: Serialize>(&self, method: &str, body: &B) -> ProviderResult<Vec<ApiPlace>> {
        let response = self
            .http
            .post(format!("{}/places:{method}", self.base_url))
            .header("X-Goog-Api-Key", self.api_key.expose_secret())
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::upstream(status, &text));
        }

        let parsed: ApiResponse = response.json().await?;
        Ok(parsed.places)
    }
}

impl std::fmt::Debug for GooglePlaces {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GooglePlaces")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PlaceLookup for GooglePlaces {
    #[instrument(skip(self))]
    async fn lookup(&self, query: PlaceQuery<'_>) -> ProviderResult<Vec<PlaceRecord>> {
        let places = match (query.name, query.coordinates()) {
            (Some(name), coords) => {
                let body = SearchTextRequest {
                    text_query: name,
                    max_result_count: MAX_RESULTS,
                    location_bias: coords.map(|(lat, lng)| Area::circle(lat, lng)),
                };
                self.post("searchText", &body).await?
            }
            (None, Some((lat, lng))) => {
                let body = SearchNearbyRequest {
                    max_result_count: MAX_RESULTS,
                    location_restriction: Area::circle(lat, lng),
                };
                self.post("searchNearby", &body).await?
            }
            (None, None) => return Ok(Vec::new()),
        };

        debug!(count = places.len(), "places lookup returned");
        Ok(places
            .into_iter()
            .map(|p| p.into_record(query.name))
            .collect())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextRequest<'a> {
    text_query: &'a str,
    max_result_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    location_bias: Option<Area>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchNearbyRequest {
    max_result_count: u8,
    location_restriction: Area,
}

#[derive(Serialize)]
struct Area {
    circle: Circle,
}

#[derive(Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Serialize, Deserialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

impl Area {
    fn circle(lat: f64, lng: f64) -> Self {
        Self {
            circle: Circle {
                center: LatLng {
                    latitude: lat,
                    longitude: lng,
                },
                radius: BIAS_RADIUS_METERS,
            },
        }
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    places: Vec<ApiPlace>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiPlace {
    id: Option<String>,
    display_name: Option<ApiText>,
    formatted_address: Option<String>,
    location: Option<LatLng>,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f32>,
    price_level: Option<String>,
    regular_opening_hours: Option<ApiOpeningHours>,
}

#[derive(Deserialize)]
struct ApiText {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiOpeningHours {
    #[serde(default)]
    weekday_descriptions: Vec<String>,
}

impl ApiPlace {
    fn into_record(self, query_name: Option<&str>) -> PlaceRecord {
        let name = self.display_name.and_then(|t| t.text);
        let match_score = query_name
            .zip(name.as_deref())
            .map(|(query, found)| name_similarity(query, found));
        PlaceRecord {
            place_id: self.id,
            name,
            address: self.formatted_address,
            lat: self.location.as_ref().map(|l| l.latitude),
            lng: self.location.as_ref().map(|l| l.longitude),
            opening_hours: self
                .regular_opening_hours
                .map(|h| h.weekday_descriptions)
                .unwrap_or_default(),
            rating: self.rating,
            price_level: self.price_level,
            types: self.types,
            match_score,
            confidence: None,
        }
    }
}

/// Jaccard similarity of the lowercase alphanumeric tokens of two names, in `[0, 1]`.
pub fn name_similarity(a: &str, b: &str) -> f32 {
    fn tokens(s: &str) -> HashSet<String> {
        s.split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    let (a, b) = (tokens(a), tokens(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f32 / union as f32
}
