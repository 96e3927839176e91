mod common;

use serde_json::Value;
use sightline::model::{Candidate, PlaceRecord, SourceKind, SourceSummary};
use sightline::providers::{
    MockNarrator, MockPlaceLookup, MockProviders, MockVisionRecognizer, MockWebSearcher,
};

use common::{JPEG_BYTES, identify_form, spawn_test_server};

fn eiffel_mocks() -> MockProviders {
    MockProviders::new()
        .with_vision(MockVisionRecognizer::returning(vec![
            Candidate::named("Tower Bridge").with_confidence(0.4),
            Candidate::named("Eiffel Tower")
                .with_confidence(0.9)
                .with_coordinates(48.8584, 2.2945)
                .with_evidence("wrought-iron lattice"),
        ]))
        .with_places(MockPlaceLookup::empty().with_name(
            "Eiffel Tower",
            vec![PlaceRecord {
                place_id: Some("ChIJLU7jZClu5kcR4PcOOO6p3I0".to_string()),
                name: Some("Eiffel Tower".to_string()),
                address: Some("Av. Gustave Eiffel, 75007 Paris, France".to_string()),
                lat: Some(48.8584),
                lng: Some(2.2945),
                match_score: Some(0.97),
                ..Default::default()
            }],
        ))
        .with_search(MockWebSearcher::empty().with_query(
            "Tower Bridge",
            vec![SourceSummary {
                source: "https://en.wikipedia.org/wiki/Tower_Bridge".to_string(),
                summary: "Tower Bridge is a bascule and suspension bridge in London.".to_string(),
                kind: SourceKind::Wiki,
                reliability: Some(0.8),
            }],
        ))
        .with_narrator(MockNarrator::returning(
            "The Eiffel Tower is a wrought-iron lattice tower in Paris.",
        ))
}

#[tokio::test]
async fn test_identify_end_to_end() {
    let mocks = eiffel_mocks();
    let server = spawn_test_server(&mocks).await.unwrap();
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/identify", server.url()))
        .multipart(identify_form(JPEG_BYTES, &[("image_id", "img_eiffel")]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-sightline-status"], "MISS");
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["image_id"], "img_eiffel");
    assert_eq!(body["candidates"][0]["name"], "Eiffel Tower");
    assert_eq!(body["candidates"][1]["name"], "Tower Bridge");
    assert_eq!(body["place"]["name"], "Eiffel Tower");
    assert_eq!(body["place"]["place_id"], "ChIJLU7jZClu5kcR4PcOOO6p3I0");
    assert_eq!(body["info"]["places"].as_array().unwrap().len(), 1);
    assert_eq!(body["info"]["sources"][0]["type"], "wiki");
    assert_eq!(
        body["info"]["summary"],
        "The Eiffel Tower is a wrought-iron lattice tower in Paris."
    );
    assert!((body["ui_hints"]["confidence"].as_f64().unwrap() - 0.97).abs() < 1e-6);

    let logs: Vec<&str> = body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert_eq!(
        logs,
        [
            "use_gemini_multimodal",
            "gemini_candidates:2",
            "lookup_places_for:Eiffel Tower",
            "chosen_place_by_places:Eiffel Tower",
            "websearch_for:Tower Bridge",
        ]
    );
    assert_eq!(mocks.places.calls(), 1);
}

#[tokio::test]
async fn test_repeat_request_is_served_from_cache() {
    let mocks = eiffel_mocks();
    let server = spawn_test_server(&mocks).await.unwrap();
    let client = reqwest::Client::new();
    let url = format!("{}/identify", server.url());

    let first: Value = client
        .post(&url)
        .multipart(identify_form(JPEG_BYTES, &[("image_id", "img_repeat")]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let calls = mocks.total_calls();

    let second = client
        .post(&url)
        .multipart(identify_form(JPEG_BYTES, &[("image_id", "img_repeat")]))
        .send()
        .await
        .unwrap();

    assert_eq!(second.headers()["x-sightline-status"], "HIT");
    let second: Value = second.json().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(mocks.total_calls(), calls);
    assert_eq!(server.cache.len(), 1);
}

#[tokio::test]
async fn test_nothing_found_returns_ok_with_null_place() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::failing("vision unavailable"))
        .with_narrator(MockNarrator::failing("narrator unavailable"));
    let server = spawn_test_server(&mocks).await.unwrap();

    let response = reqwest::Client::new()
        .post(format!("{}/identify", server.url()))
        .multipart(identify_form(JPEG_BYTES, &[]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert!(body["place"].is_null());
    assert_eq!(body["candidates"], serde_json::json!([]));
    assert_eq!(body["info"]["summary"], "Information summary not available.");
    assert_eq!(body["ui_hints"]["confidence"], 0.0);
    assert_eq!(mocks.search.queries(), [("landmark in image".to_string(), 5)]);
}

#[tokio::test]
async fn test_missing_image_is_rejected() {
    let mocks = MockProviders::new();
    let server = spawn_test_server(&mocks).await.unwrap();

    let form = reqwest::multipart::Form::new().text("image_id", "img_no_image");
    let response = reqwest::Client::new()
        .post(format!("{}/identify", server.url()))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], 400);
    assert_eq!(mocks.total_calls(), 0);
}

#[tokio::test]
async fn test_health_check() {
    let server = spawn_test_server(&MockProviders::new()).await.unwrap();

    let response = reqwest::get(format!("{}/healthz", server.url()))
        .await
        .unwrap();

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}
