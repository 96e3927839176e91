use std::time::Duration;

use super::gemini::{sniff_image_mime, strip_code_fence};
use super::mock::{MockPlaceLookup, MockProviders, MockVisionRecognizer};
use super::places::name_similarity;
use super::search::classify_source;
use super::vision::parse_candidates;
use super::*;
use crate::model::SourceKind;

#[test]
fn test_parse_candidates_wrapped_object() {
    let text = r#"{"candidates":[{"name":"Eiffel Tower","lat":48.8584,"lng":2.2945,"confidence":0.92,"reason":"distinctive structure"}],"raw_text":"..."}"#;

    let candidates = parse_candidates(text).unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name.as_deref(), Some("Eiffel Tower"));
    assert_eq!(candidates[0].coordinates(), Some((48.8584, 2.2945)));
    assert_eq!(candidates[0].evidence.as_deref(), Some("distinctive structure"));
}

#[test]
fn test_parse_candidates_fenced_bare_array() {
    let text = "```json\n[{\"name\":\"Big Ben\",\"confidence\":0.7}]\n```";
    let candidates = parse_candidates(text).unwrap();
    assert_eq!(candidates[0].name.as_deref(), Some("Big Ben"));
}

#[test]
fn test_parse_candidates_clamps_confidence() {
    let text = r#"[{"name":"Louvre","confidence":1.7},{"name":"Orsay","confidence":-0.2},{"name":"Pantheon"}]"#;

    let candidates = parse_candidates(text).unwrap();

    assert_eq!(candidates[0].confidence, Some(1.0));
    assert_eq!(candidates[1].confidence, Some(0.0));
    assert_eq!(candidates[2].confidence, None);
}

#[test]
fn test_parse_candidates_empty_and_invalid() {
    assert!(parse_candidates("   ").unwrap().is_empty());
    assert!(parse_candidates("{}").unwrap().is_empty());

    let err = parse_candidates("I think this is Paris").unwrap_err();
    assert!(matches!(err, ProviderError::MalformedResponse(_)));
}

#[test]
fn test_strip_code_fence() {
    assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
    assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
}

#[test]
fn test_sniff_image_mime() {
    assert_eq!(sniff_image_mime(b"\x89PNG\r\n\x1a\n"), "image/png");
    assert_eq!(sniff_image_mime(b"GIF89a"), "image/gif");
    assert_eq!(sniff_image_mime(b"RIFF\0\0\0\0WEBPVP8 "), "image/webp");
    assert_eq!(sniff_image_mime(b"\xff\xd8\xff\xe0"), "image/jpeg");
    assert_eq!(sniff_image_mime(b""), "image/jpeg");
}

#[test]
fn test_name_similarity() {
    assert_eq!(name_similarity("Eiffel Tower", "eiffel tower"), 1.0);
    assert_eq!(name_similarity("Tower Bridge", "Eiffel Tower"), 1.0 / 3.0);
    assert_eq!(name_similarity("", "Louvre"), 0.0);
}

#[test]
fn test_classify_source() {
    assert_eq!(
        classify_source("https://en.wikipedia.org/wiki/Eiffel_Tower"),
        SourceKind::Wiki
    );
    assert_eq!(
        classify_source("https://www.nps.gov/stli/index.htm"),
        SourceKind::Official
    );
    assert_eq!(
        classify_source("https://travel.blogspot.com/paris"),
        SourceKind::Blog
    );
    assert_eq!(classify_source("https://example.com/x"), SourceKind::Web);
    assert_eq!(classify_source("not a url"), SourceKind::Web);
}

#[test]
fn test_place_query_for_candidate_ignores_blank_name() {
    let candidate = Candidate::named("  ").with_coordinates(1.0, 2.0);
    let query = PlaceQuery::for_candidate(&candidate);
    assert_eq!(query.name, None);
    assert_eq!(query.coordinates(), Some((1.0, 2.0)));
}

#[tokio::test]
async fn test_unconfigured_fails_with_provider_name() {
    let vision = Unconfigured::new("vision");
    let err = vision.recognize(b"img", "prompt").await.unwrap_err();
    assert_eq!(err.to_string(), "vision is not configured");
}

#[tokio::test(start_paused = true)]
async fn test_with_timeout_maps_elapsed_to_timeout_error() {
    let slow = MockVisionRecognizer::returning(vec![]).with_delay(Duration::from_secs(30));

    let result = with_timeout(
        "vision",
        Duration::from_secs(20),
        slow.recognize(b"img", "p"),
    )
    .await;

    let err = result.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Timeout { timeout, .. } if timeout == Duration::from_secs(20)
    ));
    assert_eq!(err.to_string(), "vision timed out after 20s");
}

#[tokio::test(start_paused = true)]
async fn test_with_timeout_reports_sub_second_timeouts() {
    let slow = MockVisionRecognizer::returning(vec![]).with_delay(Duration::from_secs(1));

    let err = with_timeout(
        "ocr",
        Duration::from_millis(500),
        slow.recognize(b"img", "p"),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "ocr timed out after 500ms");
}

#[tokio::test]
async fn test_with_timeout_passes_result_through() {
    let fast = MockVisionRecognizer::returning(vec![Candidate::named("x")]);
    let result = with_timeout("vision", Duration::from_secs(1), fast.recognize(b"", "")).await;
    assert_eq!(result.unwrap().len(), 1);
}

#[test]
fn test_upstream_error_truncates_body() {
    let body = "x".repeat(1_000);
    let err = ProviderError::upstream(reqwest::StatusCode::BAD_GATEWAY, &body);
    match err {
        ProviderError::Upstream { status, body } => {
            assert_eq!(status, 502);
            assert_eq!(body.len(), 256);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_mock_journal_records_order_across_providers() {
    let mocks = MockProviders::new()
        .with_places(MockPlaceLookup::empty().with_name("Louvre", vec![PlaceRecord::default()]));
    let providers = mocks.providers();

    let records = providers
        .places
        .lookup(PlaceQuery {
            name: Some("Louvre"),
            ..Default::default()
        })
        .await
        .unwrap();
    providers.search.search_and_summarize("Louvre", 3).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(mocks.journal.entries(), ["places:Louvre", "search:Louvre"]);
    assert_eq!(mocks.total_calls(), 2);
}

#[test]
fn test_providers_from_default_config_degrade_without_credentials() {
    let providers = Providers::from_config(&Config::default()).unwrap();
    assert!(format!("{providers:?}").contains("Providers"));
}
