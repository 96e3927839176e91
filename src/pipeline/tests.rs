use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::cache::{ManualClock, ResultCache};
use crate::constants::{SUMMARY_UNAVAILABLE, SUMMARY_UNAVAILABLE_SUFFIX};
use crate::model::{
    Candidate, EnrichedPlace, IdentifyRequest, PlaceRecord, ResolvedBy, SourceKind, SourceSummary,
    UserLocation,
};
use crate::providers::{
    MockLandmarkIndex, MockNarrator, MockPlaceLookup, MockProviders, MockTextRecognizer,
    MockVisionRecognizer, MockWebSearcher,
};

const TTL: Duration = Duration::from_secs(3600);

fn pipeline(mocks: &MockProviders) -> IdentifyPipeline {
    pipeline_with(mocks, PipelineSettings::default(), ResultCache::new(TTL))
}

fn pipeline_with(
    mocks: &MockProviders,
    settings: PipelineSettings,
    cache: ResultCache,
) -> IdentifyPipeline {
    IdentifyPipeline::new(mocks.providers(), cache, settings)
}

fn request(id: &str) -> IdentifyRequest {
    IdentifyRequest::new(id, vec![0xFF, 0xD8, 0xFF, 0xE0])
}

fn hit(source: &str, text: &str) -> SourceSummary {
    SourceSummary {
        source: source.to_string(),
        summary: text.to_string(),
        kind: SourceKind::Web,
        reliability: None,
    }
}

#[tokio::test]
async fn test_vision_failure_falls_back_to_local_index() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::failing("quota exceeded"))
        .with_ocr(MockTextRecognizer::returning("PONT NEUF"))
        .with_index(MockLandmarkIndex::returning(vec![
            Candidate::named("Pont Neuf").with_confidence(0.4),
        ]))
        .with_search(MockWebSearcher::returning(vec![hit("https://w", "a bridge")]));

    let result = pipeline(&mocks).identify(request("img_1")).await.unwrap();
    let envelope = result.envelope;

    assert_eq!(result.status, CacheStatus::Miss);
    assert_eq!(envelope.candidates.len(), 1);
    assert_eq!(
        mocks.index.searches(),
        [(Some("PONT NEUF".to_string()), 5)]
    );
    assert_eq!(
        &envelope.logs[..6],
        [
            "use_gemini_multimodal",
            "gemini_error:quota exceeded",
            "ocr_done",
            "ocr_used_for_disambiguation",
            "local_candidates:1",
            "websearch_for:Pont Neuf",
        ]
    );
    let place = envelope.place.expect("chosen place");
    assert_eq!(place.resolved_by, ResolvedBy::Web);
}

#[tokio::test]
async fn test_every_path_empty_yields_null_place_and_web_hits() {
    let mocks = MockProviders::new()
        .with_search(MockWebSearcher::returning(vec![
            hit("https://a", "landmarks"),
            hit("https://b", "more landmarks"),
        ]))
        .with_narrator(MockNarrator::failing("llm down"));

    let envelope = pipeline(&mocks)
        .identify(request("img_empty"))
        .await
        .unwrap()
        .envelope;

    assert!(envelope.candidates.is_empty());
    assert!(envelope.place.is_none());
    assert_eq!(envelope.info.web_hits.len(), 2);
    assert!(envelope.info.sources.is_empty());
    assert_eq!(envelope.info.summary, SUMMARY_UNAVAILABLE);
    assert_eq!(envelope.ui_hints.confidence, 0.0);
    assert_eq!(
        mocks.search.queries(),
        [("landmark in image".to_string(), 5)]
    );
    // Empty primary answer goes to the web-only path without the local fallback.
    assert_eq!(mocks.index.calls(), 0);
    assert_eq!(
        envelope.logs,
        [
            "use_gemini_multimodal",
            "gemini_candidates:0",
            "no_candidates_fallback_to_websearch",
            "web_hits:2",
            "narrative_error:llm down",
        ]
    );
}

#[tokio::test]
async fn test_web_only_search_uses_ocr_text_as_query() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::failing("boom"))
        .with_ocr(MockTextRecognizer::returning("  Rue de Rivoli \n"));

    let envelope = pipeline(&mocks)
        .identify(request("img_ocr"))
        .await
        .unwrap()
        .envelope;

    assert_eq!(mocks.search.queries(), [("Rue de Rivoli".to_string(), 5)]);
    // OCR runs once per request.
    assert_eq!(mocks.ocr.calls(), 1);
    assert!(envelope.logs.contains(&"no_candidates_fallback_to_websearch".to_string()));
    assert!(envelope.logs.contains(&"web_hits:0".to_string()));
}

#[tokio::test]
async fn test_ocr_failure_is_retried_once_on_web_only_path() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::failing("boom"))
        .with_ocr(MockTextRecognizer::failing("ocr offline"));

    let envelope = pipeline(&mocks)
        .identify(request("img_ocr_fail"))
        .await
        .unwrap()
        .envelope;

    assert_eq!(mocks.ocr.calls(), 2);
    assert_eq!(mocks.index.calls(), 0);
    assert_eq!(
        mocks.search.queries(),
        [("landmark in image".to_string(), 5)]
    );
    assert_eq!(
        &envelope.logs[..5],
        [
            "use_gemini_multimodal",
            "gemini_error:boom",
            "local_vision_error:ocr offline",
            "no_candidates_fallback_to_websearch",
            "ocr_error:ocr offline",
        ]
    );
}

#[tokio::test]
async fn test_web_only_search_failure_is_logged() {
    let mocks = MockProviders::new().with_search(MockWebSearcher::failing("rate limited"));

    let envelope = pipeline(&mocks)
        .identify(request("img_ws"))
        .await
        .unwrap()
        .envelope;

    assert!(envelope.info.web_hits.is_empty());
    assert!(
        envelope
            .logs
            .contains(&"websearch_error:rate limited".to_string())
    );
    assert!(!envelope.logs.iter().any(|l| l.starts_with("web_hits")));
}

#[tokio::test]
async fn test_vision_disabled_skips_primary() {
    let mocks = MockProviders::new().with_index(MockLandmarkIndex::returning(vec![
        Candidate::named("Big Ben").with_confidence(0.9),
    ]));
    let settings = PipelineSettings {
        use_vision: false,
        ..PipelineSettings::default()
    };

    let envelope = pipeline_with(&mocks, settings, ResultCache::new(TTL))
        .identify(request("img_nv"))
        .await
        .unwrap()
        .envelope;

    assert_eq!(mocks.vision.calls(), 0);
    assert_eq!(envelope.logs[0], "vision_disabled");
    assert_eq!(envelope.logs[1], "ocr_done");
    assert_eq!(envelope.logs[2], "local_candidates:1");
    assert_eq!(envelope.candidates[0].name.as_deref(), Some("Big Ben"));
}

#[tokio::test]
async fn test_user_location_bias_is_logged_without_reweighting() {
    let mocks = MockProviders::new().with_vision(MockVisionRecognizer::returning(vec![
        Candidate::named("Low").with_confidence(0.2),
        Candidate::named("High").with_confidence(0.8),
    ]));
    let req = request("img_loc").with_location(UserLocation::new(51.5, -0.12).unwrap());

    let envelope = pipeline(&mocks).identify(req).await.unwrap().envelope;

    assert_eq!(envelope.logs[2], "applied_user_location_bias");
    assert_eq!(envelope.candidates[0].confidence, Some(0.8));
    assert_eq!(envelope.candidates[1].confidence, Some(0.2));
}

#[tokio::test]
async fn test_full_flow_with_place_lookup() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::returning(vec![
            Candidate::named("Tower Bridge").with_confidence(0.4),
            Candidate::named("Eiffel Tower")
                .with_confidence(0.9)
                .with_coordinates(48.8584, 2.2945),
        ]))
        .with_places(MockPlaceLookup::empty().with_name(
            "Eiffel Tower",
            vec![PlaceRecord {
                place_id: Some("ChIJ".to_string()),
                name: Some("Eiffel Tower".to_string()),
                match_score: Some(0.97),
                ..Default::default()
            }],
        ))
        .with_narrator(MockNarrator::returning("An iron lattice tower."));

    let envelope = pipeline(&mocks)
        .identify(request("img_eiffel"))
        .await
        .unwrap()
        .envelope;

    assert_eq!(envelope.candidates[0].name.as_deref(), Some("Eiffel Tower"));
    let place = envelope.place.expect("chosen place");
    assert_eq!(place.name.as_deref(), Some("Eiffel Tower"));
    assert_eq!(place.confidence, 0.97);
    assert_eq!(envelope.ui_hints.confidence, 0.97);
    assert_eq!(envelope.ui_hints.suggested_actions.len(), 3);
    assert_eq!(envelope.info.summary, "An iron lattice tower.");
    assert_eq!(envelope.info.places.len(), 1);
    assert_eq!(envelope.image_id, "img_eiffel");
    assert_eq!(mocks.places.calls(), 1);
    assert_eq!(mocks.narrator.calls(), 1);
}

#[tokio::test]
async fn test_narrative_failure_uses_place_name() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::returning(vec![
            Candidate::named("Colosseum").with_confidence(0.3),
        ]))
        .with_narrator(MockNarrator::failing("no model"));

    let envelope = pipeline(&mocks)
        .identify(request("img_col"))
        .await
        .unwrap()
        .envelope;

    assert_eq!(
        envelope.info.summary,
        format!("Colosseum{SUMMARY_UNAVAILABLE_SUFFIX}")
    );
    assert_eq!(
        envelope.logs.last().map(String::as_str),
        Some("narrative_error:no model")
    );
    assert_eq!(
        envelope.place.unwrap().resolved_by,
        ResolvedBy::TopCandidate
    );
}

#[tokio::test]
async fn test_narrative_failure_for_unnamed_place_uses_generic_summary() {
    let mocks = MockProviders::new()
        .with_vision(MockVisionRecognizer::returning(vec![
            Candidate::at(40.6892, -74.0445).with_confidence(0.8),
        ]))
        .with_narrator(MockNarrator::failing("no model"));

    let envelope = pipeline(&mocks)
        .identify(request("img_coords"))
        .await
        .unwrap()
        .envelope;

    let place = envelope.place.unwrap();
    assert_eq!(place.name, None);
    assert_eq!(place.lat, Some(40.6892));
    assert_eq!(envelope.info.summary, SUMMARY_UNAVAILABLE);
    assert_eq!(
        envelope.logs.last().map(String::as_str),
        Some("narrative_error:no model")
    );
}

#[test]
fn test_fallback_summary() {
    assert_eq!(fallback_summary(None), SUMMARY_UNAVAILABLE);

    let unnamed = EnrichedPlace::from_candidate(&Candidate::at(1.0, 2.0));
    assert_eq!(fallback_summary(Some(&unnamed)), SUMMARY_UNAVAILABLE);

    let named = EnrichedPlace::from_candidate(&Candidate::named("Louvre"));
    assert_eq!(
        fallback_summary(Some(&named)),
        "Louvre - information summary not available."
    );
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let mocks = MockProviders::new().with_vision(MockVisionRecognizer::returning(vec![
        Candidate::named("Sagrada Familia").with_confidence(0.95),
    ]));
    let pipeline = pipeline(&mocks);

    let first = pipeline.identify(request("img_same")).await.unwrap();
    let calls = mocks.total_calls();
    let second = pipeline.identify(request("img_same")).await.unwrap();

    assert_eq!(first.status, CacheStatus::Miss);
    assert_eq!(second.status, CacheStatus::Hit);
    assert!(second.is_cached());
    assert_eq!(first.envelope, second.envelope);
    assert_eq!(mocks.total_calls(), calls);
    assert!(pipeline.cache().get("imghash:img_same").is_some());
}

#[tokio::test]
async fn test_cache_is_keyed_by_image_id_only() {
    let mocks = MockProviders::new();
    let pipeline = pipeline(&mocks);

    let first = pipeline.identify(request("img_k")).await.unwrap();
    let other_bytes = IdentifyRequest::new("img_k", vec![1, 2, 3]);
    let second = pipeline.identify(other_bytes).await.unwrap();

    assert!(second.is_cached());
    assert_eq!(first.envelope, second.envelope);
}

#[tokio::test]
async fn test_expired_entry_triggers_recompute() {
    let clock = ManualClock::default();
    let cache = ResultCache::with_clock(TTL, Arc::new(clock.clone()));
    let mocks = MockProviders::new();
    let pipeline = pipeline_with(&mocks, PipelineSettings::default(), cache);

    let first = pipeline.identify(request("img_ttl")).await.unwrap();
    assert_eq!(first.envelope.timestamp, 1_700_000_000);

    clock.advance(TTL);
    let second = pipeline.identify(request("img_ttl")).await.unwrap();

    assert_eq!(second.status, CacheStatus::Miss);
    assert_eq!(second.envelope.timestamp, 1_700_000_000 + 3600);
    assert_eq!(mocks.vision.calls(), 2);
}

#[tokio::test]
async fn test_invalid_input_is_rejected_before_any_provider_call() {
    let mocks = MockProviders::new();
    let pipeline = pipeline(&mocks);

    let empty = pipeline
        .identify(IdentifyRequest::new("img_x", Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(empty, PipelineError::EmptyImage);
    assert!(empty.is_invalid_input());

    let blank = pipeline
        .identify(IdentifyRequest::new("  ", vec![1]))
        .await
        .unwrap_err();
    assert_eq!(blank, PipelineError::MissingImageId);

    assert_eq!(mocks.total_calls(), 0);
    assert!(pipeline.cache().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_vision_times_out_and_falls_back() {
    let mocks = MockProviders::new()
        .with_vision(
            MockVisionRecognizer::returning(vec![Candidate::named("Never")])
                .with_delay(Duration::from_secs(60)),
        )
        .with_index(MockLandmarkIndex::returning(vec![
            Candidate::named("Fallback").with_confidence(0.5),
        ]));
    let settings = PipelineSettings {
        provider_timeout: Duration::from_secs(5),
        ..PipelineSettings::default()
    };

    let envelope = pipeline_with(&mocks, settings, ResultCache::new(TTL))
        .identify(request("img_slow"))
        .await
        .unwrap()
        .envelope;

    assert_eq!(envelope.logs[1], "gemini_error:vision timed out after 5s");
    assert_eq!(envelope.candidates[0].name.as_deref(), Some("Fallback"));
}

#[tokio::test]
async fn test_candidates_are_ranked_and_capped() {
    let candidates = (0..8)
        .map(|i| Candidate::named(format!("c{i}")).with_confidence(i as f32 / 10.0))
        .collect();
    let mocks = MockProviders::new().with_vision(MockVisionRecognizer::returning(candidates));

    let envelope = pipeline(&mocks)
        .identify(request("img_rank"))
        .await
        .unwrap()
        .envelope;

    let names: Vec<_> = envelope
        .candidates
        .iter()
        .filter_map(|c| c.name.as_deref())
        .collect();
    assert_eq!(names, ["c7", "c6", "c5", "c4", "c3"]);
}

#[test]
fn test_settings_from_config() {
    let config = crate::config::Config {
        use_vision: false,
        confidence_threshold: 0.75,
        provider_timeout: Duration::from_secs(3),
        ..Default::default()
    };
    let settings = PipelineSettings::from_config(&config);
    assert!(!settings.use_vision);
    assert_eq!(settings.confidence_threshold, 0.75);
    assert_eq!(settings.provider_timeout, Duration::from_secs(3));
}
