//! Scripted provider fakes with call counters.
//!
//! Every fake returns a fixed outcome (or a per-query outcome for lookup and search), counts
//! its calls and appends an entry to a [`CallJournal`] so tests can assert both how often and
//! in which order providers were reached.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::error::{ProviderError, ProviderResult};
use super::{
    LandmarkIndex, NarrativeContext, Narrator, PlaceLookup, PlaceQuery, Providers,
    TextRecognizer, VisionRecognizer, WebSearcher,
};
use crate::model::{Candidate, PlaceRecord, SourceSummary};

/// Scripted outcome: `Err` holds the message of a [`ProviderError::Unavailable`].
pub type Scripted<T> = Result<T, String>;

/// Ordered record of provider calls, shared across fakes.
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Index of the first entry equal to `entry`.
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == entry)
    }
}

#[derive(Debug, Default)]
struct CallStats {
    calls: AtomicUsize,
    journal: Mutex<CallJournal>,
}

impl CallStats {
    fn hit(&self, entry: String) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.lock().push(entry);
    }

    fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn attach(&self, journal: CallJournal) {
        *self.journal.lock() = journal;
    }
}

fn realize<T: Clone>(outcome: &Scripted<T>) -> ProviderResult<T> {
    outcome.clone().map_err(ProviderError::Unavailable)
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[derive(Debug)]
pub struct MockVisionRecognizer {
    outcome: Scripted<Vec<Candidate>>,
    delay: Option<Duration>,
    stats: CallStats,
}

impl MockVisionRecognizer {
    pub fn returning(candidates: Vec<Candidate>) -> Self {
        Self {
            outcome: Ok(candidates),
            delay: None,
            stats: CallStats::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: None,
            stats: CallStats::default(),
        }
    }

    /// Sleeps before answering (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.stats.count()
    }
}

#[async_trait]
impl VisionRecognizer for MockVisionRecognizer {
    async fn recognize(&self, _image: &[u8], _prompt: &str) -> ProviderResult<Vec<Candidate>> {
        self.stats.hit("vision".to_string());
        pause(self.delay).await;
        realize(&self.outcome)
    }
}

#[derive(Debug)]
pub struct MockTextRecognizer {
    outcome: Scripted<String>,
    stats: CallStats,
}

impl MockTextRecognizer {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            stats: CallStats::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            stats: CallStats::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.stats.count()
    }
}

#[async_trait]
impl TextRecognizer for MockTextRecognizer {
    async fn extract_text(&self, _image: &[u8]) -> ProviderResult<String> {
        self.stats.hit("ocr".to_string());
        realize(&self.outcome)
    }
}

#[derive(Debug)]
pub struct MockLandmarkIndex {
    outcome: Scripted<Vec<Candidate>>,
    stats: CallStats,
    hints: Mutex<Vec<(Option<String>, usize)>>,
}

impl MockLandmarkIndex {
    pub fn returning(candidates: Vec<Candidate>) -> Self {
        Self {
            outcome: Ok(candidates),
            stats: CallStats::default(),
            hints: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            stats: CallStats::default(),
            hints: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.stats.count()
    }

    /// `(hint, top_k)` of every search, in call order.
    pub fn searches(&self) -> Vec<(Option<String>, usize)> {
        self.hints.lock().clone()
    }
}

#[async_trait]
impl LandmarkIndex for MockLandmarkIndex {
    async fn search(
        &self,
        _image: &[u8],
        hint: Option<&str>,
        top_k: usize,
    ) -> ProviderResult<Vec<Candidate>> {
        self.stats.hit("index".to_string());
        self.hints.lock().push((hint.map(str::to_string), top_k));
        realize(&self.outcome)
    }
}

/// Owned copy of a [`PlaceQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

#[derive(Debug)]
pub struct MockPlaceLookup {
    by_name: HashMap<String, Scripted<Vec<PlaceRecord>>>,
    fallback: Scripted<Vec<PlaceRecord>>,
    stats: CallStats,
    queries: Mutex<Vec<RecordedQuery>>,
}

impl MockPlaceLookup {
    /// Answers every query with no results.
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    /// Answers every query with `records`.
    pub fn returning(records: Vec<PlaceRecord>) -> Self {
        Self {
            by_name: HashMap::new(),
            fallback: Ok(records),
            stats: CallStats::default(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: Err(message.into()),
            ..Self::empty()
        }
    }

    /// Overrides the answer for queries with this exact name.
    pub fn with_name(mut self, name: impl Into<String>, records: Vec<PlaceRecord>) -> Self {
        self.by_name.insert(name.into(), Ok(records));
        self
    }

    pub fn with_name_failing(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.by_name.insert(name.into(), Err(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.stats.count()
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl PlaceLookup for MockPlaceLookup {
    async fn lookup(&self, query: PlaceQuery<'_>) -> ProviderResult<Vec<PlaceRecord>> {
        let label = query.name.unwrap_or("coord");
        self.stats.hit(format!("places:{label}"));
        self.queries.lock().push(RecordedQuery {
            name: query.name.map(str::to_string),
            lat: query.lat,
            lng: query.lng,
        });
        let outcome = query
            .name
            .and_then(|n| self.by_name.get(n))
            .unwrap_or(&self.fallback);
        realize(outcome)
    }
}

#[derive(Debug)]
pub struct MockWebSearcher {
    by_query: HashMap<String, Scripted<Vec<SourceSummary>>>,
    fallback: Scripted<Vec<SourceSummary>>,
    stats: CallStats,
    queries: Mutex<Vec<(String, usize)>>,
}

impl MockWebSearcher {
    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn returning(summaries: Vec<SourceSummary>) -> Self {
        Self {
            by_query: HashMap::new(),
            fallback: Ok(summaries),
            stats: CallStats::default(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fallback: Err(message.into()),
            ..Self::empty()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>, summaries: Vec<SourceSummary>) -> Self {
        self.by_query.insert(query.into(), Ok(summaries));
        self
    }

    pub fn calls(&self) -> usize {
        self.stats.count()
    }

    /// `(query, top_k)` of every call, in order.
    pub fn queries(&self) -> Vec<(String, usize)> {
        self.queries.lock().clone()
    }
}

#[async_trait]
impl WebSearcher for MockWebSearcher {
    async fn search_and_summarize(
        &self,
        query: &str,
        top_k: usize,
    ) -> ProviderResult<Vec<SourceSummary>> {
        self.stats.hit(format!("search:{query}"));
        self.queries.lock().push((query.to_string(), top_k));
        let outcome = self.by_query.get(query).unwrap_or(&self.fallback);
        realize(outcome).map(|mut s| {
            s.truncate(top_k);
            s
        })
    }
}

#[derive(Debug)]
pub struct MockNarrator {
    outcome: Scripted<String>,
    stats: CallStats,
}

impl MockNarrator {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            stats: CallStats::default(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            stats: CallStats::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.stats.count()
    }
}

#[async_trait]
impl Narrator for MockNarrator {
    async fn narrate(&self, _context: NarrativeContext<'_>) -> ProviderResult<String> {
        self.stats.hit("narrator".to_string());
        realize(&self.outcome)
    }
}

/// A full provider set of fakes sharing one [`CallJournal`].
///
/// Defaults: every provider succeeds with an empty answer and the narrator returns
/// `"narrative"`.
#[derive(Debug, Clone)]
pub struct MockProviders {
    pub vision: Arc<MockVisionRecognizer>,
    pub ocr: Arc<MockTextRecognizer>,
    pub index: Arc<MockLandmarkIndex>,
    pub places: Arc<MockPlaceLookup>,
    pub search: Arc<MockWebSearcher>,
    pub narrator: Arc<MockNarrator>,
    pub journal: CallJournal,
}

impl Default for MockProviders {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProviders {
    pub fn new() -> Self {
        let mocks = Self {
            vision: Arc::new(MockVisionRecognizer::returning(Vec::new())),
            ocr: Arc::new(MockTextRecognizer::returning("")),
            index: Arc::new(MockLandmarkIndex::returning(Vec::new())),
            places: Arc::new(MockPlaceLookup::empty()),
            search: Arc::new(MockWebSearcher::empty()),
            narrator: Arc::new(MockNarrator::returning("narrative")),
            journal: CallJournal::new(),
        };
        mocks.attach_all();
        mocks
    }

    pub fn with_vision(mut self, vision: MockVisionRecognizer) -> Self {
        self.vision = Arc::new(vision);
        self.attach_all();
        self
    }

    pub fn with_ocr(mut self, ocr: MockTextRecognizer) -> Self {
        self.ocr = Arc::new(ocr);
        self.attach_all();
        self
    }

    pub fn with_index(mut self, index: MockLandmarkIndex) -> Self {
        self.index = Arc::new(index);
        self.attach_all();
        self
    }

    pub fn with_places(mut self, places: MockPlaceLookup) -> Self {
        self.places = Arc::new(places);
        self.attach_all();
        self
    }

    pub fn with_search(mut self, search: MockWebSearcher) -> Self {
        self.search = Arc::new(search);
        self.attach_all();
        self
    }

    pub fn with_narrator(mut self, narrator: MockNarrator) -> Self {
        self.narrator = Arc::new(narrator);
        self.attach_all();
        self
    }

    fn attach_all(&self) {
        self.vision.stats.attach(self.journal.clone());
        self.ocr.stats.attach(self.journal.clone());
        self.index.stats.attach(self.journal.clone());
        self.places.stats.attach(self.journal.clone());
        self.search.stats.attach(self.journal.clone());
        self.narrator.stats.attach(self.journal.clone());
    }

    /// Total calls across every provider.
    pub fn total_calls(&self) -> usize {
        self.vision.calls()
            + self.ocr.calls()
            + self.index.calls()
            + self.places.calls()
            + self.search.calls()
            + self.narrator.calls()
    }

    /// Type-erased view for the pipeline.
    pub fn providers(&self) -> Providers {
        Providers {
            vision: self.vision.clone(),
            ocr: self.ocr.clone(),
            index: self.index.clone(),
            places: self.places.clone(),
            search: self.search.clone(),
            narrator: self.narrator.clone(),
        }
    }
}
