//! Pipeline data model.
//!
//! Everything here is plain data: providers produce [`Candidate`]s, [`PlaceRecord`]s and
//! [`SourceSummary`]s, the resolver merges them into at most one [`EnrichedPlace`], and the
//! assembler freezes the result into a [`ResponseEnvelope`].

pub mod candidate;
pub mod envelope;
pub mod place;


pub use candidate::{Candidate, UserLocation};
pub use envelope::{
    ActionKind, AggregatedInfo, IdentifyRequest, ResponseEnvelope, SuggestedAction, UiHints,
};
pub use place::{EnrichedPlace, PlaceRecord, ResolvedBy, SourceKind, SourceSummary};
