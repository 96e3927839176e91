//! Per-candidate enrichment and chosen-place selection.
//!
//! Each ranked candidate either goes to structured place lookup (when it is confident enough
//! or carries a full coordinate) or to web search (when it has a name and lookup was skipped or
//! found nothing). The first candidate to produce a lookup record or a web summary becomes the
//! chosen place; later candidates still add their records and summaries to the aggregate but
//! never replace it.

pub mod resolver;


pub use resolver::{EnrichmentResolver, Resolution};
