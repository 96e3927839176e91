//! Candidate ranking and truncation.
//!
//! Candidates are ordered by descending confidence (missing or NaN read as `0.0`) with a stable
//! sort, so equal confidences keep provider order. Only the first
//! [`MAX_RANKED_CANDIDATES`] survive; everything downstream sees this list only.


use std::cmp::Ordering;
use std::ops::Deref;

use serde::Serialize;

use crate::constants::MAX_RANKED_CANDIDATES;
use crate::model::Candidate;

/// A ranked, truncated candidate list. Constructed only through [`rank_candidates`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct RankedCandidates(Vec<Candidate>);

impl RankedCandidates {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The highest-ranked candidate.
    #[inline]
    pub fn top(&self) -> Option<&Candidate> {
        self.0.first()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Candidate] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.0
    }
}

impl Deref for RankedCandidates {
    type Target = [Candidate];

    fn deref(&self) -> &[Candidate] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a RankedCandidates {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Ranks with the default cap of [`MAX_RANKED_CANDIDATES`].
pub fn rank_candidates(candidates: Vec<Candidate>) -> RankedCandidates {
    rank_candidates_with_limit(candidates, MAX_RANKED_CANDIDATES)
}

pub fn rank_candidates_with_limit(mut candidates: Vec<Candidate>, limit: usize) -> RankedCandidates {
    // `sort_by` is stable; ties keep emission order.
    candidates.sort_by(|a, b| {
        b.confidence_or_zero()
            .partial_cmp(&a.confidence_or_zero())
            .unwrap_or(Ordering::Equal)
    });
    candidates.truncate(limit);
    RankedCandidates(candidates)
}
