use async_trait::async_trait;

use super::LandmarkIndex;
use super::error::ProviderResult;
use crate::model::Candidate;

/// Local visual index with no landmarks loaded. Every search succeeds with no matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLandmarkIndex;

#[async_trait]
impl LandmarkIndex for EmptyLandmarkIndex {
    async fn search(
        &self,
        _image: &[u8],
        _hint: Option<&str>,
        _top_k: usize,
    ) -> ProviderResult<Vec<Candidate>> {
        Ok(Vec::new())
    }
}
