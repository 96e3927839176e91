use thiserror::Error;

/// Request-level failures. Provider failures never appear here; the pipeline recovers from them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// The request carried no image bytes.
    #[error("image is empty")]
    EmptyImage,

    /// The image id was blank.
    #[error("image_id must not be blank")]
    MissingImageId,
}

impl PipelineError {
    /// Returns `true` when the caller sent bad input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, PipelineError::EmptyImage | PipelineError::MissingImageId)
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
