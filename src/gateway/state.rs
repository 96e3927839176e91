use crate::config::Config;
use crate::pipeline::IdentifyPipeline;

/// Shared handler state. Cloned per request; the pipeline is a cheap handle.
#[derive(Debug, Clone)]
pub struct HandlerState {
    pub pipeline: IdentifyPipeline,

    /// Largest accepted `image` field, in bytes.
    pub max_image_bytes: usize,
}

impl HandlerState {
    pub fn new(pipeline: IdentifyPipeline, max_image_bytes: usize) -> Self {
        Self {
            pipeline,
            max_image_bytes,
        }
    }

    pub fn from_config(pipeline: IdentifyPipeline, config: &Config) -> Self {
        Self::new(pipeline, config.max_image_bytes)
    }
}
