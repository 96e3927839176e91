use thiserror::Error;

/// Failure of an external provider call.
///
/// The pipeline never surfaces these to callers; they select a fallback path and are recorded
/// in the decision log using their `Display` text.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No backend is configured for this capability.
    #[error("{provider} is not configured")]
    NotConfigured {
        /// Capability name.
        provider: &'static str,
    },

    /// The call did not finish within the provider timeout.
    #[error("{provider} timed out after {timeout:?}")]
    Timeout {
        /// Capability name.
        provider: &'static str,
        /// Timeout that elapsed.
        timeout: std::time::Duration,
    },

    /// Transport failure.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the upstream API.
    #[error("upstream returned {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated).
        body: String,
    },

    /// The upstream answered but the payload could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// LLM generation failed.
    #[error("generation failed: {0}")]
    Generation(String),

    /// Backend-specific failure that fits no other variant.
    #[error("{0}")]
    Unavailable(String),
}

impl ProviderError {
    const MAX_BODY_CHARS: usize = 256;

    /// Builds [`ProviderError::Upstream`], truncating long bodies.
    pub fn upstream(status: reqwest::StatusCode, body: &str) -> Self {
        let body: String = body.chars().take(Self::MAX_BODY_CHARS).collect();
        ProviderError::Upstream {
            status: status.as_u16(),
            body,
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;
