//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// A numeric setting could not be parsed.
    #[error("failed to parse {name}='{value}' as a number")]
    InvalidNumber { name: &'static str, value: String },

    /// Search backend name is not one of `google`, `bing`, `duckduckgo`.
    #[error("unknown search backend '{value}': expected google, bing or duckduckgo")]
    UnknownSearchBackend { value: String },

    /// Confidence threshold is outside `[0, 1]`.
    #[error("confidence threshold {value} is outside [0, 1]")]
    ThresholdOutOfRange { value: f32 },

    /// A duration setting was zero.
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },

    /// Image size limit was zero.
    #[error("SIGHTLINE_MAX_IMAGE_BYTES must be greater than zero")]
    ZeroImageLimit,

    /// A variable required by the selected configuration was not set.
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },
}
