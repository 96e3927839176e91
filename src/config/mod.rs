//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `SIGHTLINE_*` environment variables; values are
//! read once at startup and validated before the server is built.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::constants::{
    DEFAULT_CACHE_PURGE_INTERVAL_SECS, DEFAULT_CACHE_TTL_SECS, DEFAULT_CONFIDENCE_THRESHOLD,
    DEFAULT_MAX_IMAGE_BYTES, DEFAULT_PROVIDER_TIMEOUT_SECS,
};

/// Default Gemini model used for vision recognition and OCR.
pub const DEFAULT_VISION_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Web search backend selection.
pub enum SearchBackendKind {
    /// Google Programmable Search (needs an API key and engine id).
    Google,
    /// Bing Web Search v7 (needs an API key).
    Bing,
    #[default]
    /// DuckDuckGo Instant Answer (no key).
    DuckDuckGo,
}

impl FromStr for SearchBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "bing" => Ok(Self::Bing),
            "duckduckgo" | "ddg" => Ok(Self::DuckDuckGo),
            _ => Err(ConfigError::UnknownSearchBackend {
                value: s.to_string(),
            }),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `SIGHTLINE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Try the vision recognizer first. Default: `true`.
    pub use_vision: bool,

    /// Gemini credential for vision recognition and OCR.
    pub gemini_api_key: Option<SecretString>,

    /// Gemini model id for vision and OCR. Default: [`DEFAULT_VISION_MODEL`].
    pub vision_model: String,

    /// Google Places credential for structured lookup.
    pub maps_api_key: Option<SecretString>,

    /// Web search backend. Default: DuckDuckGo.
    pub search_backend: SearchBackendKind,

    /// Credential for the Google or Bing search backends.
    pub search_api_key: Option<SecretString>,

    /// Google Programmable Search engine id (`cx`).
    pub search_engine_id: Option<String>,

    /// `genai` model id used for the narrative summary. Unset disables narration.
    pub narrative_model: Option<String>,

    /// Result cache TTL. Default: 24h.
    pub cache_ttl: Duration,

    /// Interval between expired-entry sweeps. Default: 5 minutes.
    pub cache_purge_interval: Duration,

    /// Lookup eligibility threshold in `[0, 1]`. Default: `0.6`.
    pub confidence_threshold: f32,

    /// Timeout applied to each provider call. Default: 20s.
    pub provider_timeout: Duration,

    /// Largest accepted image upload in bytes. Default: 10 MiB.
    pub max_image_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            use_vision: true,
            gemini_api_key: None,
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            maps_api_key: None,
            search_backend: SearchBackendKind::default(),
            search_api_key: None,
            search_engine_id: None,
            narrative_model: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_purge_interval: Duration::from_secs(DEFAULT_CACHE_PURGE_INTERVAL_SECS),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "SIGHTLINE_PORT";
    const ENV_BIND_ADDR: &'static str = "SIGHTLINE_BIND_ADDR";
    const ENV_USE_VISION: &'static str = "SIGHTLINE_USE_VISION";
    const ENV_GEMINI_API_KEY: &'static str = "SIGHTLINE_GEMINI_API_KEY";
    const ENV_VISION_MODEL: &'static str = "SIGHTLINE_VISION_MODEL";
    const ENV_MAPS_API_KEY: &'static str = "SIGHTLINE_MAPS_API_KEY";
    const ENV_SEARCH_BACKEND: &'static str = "SIGHTLINE_SEARCH_BACKEND";
    const ENV_SEARCH_API_KEY: &'static str = "SIGHTLINE_SEARCH_API_KEY";
    const ENV_SEARCH_ENGINE_ID: &'static str = "SIGHTLINE_SEARCH_ENGINE_ID";
    const ENV_NARRATIVE_MODEL: &'static str = "SIGHTLINE_NARRATIVE_MODEL";
    const ENV_CACHE_TTL_SECS: &'static str = "SIGHTLINE_CACHE_TTL_SECS";
    const ENV_CACHE_PURGE_INTERVAL_SECS: &'static str = "SIGHTLINE_CACHE_PURGE_INTERVAL_SECS";
    const ENV_CONFIDENCE_THRESHOLD: &'static str = "SIGHTLINE_CONFIDENCE_THRESHOLD";
    const ENV_PROVIDER_TIMEOUT_SECS: &'static str = "SIGHTLINE_PROVIDER_TIMEOUT_SECS";
    const ENV_MAX_IMAGE_BYTES: &'static str = "SIGHTLINE_MAX_IMAGE_BYTES";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = Self::parse_port_from_env(defaults.port)?;
        let bind_addr = Self::parse_bind_addr_from_env(defaults.bind_addr)?;
        let use_vision = Self::parse_bool_from_env(Self::ENV_USE_VISION, defaults.use_vision);
        let gemini_api_key = Self::parse_secret_from_env(Self::ENV_GEMINI_API_KEY);
        let vision_model = Self::parse_string_from_env(Self::ENV_VISION_MODEL, defaults.vision_model);
        let maps_api_key = Self::parse_secret_from_env(Self::ENV_MAPS_API_KEY);
        let search_backend = match Self::parse_optional_string_from_env(Self::ENV_SEARCH_BACKEND) {
            Some(value) => value.parse()?,
            None => defaults.search_backend,
        };
        let search_api_key = Self::parse_secret_from_env(Self::ENV_SEARCH_API_KEY);
        let search_engine_id = Self::parse_optional_string_from_env(Self::ENV_SEARCH_ENGINE_ID);
        let narrative_model = Self::parse_optional_string_from_env(Self::ENV_NARRATIVE_MODEL);
        let cache_ttl = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_CACHE_TTL_SECS,
            defaults.cache_ttl.as_secs(),
        )?);
        let cache_purge_interval = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_CACHE_PURGE_INTERVAL_SECS,
            defaults.cache_purge_interval.as_secs(),
        )?);
        let confidence_threshold = Self::parse_number_from_env(
            Self::ENV_CONFIDENCE_THRESHOLD,
            defaults.confidence_threshold,
        )?;
        let provider_timeout = Duration::from_secs(Self::parse_number_from_env(
            Self::ENV_PROVIDER_TIMEOUT_SECS,
            defaults.provider_timeout.as_secs(),
        )?);
        let max_image_bytes =
            Self::parse_number_from_env(Self::ENV_MAX_IMAGE_BYTES, defaults.max_image_bytes)?;

        Ok(Self {
            port,
            bind_addr,
            use_vision,
            gemini_api_key,
            vision_model,
            maps_api_key,
            search_backend,
            search_api_key,
            search_engine_id,
            narrative_model,
            cache_ttl,
            cache_purge_interval,
            confidence_threshold,
            provider_timeout,
            max_image_bytes,
        })
    }

    /// Validates ranges and backend credentials.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                value: self.confidence_threshold,
            });
        }

        if self.cache_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: Self::ENV_CACHE_TTL_SECS,
            });
        }

        if self.cache_purge_interval.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: Self::ENV_CACHE_PURGE_INTERVAL_SECS,
            });
        }

        if self.provider_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: Self::ENV_PROVIDER_TIMEOUT_SECS,
            });
        }

        if self.max_image_bytes == 0 {
            return Err(ConfigError::ZeroImageLimit);
        }

        match self.search_backend {
            SearchBackendKind::Google => {
                if self.search_api_key.is_none() {
                    return Err(ConfigError::MissingEnvVar {
                        name: Self::ENV_SEARCH_API_KEY,
                    });
                }
                if self.search_engine_id.is_none() {
                    return Err(ConfigError::MissingEnvVar {
                        name: Self::ENV_SEARCH_ENGINE_ID,
                    });
                }
            }
            SearchBackendKind::Bing => {
                if self.search_api_key.is_none() {
                    return Err(ConfigError::MissingEnvVar {
                        name: Self::ENV_SEARCH_API_KEY,
                    });
                }
            }
            SearchBackendKind::DuckDuckGo => {}
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_bool_from_env(var_name: &str, default: bool) -> bool {
        env::var(var_name)
            .map(|s| {
                let s = s.trim().to_lowercase();
                s != "false" && s != "0"
            })
            .unwrap_or(default)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_secret_from_env(var_name: &str) -> Option<SecretString> {
        Self::parse_optional_string_from_env(var_name).map(SecretString::from)
    }

    fn parse_number_from_env<T: FromStr>(
        var_name: &'static str,
        default: T,
    ) -> Result<T, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                }),
            None => Ok(default),
        }
    }
}
