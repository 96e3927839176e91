use chrono::{DateTime, Utc};

pub const SIGHTLINE_STATUS_HEADER: &str = "X-Sightline-Status";

/// Whether a response was served from the result cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    #[inline]
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

impl std::fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_header_value())
    }
}

/// A stored value and the instant it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    /// An entry is stale once `now - stored_at` reaches `ttl`.
    #[inline]
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: chrono::TimeDelta) -> bool {
        now.signed_duration_since(self.stored_at) >= ttl
    }
}
