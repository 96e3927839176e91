//! Result cache with TTL expiry and an injectable clock.

pub mod clock;
pub mod ttl;
pub mod types;


#[cfg(any(test, feature = "mock"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use ttl::{ResultCache, TtlCache, TtlCacheHandle};
pub use types::{CacheEntry, CacheStatus, SIGHTLINE_STATUS_HEADER};
