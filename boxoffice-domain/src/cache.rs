use async_trait::async_trait;

/// Cache of single events, keyed by event id.
pub const EVENTS: &str = "events";
/// Cache of the full event listing (singleton entry).
pub const EVENTS_LIST: &str = "events-list";
/// Cache of paged event listings, keyed by page, size and sort.
pub const EVENTS_PAGED: &str = "events-paged";
/// Cache of the events-with-inventory listing (singleton entry).
pub const AVAILABLE_EVENTS: &str = "available-events";
/// Cache of per-event AVAILABLE counts, keyed by event id.
pub const AVAILABLE_TICKETS_COUNT: &str = "available-tickets-count";

/// Singleton entry key for the list caches.
pub const LIST_KEY: &str = "all";

/// Caches evicted when an event is created.
pub const EVICT_ON_CREATE: &[&str] = &[EVENTS, EVENTS_LIST, EVENTS_PAGED, AVAILABLE_EVENTS];

/// Caches evicted when a ticket changes state (reserve or reap). Coarse by
/// design: every entry of each named cache goes.
pub const EVICT_ON_TICKET_CHANGE: &[&str] = &[
    AVAILABLE_TICKETS_COUNT,
    EVENTS,
    EVENTS_LIST,
    EVENTS_PAGED,
    AVAILABLE_EVENTS,
];

/// Best-effort read-model cache with per-entry TTL and coarse eviction.
///
/// The cache never owns state: writers evict, readers re-derive from the
/// store. Implementations swallow and log their own failures, so a cache
/// outage degrades reads instead of failing them.
#[async_trait]
pub trait EventCache: Send + Sync {
    /// Fetch a cached JSON value, or `None` on miss or cache failure.
    async fn get(&self, cache: &str, key: &str) -> Option<String>;

    /// Store a JSON value under the cache's TTL.
    async fn put(&self, cache: &str, key: &str, value: &str);

    /// Drop every entry of each named cache.
    async fn evict(&self, caches: &[&str]);
}
