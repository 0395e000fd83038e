use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use boxoffice_domain::cache::{self, EventCache};
use boxoffice_domain::repository::{EventRepository, TicketRepository};
use boxoffice_domain::validate;
use boxoffice_domain::{DomainError, Event, NewEvent, Page, PageRequest, Ticket};

/// Read path and event creation, with read-through caching.
///
/// Every listing re-derives `available_tickets` from the tickets table via
/// the count cache; nothing here ever writes a count back to the store.
/// Empty list results are not cached, so a freshly-seeded deployment never
/// pins an empty listing for a TTL.
pub struct EventCatalog {
    events: Arc<dyn EventRepository>,
    tickets: Arc<dyn TicketRepository>,
    cache: Arc<dyn EventCache>,
}

impl EventCatalog {
    pub fn new(
        events: Arc<dyn EventRepository>,
        tickets: Arc<dyn TicketRepository>,
        cache: Arc<dyn EventCache>,
    ) -> Self {
        Self {
            events,
            tickets,
            cache,
        }
    }

    /// Validate, persist and seed a new event, then evict the listing
    /// caches so clients see it immediately.
    pub async fn create_event(&self, new_event: NewEvent) -> Result<Event, DomainError> {
        validate::validate_new_event(&new_event, Utc::now())?;

        let mut event = self.events.insert(&new_event).await?;
        event.available_tickets = Some(event.total_tickets);

        self.cache.evict(cache::EVICT_ON_CREATE).await;
        Ok(event)
    }

    pub async fn list_events(&self) -> Result<Vec<Event>, DomainError> {
        if let Some(hit) = self.cached::<Vec<Event>>(cache::EVENTS_LIST, cache::LIST_KEY).await {
            return Ok(hit);
        }

        let mut events = self.events.list_all().await?;
        self.fill_available_counts(&mut events).await?;

        if !events.is_empty() {
            self.store(cache::EVENTS_LIST, cache::LIST_KEY, &events).await;
        }
        Ok(events)
    }

    pub async fn list_events_paged(&self, request: &PageRequest) -> Result<Page<Event>, DomainError> {
        let key = request.cache_key();
        if let Some(hit) = self.cached::<Page<Event>>(cache::EVENTS_PAGED, &key).await {
            return Ok(hit);
        }

        let mut page = self.events.list_paged(request).await?;
        self.fill_available_counts(&mut page.content).await?;

        if !page.content.is_empty() {
            self.store(cache::EVENTS_PAGED, &key, &page).await;
        }
        Ok(page)
    }

    pub async fn get_event(&self, id: i64) -> Result<Event, DomainError> {
        validate::validate_event_id(id)?;

        let key = id.to_string();
        if let Some(hit) = self.cached::<Event>(cache::EVENTS, &key).await {
            return Ok(hit);
        }

        let mut event = self
            .events
            .find_by_id(id)
            .await?
            .ok_or(DomainError::EventNotFound(id))?;
        event.available_tickets = Some(self.available_count(id).await? as i32);

        self.store(cache::EVENTS, &key, &event).await;
        Ok(event)
    }

    pub async fn list_available_events(&self) -> Result<Vec<Event>, DomainError> {
        if let Some(hit) = self
            .cached::<Vec<Event>>(cache::AVAILABLE_EVENTS, cache::LIST_KEY)
            .await
        {
            return Ok(hit);
        }

        let mut events = self.events.list_with_available_tickets().await?;
        self.fill_available_counts(&mut events).await?;

        if !events.is_empty() {
            self.store(cache::AVAILABLE_EVENTS, cache::LIST_KEY, &events).await;
        }
        Ok(events)
    }

    /// Available tickets for an event, smallest id first. Uncached: the
    /// full seat list is rarely re-read and staleness here would be
    /// directly user-visible.
    pub async fn list_available_tickets(&self, event_id: i64) -> Result<Vec<Ticket>, DomainError> {
        validate::validate_event_id(event_id)?;

        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(DomainError::EventNotFound(event_id))?;

        self.tickets.find_available_by_event(event_id).await
    }

    /// Every ticket held by this customer, in any state.
    pub async fn list_by_customer(&self, email: &str) -> Result<Vec<Ticket>, DomainError> {
        validate::validate_email(email)?;
        self.tickets.find_by_customer_email(email).await
    }

    /// Count of AVAILABLE tickets, read through the count cache. The
    /// tickets table is the single source of truth; the cache holds the
    /// derived number only until the next write-path eviction or TTL.
    pub async fn available_count(&self, event_id: i64) -> Result<i64, DomainError> {
        let key = event_id.to_string();
        if let Some(hit) = self
            .cached::<i64>(cache::AVAILABLE_TICKETS_COUNT, &key)
            .await
        {
            return Ok(hit);
        }

        let count = self.tickets.count_available_by_event(event_id).await?;
        self.store(cache::AVAILABLE_TICKETS_COUNT, &key, &count).await;
        Ok(count)
    }

    async fn fill_available_counts(&self, events: &mut [Event]) -> Result<(), DomainError> {
        for event in events.iter_mut() {
            event.available_tickets = Some(self.available_count(event.id).await? as i32);
        }
        Ok(())
    }

    async fn cached<T: DeserializeOwned>(&self, cache: &str, key: &str) -> Option<T> {
        let raw = self.cache.get(cache, key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                // Treat a corrupt entry as a miss; the write below replaces it.
                warn!("Discarding undecodable cache entry {}::{}: {}", cache, key, e);
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, cache: &str, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.cache.put(cache, key, &raw).await,
            Err(e) => warn!("Failed to serialise cache entry {}::{}: {}", cache, key, e),
        }
    }
}
