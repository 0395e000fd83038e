use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use boxoffice_domain::cache::EventCache;
use boxoffice_domain::repository::{EventRepository, TicketRepository};
use boxoffice_domain::{
    DomainError, Event, NewEvent, Page, PageRequest, SortDirection, SortKey, Ticket, TicketStatus,
};

#[derive(Default)]
struct Inner {
    events: BTreeMap<i64, Event>,
    tickets: BTreeMap<i64, Ticket>,
    next_event_id: i64,
    next_ticket_id: i64,
}

/// In-memory store implementing both repositories, for single-process
/// deployments and tests. Same observable semantics as the Postgres
/// backend, including the smallest-id tie-break and batch release.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let mut inner = self.inner.lock().expect("store poisoned");
        f(&mut inner)
    }
}

fn compare_events(a: &Event, b: &Event, sort: SortKey) -> std::cmp::Ordering {
    match sort {
        SortKey::Id => a.id.cmp(&b.id),
        SortKey::Name => a.name.cmp(&b.name).then(a.id.cmp(&b.id)),
        SortKey::Venue => a.venue.cmp(&b.venue).then(a.id.cmp(&b.id)),
        SortKey::EventDate => a.event_date.cmp(&b.event_date).then(a.id.cmp(&b.id)),
    }
}

#[async_trait]
impl EventRepository for InMemoryStore {
    async fn insert(&self, event: &NewEvent) -> Result<Event, DomainError> {
        Ok(self.with_inner(|inner| {
            inner.next_event_id += 1;
            let id = inner.next_event_id;

            let stored = Event {
                id,
                name: event.name.clone(),
                venue: event.venue.clone(),
                event_date: event.event_date,
                total_tickets: event.total_tickets,
                available_tickets: None,
            };
            inner.events.insert(id, stored.clone());

            let now = Utc::now();
            for _ in 0..event.total_tickets {
                inner.next_ticket_id += 1;
                let ticket_id = inner.next_ticket_id;
                inner.tickets.insert(
                    ticket_id,
                    Ticket {
                        id: ticket_id,
                        event_id: id,
                        status: TicketStatus::Available,
                        customer_email: None,
                        reserved_until: None,
                        created_at: now,
                    },
                );
            }

            stored
        }))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, DomainError> {
        Ok(self.with_inner(|inner| inner.events.get(&id).cloned()))
    }

    async fn list_all(&self) -> Result<Vec<Event>, DomainError> {
        Ok(self.with_inner(|inner| inner.events.values().cloned().collect()))
    }

    async fn list_paged(&self, request: &PageRequest) -> Result<Page<Event>, DomainError> {
        Ok(self.with_inner(|inner| {
            let mut events: Vec<Event> = inner.events.values().cloned().collect();
            events.sort_by(|a, b| {
                let ordering = compare_events(a, b, request.sort);
                match request.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });

            let total = events.len() as i64;
            let content: Vec<Event> = events
                .into_iter()
                .skip(request.offset() as usize)
                .take(request.size as usize)
                .collect();

            Page::new(content, request, total)
        }))
    }

    async fn list_with_available_tickets(&self) -> Result<Vec<Event>, DomainError> {
        Ok(self.with_inner(|inner| {
            let with_inventory: BTreeSet<i64> = inner
                .tickets
                .values()
                .filter(|t| t.is_available())
                .map(|t| t.event_id)
                .collect();

            inner
                .events
                .values()
                .filter(|e| with_inventory.contains(&e.id))
                .cloned()
                .collect()
        }))
    }
}

#[async_trait]
impl TicketRepository for InMemoryStore {
    async fn find_available_by_event(&self, event_id: i64) -> Result<Vec<Ticket>, DomainError> {
        Ok(self.with_inner(|inner| {
            inner
                .tickets
                .values()
                .filter(|t| t.event_id == event_id && t.is_available())
                .cloned()
                .collect()
        }))
    }

    async fn find_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>, DomainError> {
        Ok(self.with_inner(|inner| {
            inner
                .tickets
                .values()
                .filter(|t| t.customer_email.as_deref() == Some(email))
                .cloned()
                .collect()
        }))
    }

    async fn count_available_by_event(&self, event_id: i64) -> Result<i64, DomainError> {
        Ok(self.with_inner(|inner| {
            inner
                .tickets
                .values()
                .filter(|t| t.event_id == event_id && t.is_available())
                .count() as i64
        }))
    }

    async fn reserve_first_available(
        &self,
        event_id: i64,
        customer_email: &str,
        reserved_until: DateTime<Utc>,
    ) -> Result<Option<Ticket>, DomainError> {
        Ok(self.with_inner(|inner| {
            // BTreeMap iteration order gives the smallest-id tie-break.
            let candidate = inner
                .tickets
                .values()
                .find(|t| t.event_id == event_id && t.is_available())
                .map(|t| t.id);

            candidate.map(|id| {
                let ticket = inner.tickets.get_mut(&id).expect("candidate exists");
                ticket.status = TicketStatus::Reserved;
                ticket.customer_email = Some(customer_email.to_string());
                ticket.reserved_until = Some(reserved_until);
                ticket.clone()
            })
        }))
    }

    async fn release_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, DomainError> {
        Ok(self.with_inner(|inner| {
            let mut event_ids = BTreeSet::new();

            for ticket in inner.tickets.values_mut() {
                if ticket.is_expired(now) {
                    ticket.status = TicketStatus::Available;
                    ticket.customer_email = None;
                    ticket.reserved_until = None;
                    event_ids.insert(ticket.event_id);
                }
            }

            event_ids.into_iter().collect()
        }))
    }
}

/// In-memory cache with the same eviction semantics as the Redis backend.
/// Entries do not age out; only eviction removes them.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventCache for InMemoryCache {
    async fn get(&self, cache: &str, key: &str) -> Option<String> {
        let entries = self.entries.lock().expect("cache poisoned");
        entries.get(&format!("{}::{}", cache, key)).cloned()
    }

    async fn put(&self, cache: &str, key: &str, value: &str) {
        let mut entries = self.entries.lock().expect("cache poisoned");
        entries.insert(format!("{}::{}", cache, key), value.to_string());
    }

    async fn evict(&self, caches: &[&str]) {
        let mut entries = self.entries.lock().expect("cache poisoned");
        for cache in caches {
            let prefix = format!("{}::", cache);
            entries.retain(|key, _| !key.starts_with(&prefix));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_event(total: i32) -> NewEvent {
        NewEvent {
            name: "Spring Concert".to_string(),
            venue: "MSG".to_string(),
            event_date: Utc::now() + Duration::days(30),
            total_tickets: total,
        }
    }

    #[tokio::test]
    async fn insert_seeds_full_inventory() {
        let store = InMemoryStore::new();

        let event = store.insert(&new_event(3)).await.unwrap();
        assert_eq!(store.count_available_by_event(event.id).await.unwrap(), 3);
        assert_eq!(
            store.find_available_by_event(event.id).await.unwrap().len(),
            3
        );
    }

    #[tokio::test]
    async fn reserve_takes_smallest_id_first() {
        let store = InMemoryStore::new();
        let event = store.insert(&new_event(3)).await.unwrap();
        let until = Utc::now() + Duration::minutes(10);

        let first = store
            .reserve_first_available(event.id, "a@example.com", until)
            .await
            .unwrap()
            .unwrap();
        let second = store
            .reserve_first_available(event.id, "b@example.com", until)
            .await
            .unwrap()
            .unwrap();

        assert!(first.id < second.id);
        assert_eq!(store.count_available_by_event(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reserve_returns_none_when_exhausted() {
        let store = InMemoryStore::new();
        let event = store.insert(&new_event(1)).await.unwrap();
        let until = Utc::now() + Duration::minutes(10);

        store
            .reserve_first_available(event.id, "a@example.com", until)
            .await
            .unwrap()
            .unwrap();
        let none = store
            .reserve_first_available(event.id, "b@example.com", until)
            .await
            .unwrap();

        assert!(none.is_none());
    }

    #[tokio::test]
    async fn release_expired_reopens_and_reports_events() {
        let store = InMemoryStore::new();
        let event = store.insert(&new_event(2)).await.unwrap();
        let until = Utc::now() + Duration::minutes(10);

        store
            .reserve_first_available(event.id, "a@example.com", until)
            .await
            .unwrap();

        // Not yet expired.
        assert!(store.release_expired(Utc::now()).await.unwrap().is_empty());

        // Inclusive boundary: a lease ending exactly now is reclaimed.
        let released = store.release_expired(until).await.unwrap();
        assert_eq!(released, vec![event.id]);
        assert_eq!(store.count_available_by_event(event.id).await.unwrap(), 2);

        // Idempotent: nothing left to reclaim.
        assert!(store.release_expired(until).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paged_listing_sorts_and_slices() {
        let store = InMemoryStore::new();
        for name in ["Cello Night", "Aria Gala", "Brass Evening"] {
            let mut event = new_event(1);
            event.name = name.to_string();
            store.insert(&event).await.unwrap();
        }

        let request = PageRequest::parse(Some(0), Some(2), Some("name")).unwrap();
        let page = store.list_paged(&request).await.unwrap();

        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
        let names: Vec<&str> = page.content.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Aria Gala", "Brass Evening"]);
    }

    #[tokio::test]
    async fn cache_eviction_is_per_cache_prefix() {
        let cache = InMemoryCache::new();
        cache.put("events", "1", "{}").await;
        cache.put("events-list", "all", "[]").await;

        cache.evict(&["events"]).await;

        assert!(cache.get("events", "1").await.is_none());
        assert!(cache.get("events-list", "all").await.is_some());
    }
}
