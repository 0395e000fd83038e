use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use boxoffice_domain::cache::{self, EventCache};
use boxoffice_domain::lock::{reservation_lock_key, LockManager};
use boxoffice_domain::repository::{EventRepository, TicketRepository};
use boxoffice_domain::validate;
use boxoffice_domain::{DomainError, Ticket};

/// The reservation pipeline: one linearizable single-seat claim per call.
///
/// Claims on the same event are serialised by the per-event lock; the
/// smallest-available-id tie-break inside the critical section makes the
/// winning seat deterministic across replicas.
pub struct ReservationEngine {
    events: Arc<dyn EventRepository>,
    tickets: Arc<dyn TicketRepository>,
    cache: Arc<dyn EventCache>,
    locks: Arc<dyn LockManager>,
    window: Duration,
    wait_budget: Duration,
    lease_budget: Duration,
}

impl ReservationEngine {
    pub fn new(
        events: Arc<dyn EventRepository>,
        tickets: Arc<dyn TicketRepository>,
        cache: Arc<dyn EventCache>,
        locks: Arc<dyn LockManager>,
        window: Duration,
        wait_budget: Duration,
        lease_budget: Duration,
    ) -> Self {
        Self {
            events,
            tickets,
            cache,
            locks,
            window,
            wait_budget,
            lease_budget,
        }
    }

    /// Reserve one seat for `customer_email` on `event_id`.
    ///
    /// Input validation happens before any side effect; nothing below the
    /// lock is retried here. Cache eviction failures are absorbed by the
    /// backend (TTL self-heals); a failed release is absorbed by the lease
    /// budget.
    pub async fn reserve(
        &self,
        event_id: i64,
        customer_email: &str,
    ) -> Result<Ticket, DomainError> {
        validate::validate_event_id(event_id)?;
        validate::validate_email(customer_email)?;

        // 1. Verify the event exists before contending on the lock.
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(DomainError::EventNotFound(event_id))?;

        info!(
            "Attempting to reserve ticket for event {} by customer {}",
            event_id, customer_email
        );

        // 2. One independent critical section per event.
        let lock_key = reservation_lock_key(event_id);
        let token = self
            .locks
            .acquire(&lock_key, self.wait_budget, self.lease_budget)
            .await?;

        // 3. Select the smallest AVAILABLE seat and commit the lease in one
        //    transaction.
        let reserved_until =
            Utc::now() + ChronoDuration::seconds(self.window.as_secs() as i64);
        let outcome = self
            .tickets
            .reserve_first_available(event_id, customer_email, reserved_until)
            .await;

        // 4. Evict before responding so the next read re-derives counts.
        if matches!(&outcome, Ok(Some(_))) {
            self.cache.evict(cache::EVICT_ON_TICKET_CHANGE).await;
        }

        // 5. Release; after lease expiry this is a no-op.
        self.locks.release(&lock_key, token).await;

        match outcome? {
            Some(ticket) => {
                info!(
                    "Ticket {} reserved successfully for customer {} on event {}",
                    ticket.id, customer_email, event_id
                );
                Ok(ticket)
            }
            None => {
                warn!("No tickets available for event {}", event_id);
                Err(DomainError::NoTicketsAvailable(event_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_domain::cache::EventCache;
    use boxoffice_domain::repository::TicketRepository;
    use boxoffice_domain::{NewEvent, TicketStatus};
    use boxoffice_store::{InMemoryCache, InMemoryStore, LocalLockManager};
    use chrono::Duration as ChronoDuration;
    use std::collections::HashSet;

    const WINDOW: Duration = Duration::from_secs(600);
    const WAIT: Duration = Duration::from_secs(3);
    const LEASE: Duration = Duration::from_secs(10);

    struct Harness {
        engine: Arc<ReservationEngine>,
        store: Arc<InMemoryStore>,
        cache: Arc<InMemoryCache>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let locks = Arc::new(LocalLockManager::new());
        let engine = Arc::new(ReservationEngine::new(
            store.clone(),
            store.clone(),
            cache.clone(),
            locks,
            WINDOW,
            WAIT,
            LEASE,
        ));
        Harness {
            engine,
            store,
            cache,
        }
    }

    async fn seed_event(store: &InMemoryStore, total: i32) -> i64 {
        use boxoffice_domain::repository::EventRepository;
        store
            .insert(&NewEvent {
                name: "Spring Concert".to_string(),
                venue: "MSG".to_string(),
                event_date: Utc::now() + ChronoDuration::days(30),
                total_tickets: total,
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn reserves_one_seat_with_lease_fields() {
        let h = harness();
        let event_id = seed_event(&h.store, 3).await;

        let before = Utc::now();
        let ticket = h.engine.reserve(event_id, "a@example.com").await.unwrap();

        assert_eq!(ticket.status, TicketStatus::Reserved);
        assert_eq!(ticket.customer_email.as_deref(), Some("a@example.com"));

        let until = ticket.reserved_until.unwrap();
        assert!(until >= before + ChronoDuration::minutes(10));
        assert!(until <= Utc::now() + ChronoDuration::minutes(10));

        assert_eq!(h.store.count_available_by_event(event_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_event_is_not_found() {
        let h = harness();

        let err = h.engine.reserve(99999, "a@example.com").await.unwrap_err();
        assert!(matches!(err, DomainError::EventNotFound(99999)));
    }

    #[tokio::test]
    async fn invalid_input_fails_before_any_side_effect() {
        let h = harness();
        let event_id = seed_event(&h.store, 1).await;

        assert!(matches!(
            h.engine.reserve(0, "a@example.com").await.unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            h.engine.reserve(event_id, "").await.unwrap_err(),
            DomainError::Validation(_)
        ));
        assert!(matches!(
            h.engine.reserve(event_id, "invalid-email").await.unwrap_err(),
            DomainError::Validation(_)
        ));

        // The inventory was never touched.
        assert_eq!(h.store.count_available_by_event(event_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn exhausted_inventory_is_a_conflict() {
        let h = harness();
        let event_id = seed_event(&h.store, 1).await;

        h.engine.reserve(event_id, "a@example.com").await.unwrap();
        let err = h.engine.reserve(event_id, "b@example.com").await.unwrap_err();

        assert!(matches!(err, DomainError::NoTicketsAvailable(id) if id == event_id));
    }

    #[tokio::test]
    async fn successful_claim_evicts_availability_caches() {
        let h = harness();
        let event_id = seed_event(&h.store, 2).await;

        h.cache
            .put(cache::AVAILABLE_TICKETS_COUNT, &event_id.to_string(), "2")
            .await;
        h.cache.put(cache::EVENTS_LIST, cache::LIST_KEY, "[]").await;

        h.engine.reserve(event_id, "a@example.com").await.unwrap();

        assert!(h
            .cache
            .get(cache::AVAILABLE_TICKETS_COUNT, &event_id.to_string())
            .await
            .is_none());
        assert!(h.cache.get(cache::EVENTS_LIST, cache::LIST_KEY).await.is_none());
    }

    #[tokio::test]
    async fn failed_claim_leaves_caches_alone() {
        let h = harness();
        let event_id = seed_event(&h.store, 1).await;
        h.engine.reserve(event_id, "a@example.com").await.unwrap();

        h.cache
            .put(cache::AVAILABLE_TICKETS_COUNT, &event_id.to_string(), "0")
            .await;

        let _ = h.engine.reserve(event_id, "b@example.com").await;

        assert!(h
            .cache
            .get(cache::AVAILABLE_TICKETS_COUNT, &event_id.to_string())
            .await
            .is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_claims_never_oversell() {
        let h = harness();
        let event_id = seed_event(&h.store, 3).await;

        let mut handles = Vec::new();
        for i in 0..5 {
            let engine = h.engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .reserve(event_id, &format!("user_{}@example.com", i))
                    .await
            }));
        }

        let mut winners = Vec::new();
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(ticket) => winners.push(ticket.id),
                Err(DomainError::NoTicketsAvailable(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        // Exactly min(N, K) winners, no shared seats.
        assert_eq!(winners.len(), 3);
        assert_eq!(conflicts, 2);
        assert_eq!(winners.iter().collect::<HashSet<_>>().len(), 3);
        assert_eq!(h.store.count_available_by_event(event_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn contended_lock_times_out_as_unavailable() {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(InMemoryCache::new());
        let locks = Arc::new(LocalLockManager::new());
        let engine = ReservationEngine::new(
            store.clone(),
            store.clone(),
            cache,
            locks.clone(),
            WINDOW,
            Duration::from_millis(150),
            LEASE,
        );
        let event_id = seed_event(&store, 1).await;

        // Another claimant owns the critical section for longer than the
        // wait budget.
        let key = reservation_lock_key(event_id);
        let held = locks.acquire(&key, WAIT, LEASE).await.unwrap();

        let err = engine.reserve(event_id, "a@example.com").await.unwrap_err();
        assert!(matches!(err, DomainError::LockUnavailable(_)));

        // The attempt had no side effects.
        assert_eq!(store.count_available_by_event(event_id).await.unwrap(), 1);

        locks.release(&key, held).await;
    }

    #[tokio::test]
    async fn single_seat_two_claimants_one_winner() {
        let h = harness();
        let event_id = seed_event(&h.store, 1).await;

        let (a, b) = tokio::join!(
            h.engine.reserve(event_id, "a@example.com"),
            h.engine.reserve(event_id, "b@example.com"),
        );

        assert!(a.is_ok() != b.is_ok());
    }
}
