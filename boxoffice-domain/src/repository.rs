use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DomainError;
use crate::event::{Event, NewEvent};
use crate::page::{Page, PageRequest};
use crate::ticket::Ticket;

/// Event persistence. `insert` seeds `total_tickets` AVAILABLE tickets in
/// the same transaction as the event row, so the inventory invariant holds
/// from the moment the event is visible.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn insert(&self, event: &NewEvent) -> Result<Event, DomainError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, DomainError>;

    async fn list_all(&self) -> Result<Vec<Event>, DomainError>;

    async fn list_paged(&self, request: &PageRequest) -> Result<Page<Event>, DomainError>;

    /// Events with at least one AVAILABLE ticket, via a join on the tickets
    /// table. Empty when no event has inventory.
    async fn list_with_available_tickets(&self) -> Result<Vec<Event>, DomainError>;
}

/// Ticket persistence. The claim and the reap are the only paths that
/// mutate ticket rows.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    async fn find_available_by_event(&self, event_id: i64) -> Result<Vec<Ticket>, DomainError>;

    async fn find_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>, DomainError>;

    async fn count_available_by_event(&self, event_id: i64) -> Result<i64, DomainError>;

    /// Claim the AVAILABLE ticket with the smallest id for this event:
    /// select and update in one transaction, setting RESERVED,
    /// `customer_email` and `reserved_until`. Returns `None` when the
    /// inventory is exhausted. Callers must hold the per-event reservation
    /// lock; the deterministic tie-break is only meaningful inside it.
    async fn reserve_first_available(
        &self,
        event_id: i64,
        customer_email: &str,
        reserved_until: DateTime<Utc>,
    ) -> Result<Option<Ticket>, DomainError>;

    /// Reopen every RESERVED ticket whose deadline has passed (inclusive),
    /// as one batch update. Returns the distinct event ids touched, for
    /// cache eviction. Idempotent: a second pass with no new expiries is a
    /// no-op.
    async fn release_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, DomainError>;
}
