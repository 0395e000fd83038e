use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use std::collections::BTreeSet;
use tracing::info;

use boxoffice_domain::repository::TicketRepository;
use boxoffice_domain::{DomainError, Ticket, TicketStatus};

use crate::db_err;

pub struct PostgresTicketRepository {
    pool: Pool<Postgres>,
}

#[derive(FromRow)]
struct TicketRow {
    id: i64,
    event_id: i64,
    customer_email: Option<String>,
    status: String,
    reserved_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TicketRow {
    fn into_ticket(self) -> Result<Ticket, DomainError> {
        let status: TicketStatus = self
            .status
            .parse()
            .map_err(|e: String| DomainError::Internal(e))?;

        Ok(Ticket {
            id: self.id,
            event_id: self.event_id,
            status,
            customer_email: self.customer_email,
            reserved_until: self.reserved_until,
            created_at: self.created_at,
        })
    }
}

const SELECT_TICKET: &str =
    "SELECT id, event_id, customer_email, status, reserved_until, created_at FROM tickets";

impl PostgresTicketRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TicketRepository for PostgresTicketRepository {
    async fn find_available_by_event(&self, event_id: i64) -> Result<Vec<Ticket>, DomainError> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "{} WHERE event_id = $1 AND status = 'AVAILABLE' ORDER BY id",
            SELECT_TICKET
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn find_by_customer_email(&self, email: &str) -> Result<Vec<Ticket>, DomainError> {
        let rows: Vec<TicketRow> = sqlx::query_as(&format!(
            "{} WHERE customer_email = $1 ORDER BY id",
            SELECT_TICKET
        ))
        .bind(email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(TicketRow::into_ticket).collect()
    }

    async fn count_available_by_event(&self, event_id: i64) -> Result<i64, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND status = 'AVAILABLE'",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(count)
    }

    async fn reserve_first_available(
        &self,
        event_id: i64,
        customer_email: &str,
        reserved_until: DateTime<Utc>,
    ) -> Result<Option<Ticket>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // No row lock here: the per-event reservation lock already
        // serialises claimants across replicas, so a pessimistic SELECT FOR
        // UPDATE would be redundant.
        let candidate: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM tickets \
             WHERE event_id = $1 AND status = 'AVAILABLE' \
             ORDER BY id LIMIT 1",
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let Some(ticket_id) = candidate else {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        };

        let row: TicketRow = sqlx::query_as(
            "UPDATE tickets \
             SET status = 'RESERVED', customer_email = $2, reserved_until = $3 \
             WHERE id = $1 \
             RETURNING id, event_id, customer_email, status, reserved_until, created_at",
        )
        .bind(ticket_id)
        .bind(customer_email)
        .bind(reserved_until)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        row.into_ticket().map(Some)
    }

    async fn release_expired(&self, now: DateTime<Utc>) -> Result<Vec<i64>, DomainError> {
        // One batch statement: reopening is idempotent, so overlapping
        // reapers cannot double-release.
        let rows: Vec<(i64,)> = sqlx::query_as(
            "UPDATE tickets \
             SET status = 'AVAILABLE', customer_email = NULL, reserved_until = NULL \
             WHERE status = 'RESERVED' AND reserved_until <= $1 \
             RETURNING event_id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        if !rows.is_empty() {
            info!("Released {} expired reservations", rows.len());
        }

        let event_ids: BTreeSet<i64> = rows.into_iter().map(|(id,)| id).collect();
        Ok(event_ids.into_iter().collect())
    }
}
