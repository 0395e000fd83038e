use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres};
use tracing::info;

use boxoffice_domain::repository::EventRepository;
use boxoffice_domain::{DomainError, Event, NewEvent, Page, PageRequest};

use crate::db_err;

pub struct PostgresEventRepository {
    pool: Pool<Postgres>,
}

#[derive(FromRow)]
struct EventRow {
    id: i64,
    name: String,
    venue: String,
    event_date: DateTime<Utc>,
    total_tickets: i32,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            name: row.name,
            venue: row.venue,
            event_date: row.event_date,
            total_tickets: row.total_tickets,
            available_tickets: None,
        }
    }
}

const SELECT_EVENT: &str = "SELECT id, name, venue, event_date, total_tickets FROM events";

impl PostgresEventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: &NewEvent) -> Result<Event, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row: EventRow = sqlx::query_as(
            "INSERT INTO events (name, venue, event_date, total_tickets) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, name, venue, event_date, total_tickets",
        )
        .bind(&event.name)
        .bind(&event.venue)
        .bind(event.event_date)
        .bind(event.total_tickets)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        // Seed the full inventory in the same transaction: the event is
        // never visible with fewer tickets than total_tickets.
        sqlx::query(
            "INSERT INTO tickets (event_id, status) \
             SELECT $1, 'AVAILABLE' FROM generate_series(1, $2)",
        )
        .bind(row.id)
        .bind(event.total_tickets)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        info!(
            "Created event {} with {} seeded tickets",
            row.id, event.total_tickets
        );

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Event>, DomainError> {
        let row: Option<EventRow> =
            sqlx::query_as(&format!("{} WHERE id = $1", SELECT_EVENT))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(row.map(Event::from))
    }

    async fn list_all(&self) -> Result<Vec<Event>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(&format!("{} ORDER BY id", SELECT_EVENT))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn list_paged(&self, request: &PageRequest) -> Result<Page<Event>, DomainError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

        // Sort column and direction come from closed enums, never from the
        // raw query string.
        let query = format!(
            "{} ORDER BY {} {} LIMIT $1 OFFSET $2",
            SELECT_EVENT,
            request.sort.column(),
            request.direction.sql()
        );

        let rows: Vec<EventRow> = sqlx::query_as(&query)
            .bind(i64::from(request.size))
            .bind(request.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(Page::new(
            rows.into_iter().map(Event::from).collect(),
            request,
            total,
        ))
    }

    async fn list_with_available_tickets(&self) -> Result<Vec<Event>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT DISTINCT e.id, e.name, e.venue, e.event_date, e.total_tickets \
             FROM events e \
             INNER JOIN tickets t ON t.event_id = e.id \
             WHERE t.status = 'AVAILABLE' \
             ORDER BY e.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.into_iter().map(Event::from).collect())
    }
}
