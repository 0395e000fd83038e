pub mod app_config;
pub mod cache;
pub mod database;
pub mod event_repo;
pub mod lock;
pub mod memory;
pub mod ticket_repo;

pub use app_config::Config;
pub use cache::RedisCache;
pub use database::DbClient;
pub use event_repo::PostgresEventRepository;
pub use lock::{LocalLockManager, RedisLockManager};
pub use memory::{InMemoryCache, InMemoryStore};
pub use ticket_repo::PostgresTicketRepository;

use boxoffice_domain::DomainError;

/// Store failures carry no client-actionable detail; they surface as the
/// generic internal kind and the detail goes to the logs.
pub(crate) fn db_err(err: sqlx::Error) -> DomainError {
    DomainError::Internal(format!("database error: {}", err))
}
