use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scheduled performance with a fixed ticket inventory.
///
/// `available_tickets` is derived from the tickets table on every read and
/// never persisted on the event row; the tickets table stays the single
/// source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub total_tickets: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_tickets: Option<i32>,
}

/// Payload for event creation. Seeding `total_tickets` AVAILABLE tickets
/// happens in the same transaction as the insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub name: String,
    pub venue: String,
    pub event_date: DateTime<Utc>,
    pub total_tickets: i32,
}
