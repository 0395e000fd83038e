use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a single seat.
///
/// AVAILABLE → RESERVED under a successful claim, RESERVED → AVAILABLE under
/// reaper expiry. RESERVED → SOLD exists in the schema but no transition is
/// wired up here; confirmation is a separate flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Available,
    Reserved,
    Sold,
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TicketStatus::Available => "AVAILABLE",
            TicketStatus::Reserved => "RESERVED",
            TicketStatus::Sold => "SOLD",
        };
        f.write_str(s)
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(TicketStatus::Available),
            "RESERVED" => Ok(TicketStatus::Reserved),
            "SOLD" => Ok(TicketStatus::Sold),
            other => Err(format!("unknown ticket status: {}", other)),
        }
    }
}

/// One seat within an event's inventory.
///
/// `customer_email` and `reserved_until` are set together when the ticket
/// leaves AVAILABLE and cleared together when it returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub status: TicketStatus,
    pub customer_email: Option<String>,
    pub reserved_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_available(&self) -> bool {
        self.status == TicketStatus::Available
    }

    /// A RESERVED ticket whose deadline has passed. Inclusive on the past
    /// side: a lease expiring exactly now is already expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == TicketStatus::Reserved
            && self.reserved_until.map(|until| until <= now).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [TicketStatus::Available, TicketStatus::Reserved, TicketStatus::Sold] {
            assert_eq!(status.to_string().parse::<TicketStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn expiry_is_inclusive_on_the_past_side() {
        let now = Utc::now();
        let ticket = Ticket {
            id: 1,
            event_id: 1,
            status: TicketStatus::Reserved,
            customer_email: Some("a@example.com".to_string()),
            reserved_until: Some(now),
            created_at: now - Duration::minutes(5),
        };

        assert!(ticket.is_expired(now));
        assert!(!ticket.is_expired(now - Duration::seconds(1)));
    }

    #[test]
    fn available_tickets_never_expire() {
        let now = Utc::now();
        let ticket = Ticket {
            id: 1,
            event_id: 1,
            status: TicketStatus::Available,
            customer_email: None,
            reserved_until: None,
            created_at: now,
        };

        assert!(!ticket.is_expired(now + Duration::days(1)));
    }
}
