use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::LazyLock;

use crate::error::DomainError;
use crate::event::NewEvent;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_+&*-]+(?:\.[a-zA-Z0-9_+&*-]+)*@(?:[a-zA-Z0-9-]+\.)+[a-zA-Z]{2,7}$")
        .expect("email pattern compiles")
});

pub fn validate_event_id(id: i64) -> Result<(), DomainError> {
    if id <= 0 {
        return Err(DomainError::Validation(
            "Event ID must be a positive number".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), DomainError> {
    if email.trim().is_empty() {
        return Err(DomainError::Validation("Email is required".to_string()));
    }
    if !EMAIL.is_match(email) {
        return Err(DomainError::Validation("Invalid email format".to_string()));
    }
    Ok(())
}

/// Validate an event payload before any side effect. All violations are
/// collected and reported in one message, joined with ", ".
pub fn validate_new_event(event: &NewEvent, now: DateTime<Utc>) -> Result<(), DomainError> {
    let mut violations = Vec::new();

    if event.name.trim().is_empty() {
        violations.push("Event name is required".to_string());
    } else if event.name.len() < 3 || event.name.len() > 100 {
        violations.push("Event name must be between 3 and 100 characters".to_string());
    }

    if event.venue.trim().is_empty() {
        violations.push("Venue is required".to_string());
    } else if event.venue.len() < 3 || event.venue.len() > 255 {
        violations.push("Venue must be between 3 and 255 characters".to_string());
    }

    if event.event_date <= now {
        violations.push("Event date must be in the future".to_string());
    }

    if event.total_tickets < 1 {
        violations.push("Total tickets must be at least 1".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(DomainError::Validation(violations.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event() -> NewEvent {
        NewEvent {
            name: "Spring Concert".to_string(),
            venue: "MSG".to_string(),
            event_date: Utc::now() + Duration::days(30),
            total_tickets: 3,
        }
    }

    #[test]
    fn accepts_well_formed_event() {
        assert!(validate_new_event(&event(), Utc::now()).is_ok());
    }

    #[test]
    fn rejects_past_event_date() {
        let mut past = event();
        past.event_date = Utc::now() - Duration::days(1);

        let err = validate_new_event(&past, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("future"));
    }

    #[test]
    fn collects_all_violations() {
        let broken = NewEvent {
            name: "ab".to_string(),
            venue: String::new(),
            event_date: Utc::now() - Duration::hours(1),
            total_tickets: 0,
        };

        let message = validate_new_event(&broken, Utc::now()).unwrap_err().to_string();
        assert!(message.contains("Event name must be between 3 and 100 characters"));
        assert!(message.contains("Venue is required"));
        assert!(message.contains("Event date must be in the future"));
        assert!(message.contains("Total tickets must be at least 1"));
    }

    #[test]
    fn event_id_must_be_positive() {
        assert!(validate_event_id(1).is_ok());
        assert!(validate_event_id(0).is_err());
        assert!(validate_event_id(-7).is_err());
    }

    #[test]
    fn email_shapes() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name+tag@sub.example.co").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("invalid-email").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("@example.com").is_err());
    }
}
