use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::error::DomainError;

/// Fencing token proving current ownership of a lease. Tokens are
/// monotonically unique across all replicas sharing the lock service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LockToken(pub u64);

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Mutually-exclusive, auto-expiring leases on named keys.
///
/// `acquire` either grants exclusive ownership of `key` within
/// `wait_budget` or fails with `LockUnavailable` and no side effects. The
/// lease ends at `release` with the matching token or when `lease_budget`
/// elapses, whichever comes first, so holder death cannot deadlock other
/// claimants.
#[async_trait]
pub trait LockManager: Send + Sync {
    async fn acquire(
        &self,
        key: &str,
        wait_budget: Duration,
        lease_budget: Duration,
    ) -> Result<LockToken, DomainError>;

    /// Idempotent; safe after lease expiry and with a stale token (both are
    /// no-ops). Failures are logged by the implementation, never surfaced:
    /// an unreleased lease self-expires.
    async fn release(&self, key: &str, token: LockToken);
}

/// Lock key guarding the reservation critical section of one event. One
/// independent critical section per event.
pub fn reservation_lock_key(event_id: i64) -> String {
    format!("ticket:reserve:event:{}", event_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_key_is_scoped_per_event() {
        assert_eq!(reservation_lock_key(42), "ticket:reserve:event:42");
        assert_ne!(reservation_lock_key(1), reservation_lock_key(2));
    }
}
