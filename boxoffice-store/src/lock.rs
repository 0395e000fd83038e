use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use boxoffice_domain::lock::{LockManager, LockToken};
use boxoffice_domain::DomainError;

/// How long a blocked claimant sleeps between acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Sequence key for fencing tokens, shared by every replica.
const TOKEN_SEQ_KEY: &str = "boxoffice:lock:token";

/// Distributed lease on a Redis key: `SET key token NX PX lease`, polled
/// until the wait budget runs out. The token comes from a shared `INCR`
/// counter, so it is monotonically unique across replicas; release is a
/// compare-and-delete script that only the current holder can complete.
pub struct RedisLockManager {
    client: redis::Client,
}

impl RedisLockManager {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    async fn next_token(&self) -> Result<LockToken, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token: i64 = redis::cmd("INCR")
            .arg(TOKEN_SEQ_KEY)
            .query_async(&mut conn)
            .await?;
        Ok(LockToken(token as u64))
    }

    async fn try_acquire(
        &self,
        key: &str,
        token: LockToken,
        lease_budget: Duration,
    ) -> Result<bool, redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token.0.to_string())
            .arg("NX")
            .arg("PX")
            .arg(lease_budget.as_millis() as u64)
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }
}

#[async_trait]
impl LockManager for RedisLockManager {
    async fn acquire(
        &self,
        key: &str,
        wait_budget: Duration,
        lease_budget: Duration,
    ) -> Result<LockToken, DomainError> {
        let token = self
            .next_token()
            .await
            .map_err(|e| DomainError::Internal(format!("lock service error: {}", e)))?;

        let deadline = Instant::now() + wait_budget;

        loop {
            let acquired = self
                .try_acquire(key, token, lease_budget)
                .await
                .map_err(|e| DomainError::Internal(format!("lock service error: {}", e)))?;

            if acquired {
                debug!("Lock acquired for key: {} (token {})", key, token);
                return Ok(token);
            }

            if Instant::now() + RETRY_INTERVAL > deadline {
                warn!(
                    "Failed to acquire lock for key: {} within {:?}",
                    key, wait_budget
                );
                return Err(DomainError::LockUnavailable(key.to_string()));
            }

            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    async fn release(&self, key: &str, token: LockToken) {
        // Delete only if we still hold the lease. A stale token or an
        // already-expired lease leaves the key alone.
        let script = redis::Script::new(
            r#"
            if redis.call("GET", KEYS[1]) == ARGV[1] then
                return redis.call("DEL", KEYS[1])
            else
                return 0
            end
        "#,
        );

        let result: Result<i32, redis::RedisError> = async {
            let mut conn = self.client.get_multiplexed_async_connection().await?;
            script
                .key(key)
                .arg(token.0.to_string())
                .invoke_async(&mut conn)
                .await
        }
        .await;

        match result {
            Ok(1) => debug!("Lock released for key: {} (token {})", key, token),
            Ok(_) => debug!("Lock for key: {} already expired or reassigned", key),
            // The lease self-expires, so a failed release cannot deadlock.
            Err(e) => warn!("Lock release failed for key: {}: {}", key, e),
        }
    }
}

struct HeldLease {
    token: u64,
    expires_at: Instant,
}

/// Process-local lock manager with the same lease semantics, for
/// single-replica deployments and tests.
#[derive(Default)]
pub struct LocalLockManager {
    seq: AtomicU64,
    held: Mutex<HashMap<String, HeldLease>>,
}

impl LocalLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn try_claim(&self, key: &str, token: u64, lease_budget: Duration) -> bool {
        let mut held = self.held.lock().expect("lock registry poisoned");
        let now = Instant::now();

        match held.get(key) {
            Some(lease) if lease.expires_at > now => false,
            _ => {
                held.insert(
                    key.to_string(),
                    HeldLease {
                        token,
                        expires_at: now + lease_budget,
                    },
                );
                true
            }
        }
    }
}

#[async_trait]
impl LockManager for LocalLockManager {
    async fn acquire(
        &self,
        key: &str,
        wait_budget: Duration,
        lease_budget: Duration,
    ) -> Result<LockToken, DomainError> {
        let token = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let deadline = Instant::now() + wait_budget;

        loop {
            if self.try_claim(key, token, lease_budget) {
                return Ok(LockToken(token));
            }

            if Instant::now() + RETRY_INTERVAL > deadline {
                return Err(DomainError::LockUnavailable(key.to_string()));
            }

            tokio::time::sleep(RETRY_INTERVAL).await;
        }
    }

    async fn release(&self, key: &str, token: LockToken) {
        let mut held = self.held.lock().expect("lock registry poisoned");
        if let Some(lease) = held.get(key) {
            if lease.token == token.0 {
                held.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(200);
    const LEASE: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn grants_and_releases() {
        let locks = LocalLockManager::new();

        let token = locks.acquire("k", WAIT, LEASE).await.unwrap();
        locks.release("k", token).await;

        // Free again after release.
        locks.acquire("k", WAIT, LEASE).await.unwrap();
    }

    #[tokio::test]
    async fn excludes_second_claimant_until_release() {
        let locks = LocalLockManager::new();

        let held = locks.acquire("k", WAIT, LEASE).await.unwrap();
        let err = locks.acquire("k", Duration::from_millis(100), LEASE).await;
        assert!(matches!(err, Err(DomainError::LockUnavailable(_))));

        locks.release("k", held).await;
        locks.acquire("k", WAIT, LEASE).await.unwrap();
    }

    #[tokio::test]
    async fn lease_self_expires() {
        let locks = LocalLockManager::new();

        let _abandoned = locks.acquire("k", WAIT, Duration::from_millis(50)).await.unwrap();

        // The first holder never releases; the lease lapses on its own.
        let token = locks.acquire("k", Duration::from_secs(1), LEASE).await.unwrap();
        locks.release("k", token).await;
    }

    #[tokio::test]
    async fn stale_release_is_a_no_op() {
        let locks = LocalLockManager::new();

        let first = locks.acquire("k", WAIT, Duration::from_millis(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        let second = locks.acquire("k", WAIT, LEASE).await.unwrap();

        // The expired holder's release must not free the new lease.
        locks.release("k", first).await;
        let err = locks.acquire("k", Duration::from_millis(100), LEASE).await;
        assert!(matches!(err, Err(DomainError::LockUnavailable(_))));

        locks.release("k", second).await;
    }

    #[tokio::test]
    async fn tokens_are_monotonic() {
        let locks = LocalLockManager::new();

        let a = locks.acquire("a", WAIT, LEASE).await.unwrap();
        let b = locks.acquire("b", WAIT, LEASE).await.unwrap();
        assert!(b > a);

        let keys_independent = locks.acquire("c", WAIT, LEASE).await;
        assert!(keys_independent.is_ok());
    }
}
