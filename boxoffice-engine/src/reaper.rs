use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use boxoffice_domain::cache::{self, EventCache};
use boxoffice_domain::repository::TicketRepository;

/// Background worker that reopens seats whose reservation window lapsed.
///
/// The reaper never takes the per-event reservation lock: it only moves
/// tickets RESERVED → AVAILABLE, the inverse of the direction the lock
/// guards, and the batch release is idempotent, so overlapping reapers are
/// harmless. Errors are logged and retried at the next tick.
pub struct ExpiryReaper {
    tickets: Arc<dyn TicketRepository>,
    cache: Arc<dyn EventCache>,
    period: Duration,
    initial_delay: Duration,
}

impl ExpiryReaper {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        cache: Arc<dyn EventCache>,
        period: Duration,
        initial_delay: Duration,
    ) -> Self {
        Self {
            tickets,
            cache,
            period,
            initial_delay,
        }
    }

    /// Run the reaper on its own task: first tick after `initial_delay`,
    /// then every `period` after the previous tick completes.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let reaper = self;
        tokio::spawn(async move {
            info!(
                "Expiry reaper starting: first run in {:?}, then every {:?}",
                reaper.initial_delay, reaper.period
            );
            tokio::time::sleep(reaper.initial_delay).await;
            loop {
                reaper.run_once().await;
                tokio::time::sleep(reaper.period).await;
            }
        })
    }

    pub async fn run_once(&self) {
        self.reap_at(Utc::now()).await;
    }

    /// One reaper tick against the given instant. Leases expiring exactly
    /// at `now` are reclaimed.
    pub async fn reap_at(&self, now: DateTime<Utc>) {
        debug!("Starting cleanup of expired reservations before {}", now);

        match self.tickets.release_expired(now).await {
            Ok(event_ids) if event_ids.is_empty() => {
                debug!("No expired reservations found");
            }
            Ok(event_ids) => {
                info!(
                    "Cleanup completed: reopened seats for {} event(s)",
                    event_ids.len()
                );
                self.cache.evict(cache::EVICT_ON_TICKET_CHANGE).await;
            }
            Err(e) => {
                // Next tick retries; nothing propagates out of the reaper.
                error!("Cleanup of expired reservations failed: {}", e);
            }
        }
    }
}
