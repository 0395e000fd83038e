use std::sync::Arc;

use boxoffice_engine::{EventCatalog, ReservationEngine};
use boxoffice_store::DbClient;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<EventCatalog>,
    pub reservations: Arc<ReservationEngine>,
    /// Present in database-backed deployments; readiness degrades to
    /// liveness without it (in-memory deployments and tests).
    pub db: Option<DbClient>,
}
