use std::net::SocketAddr;
use std::sync::Arc;

use boxoffice_api::{app, AppState};
use boxoffice_engine::{EventCatalog, ExpiryReaper, ReservationEngine};
use boxoffice_store::{
    Config, DbClient, PostgresEventRepository, PostgresTicketRepository, RedisCache,
    RedisLockManager,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "boxoffice=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting boxoffice API on port {}", config.server.port);

    let db = DbClient::new(
        &config.database.url,
        config.database.max_connections,
        config.lock.lease_budget(),
    )
    .await
    .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let cache = Arc::new(
        RedisCache::new(&config.redis.url, config.cache.ttl()).expect("Failed to connect to Redis"),
    );
    let locks =
        Arc::new(RedisLockManager::new(&config.redis.url).expect("Failed to connect to Redis"));

    let events = Arc::new(PostgresEventRepository::new(db.pool.clone()));
    let tickets = Arc::new(PostgresTicketRepository::new(db.pool.clone()));

    let catalog = Arc::new(EventCatalog::new(
        events.clone(),
        tickets.clone(),
        cache.clone(),
    ));
    let reservations = Arc::new(ReservationEngine::new(
        events,
        tickets.clone(),
        cache.clone(),
        locks,
        config.reservation.window(),
        config.lock.wait_budget(),
        config.lock.lease_budget(),
    ));

    let reaper = Arc::new(ExpiryReaper::new(
        tickets,
        cache,
        config.reaper.period(),
        config.reaper.initial_delay(),
    ));
    let _reaper_task = reaper.spawn();

    let state = AppState {
        catalog,
        reservations,
        db: Some(db),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app(state))
        .await
        .expect("Server error");
}
