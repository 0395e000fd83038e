use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    #[serde(default)]
    pub reservation: ReservationConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReservationConfig {
    #[serde(default = "default_reservation_window")]
    pub window_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReaperConfig {
    #[serde(default = "default_reaper_period")]
    pub period_seconds: u64,
    #[serde(default = "default_reaper_initial_delay")]
    pub initial_delay_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LockConfig {
    #[serde(default = "default_lock_wait_budget")]
    pub wait_budget_seconds: u64,
    #[serde(default = "default_lock_lease_budget")]
    pub lease_budget_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl")]
    pub ttl_seconds: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_reservation_window() -> u64 {
    600
}

fn default_reaper_period() -> u64 {
    300
}

fn default_reaper_initial_delay() -> u64 {
    60
}

fn default_lock_wait_budget() -> u64 {
    3
}

fn default_lock_lease_budget() -> u64 {
    10
}

fn default_cache_ttl() -> u64 {
    600
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            window_seconds: default_reservation_window(),
        }
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            period_seconds: default_reaper_period(),
            initial_delay_seconds: default_reaper_initial_delay(),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            wait_budget_seconds: default_lock_wait_budget(),
            lease_budget_seconds: default_lock_lease_budget(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("BOXOFFICE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl ReservationConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl ReaperConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_seconds)
    }
}

impl LockConfig {
    pub fn wait_budget(&self) -> Duration {
        Duration::from_secs(self.wait_budget_seconds)
    }

    pub fn lease_budget(&self) -> Duration {
        Duration::from_secs(self.lease_budget_seconds)
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let reservation = ReservationConfig::default();
        assert_eq!(reservation.window(), Duration::from_secs(600));

        let reaper = ReaperConfig::default();
        assert_eq!(reaper.period(), Duration::from_secs(300));
        assert_eq!(reaper.initial_delay(), Duration::from_secs(60));

        let lock = LockConfig::default();
        assert_eq!(lock.wait_budget(), Duration::from_secs(3));
        assert_eq!(lock.lease_budget(), Duration::from_secs(10));

        assert_eq!(CacheConfig::default().ttl(), Duration::from_secs(600));
    }
}
