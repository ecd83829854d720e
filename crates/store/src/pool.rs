use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use ags_domain::config::DatabaseConfig;
use ags_domain::error::{Error, Result};

const MAX_RETRY_DELAY_MS: u64 = 8_000;

/// Open a small pool, retrying with exponential backoff.
///
/// The port being open does not mean Postgres accepts logins yet; the first
/// few attempts after a container start commonly fail.
pub async fn connect(database_url: &str, cfg: &DatabaseConfig) -> Result<PgPool> {
    let options = PgPoolOptions::new()
        .max_connections(cfg.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs));

    let mut delay_ms = cfg.initial_retry_delay_ms;
    let mut last_error = None;

    for attempt in 0..=cfg.connect_retries {
        match options.clone().connect(database_url).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(retries = attempt, "database connection established");
                }
                return Ok(pool);
            }
            Err(e) => {
                if attempt < cfg.connect_retries {
                    tracing::warn!(
                        attempt = attempt + 1,
                        of = cfg.connect_retries + 1,
                        delay_ms,
                        error = %e,
                        "database connection failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(MAX_RETRY_DELAY_MS);
                }
                last_error = Some(e);
            }
        }
    }

    Err(Error::Database(format!(
        "failed to connect after {} attempts: {}",
        cfg.connect_retries + 1,
        last_error.map_or_else(|| "unknown error".to_owned(), |e| e.to_string())
    )))
}
