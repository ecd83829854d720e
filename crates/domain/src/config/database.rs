use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Database
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Postgres pool settings. The connection string itself comes from the env
/// file, never from this file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "d_2")]
    pub max_connections: u32,
    #[serde(default = "d_10")]
    pub acquire_timeout_secs: u64,
    /// Extra connect attempts after the port is open; Postgres may accept TCP
    /// before it accepts logins.
    #[serde(default = "d_5")]
    pub connect_retries: u32,
    #[serde(default = "d_500")]
    pub initial_retry_delay_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 2,
            acquire_timeout_secs: 10,
            connect_retries: 5,
            initial_retry_delay_ms: 500,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_2() -> u32 {
    2
}
fn d_10() -> u64 {
    10
}
fn d_5() -> u32 {
    5
}
fn d_500() -> u64 {
    500
}
