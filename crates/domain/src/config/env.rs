use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Env file
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Path of the `KEY=VALUE` file holding credentials and endpoints.
    #[serde(default = "d_env_file")]
    pub file: PathBuf,
    /// Keys that must be present after loading.
    #[serde(default = "d_required_keys")]
    pub required_keys: Vec<String>,
    /// Key holding the Postgres connection string.
    #[serde(default = "d_database_url_key")]
    pub database_url_key: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            file: d_env_file(),
            required_keys: d_required_keys(),
            database_url_key: d_database_url_key(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_env_file() -> PathBuf {
    PathBuf::from(".env")
}
fn d_required_keys() -> Vec<String> {
    vec!["DATABASE_URL".into()]
}
fn d_database_url_key() -> String {
    "DATABASE_URL".into()
}
