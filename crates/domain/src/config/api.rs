use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// External API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_8000")]
    pub port: u16,
    /// Full base URL; when unset it is derived from `host` and `port`.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "d_15000")]
    pub timeout_ms: u64,
    /// Retries on 5xx / transport errors. 4xx is never retried.
    #[serde(default = "d_2")]
    pub max_retries: u32,
    /// Path of the OpenAPI document used as the provisioning capability probe.
    #[serde(default = "d_openapi_path")]
    pub openapi_path: String,
    /// Other application services waited on alongside the API; never fatal.
    #[serde(default = "d_dependents")]
    pub dependents: Vec<DependentService>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: 8000,
            base_url: None,
            timeout_ms: 15_000,
            max_retries: 2,
            openapi_path: d_openapi_path(),
            dependents: d_dependents(),
        }
    }
}

impl ApiConfig {
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependentService {
    pub name: String,
    #[serde(default = "d_host")]
    pub host: String,
    pub port: u16,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_8000() -> u16 {
    8000
}
fn d_15000() -> u64 {
    15_000
}
fn d_2() -> u32 {
    2
}
fn d_openapi_path() -> String {
    "/openapi.json".into()
}
fn d_dependents() -> Vec<DependentService> {
    vec![DependentService {
        name: "llm".into(),
        host: d_host(),
        port: 8081,
    }]
}
