use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Infra containers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraConfig {
    #[serde(default = "d_compose_file")]
    pub compose_file: PathBuf,
    /// Compose project name (`-p`).
    #[serde(default = "d_project")]
    pub project: String,
    /// Commands that must be on PATH before anything else runs.
    #[serde(default = "d_required_commands")]
    pub required_commands: Vec<String>,
    #[serde(default = "d_services")]
    pub services: Vec<ServiceConfig>,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            compose_file: d_compose_file(),
            project: d_project(),
            required_commands: d_required_commands(),
            services: d_services(),
        }
    }
}

impl InfraConfig {
    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Compose service names, in declaration order.
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }
}

/// One compose-managed infra service (database, cache, object store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Compose service name.
    pub name: String,
    /// Substring expected in the running container's name.
    pub container_pattern: String,
    #[serde(default = "d_host")]
    pub host: String,
    pub port: u16,
    /// Env file key that overrides `port`.
    #[serde(default)]
    pub port_env: Option<String>,
    /// When true, the run aborts if the port never opens.
    #[serde(default)]
    pub critical: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Readiness budgets
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Budget for database / cache / object store ports.
    #[serde(default = "d_60")]
    pub infra_timeout_secs: u64,
    /// Budget for application-level services (the API).
    #[serde(default = "d_120")]
    pub service_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            infra_timeout_secs: 60,
            service_timeout_secs: 120,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Container daemon
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Total wait after each start attempt before giving up on it.
    #[serde(default = "d_90")]
    pub start_timeout_secs: u64,
    /// Lightweight VM runtime tried first (`<cmd> start`).
    #[serde(default = "d_vm_runtime")]
    pub vm_runtime: Option<String>,
    /// Desktop application tried second (`open -a <app>`, macOS only).
    #[serde(default = "d_desktop_app")]
    pub desktop_app: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: 90,
            vm_runtime: d_vm_runtime(),
            desktop_app: d_desktop_app(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_compose_file() -> PathBuf {
    PathBuf::from("docker-compose.yml")
}
fn d_project() -> String {
    "agentstack".into()
}
fn d_required_commands() -> Vec<String> {
    vec!["docker".into()]
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_services() -> Vec<ServiceConfig> {
    vec![
        ServiceConfig {
            name: "postgres".into(),
            container_pattern: "postgres".into(),
            host: d_host(),
            port: 5432,
            port_env: Some("POSTGRES_PORT".into()),
            critical: true,
        },
        ServiceConfig {
            name: "redis".into(),
            container_pattern: "redis".into(),
            host: d_host(),
            port: 6379,
            port_env: Some("REDIS_PORT".into()),
            critical: true,
        },
        ServiceConfig {
            name: "minio".into(),
            container_pattern: "minio".into(),
            host: d_host(),
            port: 9000,
            port_env: Some("MINIO_PORT".into()),
            critical: false,
        },
    ]
}
fn d_60() -> u64 {
    60
}
fn d_120() -> u64 {
    120
}
fn d_90() -> u64 {
    90
}
fn d_vm_runtime() -> Option<String> {
    Some("colima".into())
}
fn d_desktop_app() -> Option<String> {
    Some("Docker".into())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_services_cover_db_cache_and_object_store() {
        let cfg = InfraConfig::default();
        assert_eq!(cfg.service_names(), vec!["postgres", "redis", "minio"]);
        assert!(cfg.service("postgres").unwrap().critical);
        assert!(cfg.service("redis").unwrap().critical);
        assert!(!cfg.service("minio").unwrap().critical);
    }

    #[test]
    fn service_parses_with_defaults() {
        let toml_str = r#"
            name = "db"
            container_pattern = "db-1"
            port = 15432
        "#;
        let svc: ServiceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(svc.host, "127.0.0.1");
        assert!(svc.port_env.is_none());
        assert!(!svc.critical);
    }

    #[test]
    fn readiness_budgets_default() {
        let cfg = ReadinessConfig::default();
        assert_eq!(cfg.infra_timeout_secs, 60);
        assert_eq!(cfg.service_timeout_secs, 120);
    }
}
