mod api;
mod database;
mod env;
mod infra;
mod provisioning;

pub use api::*;
pub use database::*;
pub use env::*;
pub use infra::*;
pub use provisioning::*;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::env_file::EnvFile;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub env: EnvConfig,
    #[serde(default)]
    pub infra: InfraConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub smoke: SmokeConfig,
}

impl Config {
    /// Apply the optional overrides an env file may carry: service ports,
    /// the API base URL and the provisioning defaults.
    ///
    /// Unparseable port values are reported as config issues by
    /// [`Config::validate_overrides`] and otherwise ignored here.
    pub fn apply_env_overrides(&mut self, env: &EnvFile) {
        for service in &mut self.infra.services {
            if let Some(key) = service.port_env.as_deref() {
                if let Some(port) = env.get(key).and_then(|v| v.parse::<u16>().ok()) {
                    service.port = port;
                }
            }
        }
        if let Some(port) = env.get("API_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.api.port = port;
        }
        if let Some(url) = env.get("API_BASE_URL") {
            self.api.base_url = Some(url.to_owned());
        }
        if let Some(slug) = env.get("DEFAULT_AGENT_TEMPLATE") {
            self.provisioning.template_slug = slug.to_owned();
        }
        if let Some(city) = env.get("DEFAULT_CITY") {
            self.provisioning.default_city = city.to_owned();
        }
    }

    /// Report override keys present in the env file whose values are not
    /// valid ports.
    pub fn validate_overrides(&self, env: &EnvFile) -> Vec<ConfigError> {
        let mut keys: Vec<&str> = self
            .infra
            .services
            .iter()
            .filter_map(|s| s.port_env.as_deref())
            .collect();
        keys.push("API_PORT");

        keys.into_iter()
            .filter_map(|key| {
                let raw = env.get(key)?;
                match raw.parse::<u16>() {
                    Ok(p) if p > 0 => None,
                    _ => Some(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("{}:{key}", env.path().display()),
                        message: format!("{raw:?} is not a valid port"),
                    }),
                }
            })
            .collect()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: String, message: &str| {
            errors.push(ConfigError {
                severity,
                field,
                message: message.into(),
            })
        };

        if self.env.required_keys.is_empty() {
            push(
                ConfigSeverity::Warning,
                "env.required_keys".into(),
                "no required keys; DATABASE_URL will not be checked",
            );
        }

        if self.infra.compose_file.as_os_str().is_empty() {
            push(
                ConfigSeverity::Error,
                "infra.compose_file".into(),
                "compose file must not be empty",
            );
        }
        if self.infra.project.is_empty() {
            push(
                ConfigSeverity::Error,
                "infra.project".into(),
                "project name must not be empty",
            );
        }
        if self.infra.services.is_empty() {
            push(
                ConfigSeverity::Error,
                "infra.services".into(),
                "at least one infra service is required",
            );
        }

        let mut seen = std::collections::HashSet::new();
        for (i, svc) in self.infra.services.iter().enumerate() {
            if svc.name.is_empty() {
                push(
                    ConfigSeverity::Error,
                    format!("infra.services[{i}].name"),
                    "service name must not be empty",
                );
            }
            if !seen.insert(svc.name.as_str()) {
                push(
                    ConfigSeverity::Error,
                    format!("infra.services[{i}].name"),
                    "duplicate service name",
                );
            }
            if svc.container_pattern.is_empty() {
                push(
                    ConfigSeverity::Error,
                    format!("infra.services[{i}].container_pattern"),
                    "container pattern must not be empty",
                );
            }
            if svc.port == 0 {
                push(
                    ConfigSeverity::Error,
                    format!("infra.services[{i}].port"),
                    "port must be greater than 0",
                );
            }
        }

        if self.readiness.infra_timeout_secs == 0 {
            push(
                ConfigSeverity::Error,
                "readiness.infra_timeout_secs".into(),
                "timeout must be greater than 0",
            );
        }
        if self.readiness.service_timeout_secs == 0 {
            push(
                ConfigSeverity::Error,
                "readiness.service_timeout_secs".into(),
                "timeout must be greater than 0",
            );
        }

        if self.database.max_connections == 0 {
            push(
                ConfigSeverity::Error,
                "database.max_connections".into(),
                "max_connections must be greater than 0",
            );
        }

        if self.api.host.is_empty() && self.api.base_url.is_none() {
            push(
                ConfigSeverity::Error,
                "api.host".into(),
                "host must not be empty when base_url is unset",
            );
        }
        if let Some(url) = &self.api.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                push(
                    ConfigSeverity::Error,
                    "api.base_url".into(),
                    "base_url must start with http:// or https://",
                );
            }
        }

        if self.provisioning.template_slug.trim().is_empty() {
            push(
                ConfigSeverity::Error,
                "provisioning.template_slug".into(),
                "template slug must not be empty",
            );
        }
        if self.provisioning.default_city.trim().is_empty() {
            push(
                ConfigSeverity::Error,
                "provisioning.default_city".into(),
                "default city must not be empty",
            );
        }
        if self.provisioning.password.len() < 8 {
            push(
                ConfigSeverity::Warning,
                "provisioning.password".into(),
                "password shorter than 8 characters",
            );
        }

        if self.smoke.tool_calls.is_empty() {
            push(
                ConfigSeverity::Warning,
                "smoke.tool_calls".into(),
                "no tool-execution smoke tests configured",
            );
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_with(lines: &str) -> EnvFile {
        EnvFile::parse(std::path::Path::new(".env"), lines).unwrap()
    }

    #[test]
    fn default_config_has_no_errors() {
        let issues = Config::default().validate();
        assert!(
            issues.iter().all(|i| i.severity == ConfigSeverity::Warning),
            "unexpected errors: {issues:?}"
        );
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut cfg = Config::default();
        cfg.infra.services[0].port = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.field == "infra.services[0].port" && i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn duplicate_service_names_rejected() {
        let mut cfg = Config::default();
        let dup = cfg.infra.services[0].clone();
        cfg.infra.services.push(dup);
        assert!(cfg
            .validate()
            .iter()
            .any(|i| i.message == "duplicate service name"));
    }

    #[test]
    fn env_overrides_ports_and_defaults() {
        let mut cfg = Config::default();
        let env = env_with(
            "DATABASE_URL=postgres://x\nPOSTGRES_PORT=15432\nAPI_PORT=9001\nDEFAULT_CITY=paris\n",
        );
        cfg.apply_env_overrides(&env);

        let pg = cfg.infra.service("postgres").unwrap();
        assert_eq!(pg.port, 15432);
        assert_eq!(cfg.api.port, 9001);
        assert_eq!(cfg.provisioning.default_city, "paris");
        // Untouched service keeps its default.
        assert_eq!(cfg.infra.service("redis").unwrap().port, 6379);
    }

    #[test]
    fn bad_port_override_is_reported_and_ignored() {
        let mut cfg = Config::default();
        let env = env_with("REDIS_PORT=sixty\n");
        cfg.apply_env_overrides(&env);
        assert_eq!(cfg.infra.service("redis").unwrap().port, 6379);

        let issues = cfg.validate_overrides(&env);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].field.ends_with("REDIS_PORT"));
    }

    #[test]
    fn non_http_base_url_rejected() {
        let mut cfg = Config::default();
        cfg.api.base_url = Some("localhost:8000".into());
        assert!(cfg.validate().iter().any(|i| i.field == "api.base_url"));
    }
}
