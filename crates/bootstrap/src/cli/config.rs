use std::path::Path;

use ags_domain::config::{Config, ConfigError, ConfigSeverity};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// config validate
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Static checks plus the files and endpoint an `up` run will touch.
pub fn issues(config: &Config) -> Vec<ConfigError> {
    let mut issues = config.validate();
    let mut warn = |field: &str, message: String| {
        issues.push(ConfigError {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message,
        })
    };

    let compose = &config.infra.compose_file;
    if !compose.as_os_str().is_empty() && !compose.exists() {
        warn(
            "infra.compose_file",
            format!("{} not found; lifecycle commands will fail", compose.display()),
        );
    }
    if !config.env.file.exists() {
        warn(
            "env.file",
            format!("{} not found; `up` stops after DOCKER_READY", config.env.file.display()),
        );
    }

    let url_reported = issues.iter().any(|i| i.field == "api.base_url");
    if let (false, Err(e)) = (url_reported, ags_api_client::probe_endpoint(&config.api)) {
        issues.push(ConfigError {
            severity: ConfigSeverity::Error,
            field: "api.base_url".into(),
            message: e.to_string(),
        });
    }
    issues
}

/// Print the issues found in the config. Returns false when any is an error.
pub fn validate(config: &Config, config_path: &Path) -> bool {
    let issues = issues(config);
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();

    for issue in &issues {
        println!("{issue}");
    }
    if issues.is_empty() {
        println!("Config OK ({})", config_path.display());
    } else {
        println!(
            "\n{errors} error(s), {} warning(s) in {}",
            issues.len() - errors,
            config_path.display(),
        );
    }
    if errors == 0 {
        println!("API at {}", config.api.resolved_base_url());
    }
    errors == 0
}

/// Dump the resolved config (with all defaults filled in) as TOML.
pub fn show(config: &Config) -> anyhow::Result<()> {
    let output = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("failed to serialize config: {e}"))?;
    print!("{output}");
    Ok(())
}
