use ags_domain::config::{Config, ConfigSeverity};

#[test]
fn empty_file_yields_defaults() {
    let config: Config = toml::from_str("").unwrap();
    assert_eq!(config.infra.project, "agentstack");
    assert_eq!(config.readiness.infra_timeout_secs, 60);
    assert_eq!(config.readiness.service_timeout_secs, 120);
    assert_eq!(config.env.required_keys, vec!["DATABASE_URL".to_string()]);
}

#[test]
fn explicit_services_replace_defaults() {
    let toml_str = r#"
[infra]
compose_file = "infra/compose.yml"
project = "dev"

[[infra.services]]
name = "db"
container_pattern = "dev-db"
port = 15432
critical = true
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.infra.services.len(), 1);
    assert_eq!(config.infra.services[0].name, "db");
    assert!(config.infra.services[0].critical);
    assert_eq!(
        config.infra.compose_file,
        std::path::PathBuf::from("infra/compose.yml")
    );
}

#[test]
fn api_base_url_parses() {
    let toml_str = r#"
[api]
base_url = "http://localhost:9999"
max_retries = 0
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.api.resolved_base_url(), "http://localhost:9999");
    assert_eq!(config.api.max_retries, 0);
}

#[test]
fn empty_services_is_a_validation_error() {
    let toml_str = r#"
[infra]
services = []
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.field == "infra.services" && i.severity == ConfigSeverity::Error));
}

#[test]
fn resolved_config_serializes_back_to_toml() {
    let config = Config::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let reparsed: Config = toml::from_str(&rendered).unwrap();
    assert_eq!(reparsed.provisioning.template_slug, "jeeves");
    assert_eq!(reparsed.smoke.tool_calls.len(), 2);
}
