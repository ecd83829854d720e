use std::path::Path;
use std::time::Duration;

use ags_domain::config::{Config, ConfigSeverity};
use ags_domain::env_file::EnvFile;
use ags_infra::command::CommandRunner;
use ags_infra::daemon::daemon_reachable;
use ags_infra::readiness::is_port_open;
use ags_infra::check_commands;

const PORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Run all diagnostic checks and print a summary.
///
/// Returns `true` when every check passes.
pub async fn run(config: &Config, config_path: &Path, runner: &dyn CommandRunner) -> bool {
    println!("agentstack doctor");
    println!("=================\n");

    let mut all_passed = true;

    // 1. Config file
    check_config_file(config_path, &mut all_passed);

    // 2. Config validation
    check_config_validation(config, &mut all_passed);

    // 3. Required commands
    check_required_commands(config, runner, &mut all_passed).await;

    // 4. Container daemon
    check_daemon(runner, &mut all_passed).await;

    // 5. Env file; its overrides apply to the port checks below.
    let mut config = config.clone();
    check_env_file(&mut config, &mut all_passed);

    // 6. Ports
    check_ports(&config, &mut all_passed).await;

    println!();
    if all_passed {
        println!("All checks passed.");
    } else {
        println!("Some checks failed. Review the output above.");
    }

    all_passed
}

// ── Individual checks ─────────────────────────────────────────────────

fn check_config_file(config_path: &Path, all_passed: &mut bool) {
    let exists = config_path.exists();
    print_check(
        "Config file exists",
        exists,
        if exists {
            config_path.display().to_string()
        } else {
            format!("{} not found (using defaults)", config_path.display())
        },
    );
    if !exists {
        *all_passed = false;
    }
}

fn check_config_validation(config: &Config, all_passed: &mut bool) {
    let issues = config.validate();
    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    if issues.is_empty() {
        print_check("Config validation", true, "no issues".into());
    } else {
        print_check(
            "Config validation",
            error_count == 0,
            format!("{} issue(s) ({} error(s))", issues.len(), error_count),
        );
        for issue in &issues {
            println!("      {issue}");
        }
        if error_count > 0 {
            *all_passed = false;
        }
    }
}

async fn check_required_commands(config: &Config, runner: &dyn CommandRunner, all_passed: &mut bool) {
    let commands = &config.infra.required_commands;
    match check_commands(runner, commands).await {
        Ok(()) => print_check("Required commands", true, commands.join(", ")),
        Err(e) => {
            print_check("Required commands", false, e.to_string());
            *all_passed = false;
        }
    }
}

async fn check_daemon(runner: &dyn CommandRunner, all_passed: &mut bool) {
    let ok = daemon_reachable(runner).await;
    print_check(
        "Container daemon reachable",
        ok,
        if ok { "docker info ok".into() } else { "docker info failed".into() },
    );
    if !ok {
        *all_passed = false;
    }
}

fn check_env_file(config: &mut Config, all_passed: &mut bool) {
    match EnvFile::load(&config.env.file, &config.env.required_keys) {
        Ok(env) => {
            let bad = config.validate_overrides(&env);
            print_check(
                "Env file",
                bad.is_empty(),
                format!("{} ({} key(s))", env.path().display(), env.len()),
            );
            for issue in &bad {
                println!("      {issue}");
            }
            if !bad.is_empty() {
                *all_passed = false;
            }
            config.apply_env_overrides(&env);
        }
        Err(e) => {
            print_check("Env file", false, e.to_string());
            *all_passed = false;
        }
    }
}

async fn check_ports(config: &Config, all_passed: &mut bool) {
    for svc in &config.infra.services {
        let open = is_port_open(&svc.host, svc.port, PORT_TIMEOUT).await;
        print_check(
            &format!("Port {} ({})", svc.port, svc.name),
            open,
            format!("{}:{}{}", svc.host, svc.port, if open { "" } else { " (closed)" }),
        );
        if !open {
            *all_passed = false;
        }
    }

    let (host, port) = match ags_api_client::probe_endpoint(&config.api) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            print_check("API endpoint", false, e.to_string());
            *all_passed = false;
            return;
        }
    };
    let open = is_port_open(&host, port, PORT_TIMEOUT).await;
    print_check(
        &format!("Port {port} (api)"),
        open,
        format!("{host}:{port}{}", if open { "" } else { " (closed)" }),
    );
    if !open {
        *all_passed = false;
    }
}

// ── Formatting helper ─────────────────────────────────────────────────

fn print_check(name: &str, passed: bool, detail: String) {
    let status = if passed { "PASS" } else { "FAIL" };
    println!("  [{status}] {name}: {detail}");
}
