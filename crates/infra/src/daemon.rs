//! Container daemon availability.
//!
//! When `docker info` cannot reach a daemon, a VM-based runtime is started
//! first and the desktop application second, re-probing after each until a
//! bounded wait expires.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use ags_domain::config::DaemonConfig;
use ags_domain::error::{Error, Result};

use crate::command::{CommandRunner, CommandSpec};

const PROBE_INTERVAL: Duration = Duration::from_secs(2);
/// A starting daemon can leave `docker info` hanging.
const INFO_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    AlreadyRunning,
    StartedVm(String),
    StartedDesktop(String),
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonStatus::AlreadyRunning => f.write_str("already running"),
            DaemonStatus::StartedVm(rt) => write!(f, "started via {rt}"),
            DaemonStatus::StartedDesktop(app) => write!(f, "started {app} desktop"),
        }
    }
}

fn info_spec() -> CommandSpec {
    CommandSpec::new("docker", ["info", "--format", "{{.ServerVersion}}"]).with_timeout(INFO_TIMEOUT)
}

/// One `docker info` round trip.
pub async fn daemon_reachable(runner: &dyn CommandRunner) -> bool {
    matches!(runner.run(&info_spec()).await, Ok(out) if out.success)
}

/// Make sure a container daemon is reachable, starting one if needed.
pub async fn ensure_daemon(runner: &dyn CommandRunner, cfg: &DaemonConfig) -> Result<DaemonStatus> {
    ensure_daemon_with(runner, cfg, PROBE_INTERVAL, cfg!(target_os = "macos")).await
}

pub(crate) async fn ensure_daemon_with(
    runner: &dyn CommandRunner,
    cfg: &DaemonConfig,
    interval: Duration,
    desktop_supported: bool,
) -> Result<DaemonStatus> {
    if daemon_reachable(runner).await {
        tracing::info!("container daemon reachable");
        return Ok(DaemonStatus::AlreadyRunning);
    }
    // One budget for every start attempt together.
    let deadline = Instant::now() + Duration::from_secs(cfg.start_timeout_secs);

    if let Some(rt) = cfg.vm_runtime.as_deref() {
        tracing::warn!(runtime = %rt, "container daemon unreachable, starting VM runtime");
        let spec = CommandSpec::new(rt, ["start"]).with_timeout(remaining(deadline));
        match runner.run(&spec).await {
            Ok(out) if !out.success => {
                tracing::warn!(runtime = %rt, stderr = %out.stderr.trim(), "VM runtime start failed");
            }
            Err(e) => tracing::warn!(runtime = %rt, error = %e, "VM runtime unavailable"),
            Ok(_) => {}
        }
        if wait_reachable(runner, deadline, interval).await {
            return Ok(DaemonStatus::StartedVm(rt.to_owned()));
        }
    }

    if let Some(app) = cfg.desktop_app.as_deref().filter(|_| desktop_supported) {
        if remaining(deadline).is_zero() {
            tracing::warn!(app = %app, "start budget spent, not launching desktop application");
        } else {
            tracing::warn!(app = %app, "starting desktop application");
            let spec = CommandSpec::new("open", ["-a", app]).with_timeout(remaining(deadline));
            if let Err(e) = runner.run(&spec).await.and_then(|o| o.check(&spec)) {
                tracing::warn!(app = %app, error = %e, "desktop application start failed");
            }
            if wait_reachable(runner, deadline, interval).await {
                return Ok(DaemonStatus::StartedDesktop(app.to_owned()));
            }
        }
    }

    Err(Error::Command {
        command: info_spec().to_string(),
        message: "no container daemon became reachable".into(),
    })
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

async fn wait_reachable(runner: &dyn CommandRunner, deadline: Instant, interval: Duration) -> bool {
    loop {
        if daemon_reachable(runner).await {
            return true;
        }
        if Instant::now() + interval > deadline {
            return false;
        }
        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::command::{CommandOutput, ScriptedRunner};

    fn cfg() -> DaemonConfig {
        DaemonConfig {
            start_timeout_secs: 1,
            vm_runtime: Some("colima".into()),
            desktop_app: Some("Docker".into()),
        }
    }

    /// `docker info` succeeds only after `starter` has been run.
    fn runner_started_by(starter: &'static str) -> ScriptedRunner {
        let started = Arc::new(AtomicBool::new(false));
        ScriptedRunner::new(move |spec, _| {
            if spec.program == starter {
                started.store(true, Ordering::SeqCst);
                return Ok(CommandOutput::ok(""));
            }
            if spec.program == "docker" && started.load(Ordering::SeqCst) {
                return Ok(CommandOutput::ok("27.0.1"));
            }
            Ok(CommandOutput::failed(1, "Cannot connect to the Docker daemon"))
        })
    }

    #[tokio::test]
    async fn reachable_daemon_needs_no_start() {
        let runner = ScriptedRunner::new(|_, _| Ok(CommandOutput::ok("27.0.1")));
        let status = ensure_daemon_with(&runner, &cfg(), Duration::from_millis(10), true)
            .await
            .unwrap();
        assert_eq!(status, DaemonStatus::AlreadyRunning);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn vm_runtime_started_first() {
        let runner = runner_started_by("colima");
        let status = ensure_daemon_with(&runner, &cfg(), Duration::from_millis(10), true)
            .await
            .unwrap();
        assert_eq!(status, DaemonStatus::StartedVm("colima".into()));
        assert!(!runner.calls().iter().any(|c| c.starts_with("open")));
    }

    #[tokio::test]
    async fn desktop_app_tried_after_vm_runtime() {
        let runner = runner_started_by("open");
        let status = ensure_daemon_with(&runner, &cfg(), Duration::from_millis(100), true)
            .await
            .unwrap();
        assert_eq!(status, DaemonStatus::StartedDesktop("Docker".into()));
        let calls = runner.calls();
        let vm = calls.iter().position(|c| c == "colima start").unwrap();
        let desk = calls.iter().position(|c| c == "open -a Docker").unwrap();
        assert!(vm < desk);
    }

    #[tokio::test]
    async fn unreachable_daemon_is_fatal() {
        let runner = ScriptedRunner::new(|_, _| Ok(CommandOutput::failed(1, "no daemon")));
        let err = ensure_daemon_with(&runner, &cfg(), Duration::from_millis(100), false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no container daemon"), "{err}");
        assert!(!runner.calls().iter().any(|c| c.starts_with("open")));
    }

    #[tokio::test]
    async fn start_attempts_share_one_budget() {
        let runner = ScriptedRunner::new(|_, _| Ok(CommandOutput::failed(1, "no daemon")));
        let started = std::time::Instant::now();
        let err = ensure_daemon_with(&runner, &cfg(), Duration::from_millis(100), true).await;
        assert!(err.is_err());
        assert!(runner.calls().iter().any(|c| c == "colima start"));
        assert!(started.elapsed() < Duration::from_millis(1_800), "{:?}", started.elapsed());
    }
}
