//! Compose-managed infra lifecycle: tear down, recreate, verify.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ags_domain::config::{InfraConfig, ServiceConfig};
use ags_domain::env_file::EnvFile;
use ags_domain::error::{Error, Result};

use crate::command::{CommandRunner, CommandSpec};
use crate::readiness::is_port_open;

const PORT_CHECK_TIMEOUT: Duration = Duration::from_millis(500);

pub struct ComposeController {
    runner: Arc<dyn CommandRunner>,
    compose_file: PathBuf,
    project: String,
    /// Forwarded to every child so compose can interpolate the env file.
    envs: Vec<(String, String)>,
}

impl ComposeController {
    pub fn new(runner: Arc<dyn CommandRunner>, infra: &InfraConfig) -> Self {
        Self {
            runner,
            compose_file: infra.compose_file.clone(),
            project: infra.project.clone(),
            envs: Vec::new(),
        }
    }

    pub fn with_env(mut self, env: &EnvFile) -> Self {
        self.envs = env
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        self
    }

    fn compose<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec![
            "compose".to_owned(),
            "-f".to_owned(),
            self.compose_file.display().to_string(),
            "-p".to_owned(),
            self.project.clone(),
        ];
        all.extend(args.into_iter().map(Into::into));
        CommandSpec::new("docker", all).with_envs(self.envs.clone())
    }

    async fn docker<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spec = CommandSpec::new("docker", args).with_envs(self.envs.clone());
        let out = self.runner.run(&spec).await?.check(&spec)?;
        Ok(out.stdout)
    }

    /// Stop and remove the previous containers. Failures are logged only:
    /// there may be nothing to tear down.
    pub async fn down(&self) {
        let spec = self.compose(["down", "--remove-orphans"]);
        match self.runner.run(&spec).await.and_then(|o| o.check(&spec)) {
            Ok(_) => tracing::info!(project = %self.project, "previous containers removed"),
            Err(e) => tracing::debug!(error = %e, "compose down failed, ignoring"),
        }
    }

    /// Start the named services detached.
    pub async fn up(&self, services: &[&str]) -> Result<()> {
        let mut args = vec!["up".to_owned(), "-d".to_owned()];
        args.extend(services.iter().map(|s| (*s).to_owned()));
        let spec = self.compose(args);
        self.runner.run(&spec).await?.check(&spec)?;
        tracing::info!(services = ?services, "containers started");
        Ok(())
    }

    /// Names of all running containers.
    pub async fn running_containers(&self) -> Result<Vec<String>> {
        let stdout = self.docker(["ps", "--format", "{{.Names}}"]).await?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .collect())
    }

    /// Every service must have a running container whose name contains its
    /// pattern.
    pub async fn verify(&self, services: &[ServiceConfig]) -> Result<()> {
        let running = self.running_containers().await?;
        let missing = missing_services(services, &running);
        if missing.is_empty() {
            tracing::info!(count = services.len(), "all containers running");
            Ok(())
        } else {
            Err(Error::ContainersMissing(missing))
        }
    }

    /// Force-remove containers publishing any of `ports` that is still
    /// occupied. Returns the ports still held afterwards (by something that
    /// is not a container).
    pub async fn free_ports(&self, host: &str, ports: &[u16]) -> Result<Vec<u16>> {
        let mut held = Vec::new();
        for &port in ports {
            if !is_port_open(host, port, PORT_CHECK_TIMEOUT).await {
                continue;
            }
            let ids = self
                .docker(["ps".to_owned(), "-q".to_owned(), "--filter".to_owned(), format!("publish={port}")])
                .await?;
            let ids: Vec<&str> = ids.split_whitespace().collect();
            if !ids.is_empty() {
                tracing::warn!(port, containers = ?ids, "removing containers holding port");
                let mut args = vec!["rm", "-f"];
                args.extend(ids.iter().copied());
                self.docker(args).await?;
            }
            if is_port_open(host, port, PORT_CHECK_TIMEOUT).await {
                tracing::warn!(port, "port still in use by a non-container process");
                held.push(port);
            }
        }
        Ok(held)
    }
}

/// Services with no running container matching their pattern.
pub fn missing_services(services: &[ServiceConfig], running: &[String]) -> Vec<String> {
    services
        .iter()
        .filter(|s| !running.iter().any(|name| name.contains(&s.container_pattern)))
        .map(|s| s.name.clone())
        .collect()
}
