//! The `up` workflow: every stage in order, each completing before the next.

use std::sync::Arc;
use std::time::Instant;

use sqlx::PgPool;
use uuid::Uuid;

use ags_api_client::ApiClient;
use ags_domain::config::{Config, ConfigError, ConfigSeverity};
use ags_domain::env_file::EnvFile;
use ags_domain::error::Error;
use ags_domain::model::ProvisionOutcome;
use ags_domain::placeholder::PlaceholderResolver;
use ags_domain::stage::{Stage, StageTracker};
use ags_infra::command::CommandRunner;
use ags_infra::{check_commands, ensure_daemon, probe_all, ComposeController, ProbeTarget};
use ags_store::migrations::MigrationStatus;
use ags_store::SeedReport;

use crate::error::{BootstrapError, Fatal, FatalKind};
use crate::identity::{IdentityFlow, PgUserDirectory};
use crate::provisioner::{
    provision_with_fallback, select_provisioner, AdminEndpointProvisioner, SqlProvisioner,
};
use crate::smoke::run_smoke;
use crate::summary::RunSummary;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Reuse whatever containers are running: no daemon start, no
    /// teardown, no `up`. Readiness probes still run.
    pub skip_infra: bool,
}

pub struct Orchestrator {
    config: Config,
    runner: Arc<dyn CommandRunner>,
    opts: RunOptions,
    tracker: StageTracker,
}

impl Orchestrator {
    pub fn new(config: Config, runner: Arc<dyn CommandRunner>, opts: RunOptions) -> Self {
        Self {
            config,
            runner,
            opts,
            tracker: StageTracker::new(),
        }
    }

    /// Last stage reached.
    pub fn stage(&self) -> Option<Stage> {
        self.tracker.current()
    }

    pub async fn run(&mut self) -> Result<RunSummary, BootstrapError> {
        let result = self.run_stages().await;
        result.map_err(|mut e| {
            e.last_stage = self.tracker.current();
            tracing::error!(kind = e.kind.label(), stage = ?e.last_stage, error = %e.source, "bootstrap aborted");
            e
        })
    }

    async fn run_stages(&mut self) -> Result<RunSummary, BootstrapError> {
        let started = Instant::now();
        let skip = self.opts.skip_infra;

        // ── PREREQS_CHECKED ──────────────────────────────────────────
        reject_errors(self.config.validate())?;
        if skip {
            tracing::info!("--skip-infra: not checking container tooling");
        } else {
            check_commands(self.runner.as_ref(), &self.config.infra.required_commands)
                .await
                .fatal(FatalKind::Environment)?;
        }
        step(&mut self.tracker, Stage::PrereqsChecked)?;

        // ── DOCKER_READY ─────────────────────────────────────────────
        if !skip {
            let status = ensure_daemon(self.runner.as_ref(), &self.config.daemon)
                .await
                .fatal(FatalKind::Infra)?;
            tracing::info!(%status, "container daemon ready");
        }
        step(&mut self.tracker, Stage::DockerReady)?;

        // ── ENV_LOADED ───────────────────────────────────────────────
        let (env, database_url) = load_env(&mut self.config)?;
        step(&mut self.tracker, Stage::EnvLoaded)?;

        let cfg = &self.config;
        let tracker = &mut self.tracker;
        let compose = ComposeController::new(self.runner.clone(), &cfg.infra).with_env(&env);

        // ── PORTS_FREED ──────────────────────────────────────────────
        if !skip {
            compose.down().await;
            for svc in &cfg.infra.services {
                let held = compose
                    .free_ports(&svc.host, &[svc.port])
                    .await
                    .fatal(FatalKind::Infra)?;
                if !held.is_empty() {
                    tracing::warn!(service = %svc.name, port = svc.port, "port held by another process; container start may fail");
                }
            }
        }
        step(tracker, Stage::PortsFreed)?;

        // ── INFRA_UP / INFRA_VERIFIED ────────────────────────────────
        if !skip {
            compose
                .up(&cfg.infra.service_names())
                .await
                .fatal(FatalKind::Infra)?;
        }
        step(tracker, Stage::InfraUp)?;
        compose
            .verify(&cfg.infra.services)
            .await
            .fatal(FatalKind::Infra)?;
        step(tracker, Stage::InfraVerified)?;

        // ── DB_PORTS_READY ───────────────────────────────────────────
        let targets: Vec<ProbeTarget> = cfg
            .infra
            .services
            .iter()
            .map(|s| ProbeTarget::new(&s.name, &s.host, s.port, s.critical))
            .collect();
        probe_all(&targets, cfg.readiness.infra_timeout_secs)
            .await
            .fatal(FatalKind::Infra)?;
        step(tracker, Stage::DbPortsReady)?;

        // ── DB_PROVISIONED / CATALOG_SEEDED ──────────────────────────
        let pool = ags_store::connect(&database_url, &cfg.database)
            .await
            .fatal(FatalKind::Infra)?;
        let migrations_applied = apply_migrations(&pool).await?;
        step(tracker, Stage::DbProvisioned)?;
        let seed = ags_store::seed_catalog(&pool).await.fatal(FatalKind::Schema)?;
        step(tracker, Stage::CatalogSeeded)?;

        // ── SERVICE_PORTS_READY ──────────────────────────────────────
        let (api_host, api_port) = ags_api_client::probe_endpoint(&cfg.api).fatal(FatalKind::Environment)?;
        let mut services = vec![ProbeTarget::new("api", api_host, api_port, true)];
        services.extend(
            cfg.api
                .dependents
                .iter()
                .map(|d| ProbeTarget::new(&d.name, &d.host, d.port, false)),
        );
        probe_all(&services, cfg.readiness.service_timeout_secs)
            .await
            .fatal(FatalKind::Infra)?;
        step(tracker, Stage::ServicePortsReady)?;

        // ── USER_CREATED / CREDENTIAL_OBTAINED ───────────────────────
        let api = ApiClient::new(&cfg.api).fatal(FatalKind::Environment)?;
        let users = PgUserDirectory::new(pool.clone());
        let identity = IdentityFlow::new(&api, &users, &cfg.provisioning);
        let created = identity.create_user().await.fatal(FatalKind::Identity)?;
        step(tracker, Stage::UserCreated)?;
        let target = identity
            .obtain_credential(created)
            .await
            .fatal(FatalKind::Identity)?;
        step(tracker, Stage::CredentialObtained)?;

        // ── USER_PROVISIONED ─────────────────────────────────────────
        let admin = AdminEndpointProvisioner::new(api.clone());
        let sql = SqlProvisioner::new(
            pool.clone(),
            &cfg.provisioning.template_slug,
            &cfg.provisioning.default_city,
        );
        let primary = select_provisioner(&api, &admin, &sql).await;
        let (outcome, provisioner) = match provision_with_fallback(primary, &sql, &target).await {
            Ok(done) => done,
            Err(e) => {
                tracing::error!(user_id = %target.user_id, error = %e, "provisioning failed; continuing without defaults");
                (ProvisionOutcome::default(), "none")
            }
        };
        step(tracker, Stage::UserProvisioned)?;

        // ── SMOKE_TESTED ─────────────────────────────────────────────
        let smoke = run_smoke(&api, &target.credential.token, &cfg.smoke).await;
        step(tracker, Stage::SmokeTested)?;

        pool.close().await;

        Ok(RunSummary {
            email: target.email,
            user_id: target.user_id,
            provisioner: provisioner.to_owned(),
            agent_id: outcome.agent_id,
            tools: outcome.tool_names,
            migrations_applied,
            seed,
            smoke,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

fn step(tracker: &mut StageTracker, stage: Stage) -> Result<(), BootstrapError> {
    tracker.advance(stage).fatal(FatalKind::Internal)?;
    tracing::info!(%stage, "stage reached");
    Ok(())
}

fn reject_errors(issues: Vec<ConfigError>) -> Result<(), BootstrapError> {
    let errors: Vec<String> = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .map(ToString::to_string)
        .collect();
    for warning in issues.iter().filter(|i| i.severity == ConfigSeverity::Warning) {
        tracing::warn!(%warning, "config");
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BootstrapError::new(
            FatalKind::Environment,
            Error::Config(errors.join("; ")),
        ))
    }
}

/// Load the env file, apply its overrides to `config`, and return it with
/// the database URL.
pub fn load_env(config: &mut Config) -> Result<(EnvFile, String), BootstrapError> {
    let env = EnvFile::load(&config.env.file, &config.env.required_keys)
        .fatal(FatalKind::Environment)?;
    reject_errors(config.validate_overrides(&env))?;
    config.apply_env_overrides(&env);

    let key = &config.env.database_url_key;
    let database_url = env
        .get(key)
        .map(str::to_owned)
        .ok_or_else(|| Error::MissingEnvKey {
            path: env.path().display().to_string(),
            key: key.clone(),
        })
        .fatal(FatalKind::Environment)?;
    Ok((env, database_url))
}

async fn apply_migrations(pool: &PgPool) -> Result<usize, BootstrapError> {
    let outcomes = ags_store::reconcile(pool).await.fatal(FatalKind::Schema)?;
    Ok(outcomes
        .iter()
        .filter(|o| o.status == MigrationStatus::Applied)
        .count())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Partial workflows
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Env, schema and catalog only, against an already running database.
pub async fn migrate_only(config: &mut Config) -> Result<(usize, SeedReport), BootstrapError> {
    let (_env, database_url) = load_env(config)?;
    let pool = ags_store::connect(&database_url, &config.database)
        .await
        .fatal(FatalKind::Infra)?;
    let applied = apply_migrations(&pool).await?;
    let seed = ags_store::seed_catalog(&pool).await.fatal(FatalKind::Schema)?;
    pool.close().await;
    Ok((applied, seed))
}

/// SQL provisioning for an existing user.
pub async fn provision_existing(
    config: &mut Config,
    user_id: Uuid,
) -> Result<ProvisionOutcome, BootstrapError> {
    let (_env, database_url) = load_env(config)?;
    let pool = ags_store::connect(&database_url, &config.database)
        .await
        .fatal(FatalKind::Infra)?;
    let resolver = PlaceholderResolver::with_city(&config.provisioning.default_city);
    let outcome = ags_store::provision_defaults(
        &pool,
        user_id,
        &config.provisioning.template_slug,
        &resolver,
    )
    .await
    .fatal(FatalKind::Schema)?;
    pool.close().await;

    match outcome {
        Some(o) => Ok(o),
        None => {
            tracing::warn!(slug = %config.provisioning.template_slug, "agent template not found");
            Ok(ProvisionOutcome::default())
        }
    }
}
