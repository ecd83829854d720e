//! Per-user default provisioning strategies.
//!
//! Two strategies produce the same rows: the API's admin endpoint, and the
//! direct SQL procedure. One capability probe against the OpenAPI document
//! picks the strategy; a run-time failure of the admin strategy falls back
//! to SQL once.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use ags_api_client::{ApiClient, ADMIN_PROVISION_PATH};
use ags_domain::error::Result;
use ags_domain::model::{ProvisionOutcome, ProvisionTarget};
use ags_domain::placeholder::PlaceholderResolver;
use ags_domain::trace::TraceEvent;

#[async_trait]
pub trait Provisioner: Send + Sync {
    fn name(&self) -> &'static str;
    async fn provision(&self, user: &ProvisionTarget) -> Result<ProvisionOutcome>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Strategies
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct AdminEndpointProvisioner {
    api: ApiClient,
}

impl AdminEndpointProvisioner {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Provisioner for AdminEndpointProvisioner {
    fn name(&self) -> &'static str {
        "admin-endpoint"
    }

    async fn provision(&self, user: &ProvisionTarget) -> Result<ProvisionOutcome> {
        let token = &user.credential.token;
        let resp = self.api.admin_provision(token).await?;
        // The endpoint does not report tools; read them back for the summary.
        let tool_names = match self.api.list_tools(token).await {
            Ok(tools) => tools.into_iter().map(|t| t.name).collect(),
            Err(e) => {
                tracing::debug!(error = %e, "could not list tools after admin provisioning");
                Vec::new()
            }
        };
        Ok(ProvisionOutcome {
            agent_id: resp.agent_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
            tool_names,
        })
    }
}

pub struct SqlProvisioner {
    pool: PgPool,
    template_slug: String,
    resolver: PlaceholderResolver,
}

impl SqlProvisioner {
    pub fn new(pool: PgPool, template_slug: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            pool,
            template_slug: template_slug.into(),
            resolver: PlaceholderResolver::with_city(city),
        }
    }
}

#[async_trait]
impl Provisioner for SqlProvisioner {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn provision(&self, user: &ProvisionTarget) -> Result<ProvisionOutcome> {
        match ags_store::provision_defaults(&self.pool, user.user_id, &self.template_slug, &self.resolver)
            .await?
        {
            Some(outcome) => Ok(outcome),
            None => {
                tracing::warn!(
                    slug = %self.template_slug,
                    user_id = %user.user_id,
                    "agent template not found; nothing provisioned"
                );
                Ok(ProvisionOutcome::default())
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Selection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Choose the admin strategy when the API advertises the endpoint,
/// otherwise SQL. A failed probe counts as "not advertised".
pub async fn select_provisioner<'a>(
    api: &ApiClient,
    admin: &'a dyn Provisioner,
    sql: &'a dyn Provisioner,
) -> &'a dyn Provisioner {
    match api.advertises_path(ADMIN_PROVISION_PATH).await {
        Ok(true) => admin,
        Ok(false) => {
            tracing::info!("API does not advertise {ADMIN_PROVISION_PATH}; using SQL provisioning");
            sql
        }
        Err(e) => {
            tracing::warn!(error = %e, "capability probe failed; using SQL provisioning");
            sql
        }
    }
}

/// Run `primary`; if it fails and is not already `fallback`, run
/// `fallback` once. Returns the outcome and the strategy that produced it.
pub async fn provision_with_fallback(
    primary: &dyn Provisioner,
    fallback: &dyn Provisioner,
    user: &ProvisionTarget,
) -> Result<(ProvisionOutcome, &'static str)> {
    let outcome = match primary.provision(user).await {
        Ok(outcome) => (outcome, primary.name()),
        Err(e) if primary.name() != fallback.name() => {
            if e.is_missing_endpoint() {
                tracing::info!(
                    strategy = primary.name(),
                    "endpoint advertised but absent, falling back to {}",
                    fallback.name()
                );
            } else {
                tracing::warn!(
                    strategy = primary.name(),
                    error = %e,
                    "provisioning failed, falling back to {}",
                    fallback.name()
                );
            }
            (fallback.provision(user).await?, fallback.name())
        }
        Err(e) => return Err(e),
    };

    TraceEvent::UserProvisioned {
        user_id: user.user_id.to_string(),
        provisioner: outcome.1.to_owned(),
        agent_id: outcome.0.agent_id.map(|id| id.to_string()),
        tools: outcome.0.tool_names.len(),
    }
    .emit();
    Ok(outcome)
}
