//! Per-user defaults created straight from the template tables.

use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use ags_domain::error::Result;
use ags_domain::model::ProvisionOutcome;
use ags_domain::placeholder::PlaceholderResolver;

use crate::db_err;

/// Clone template `slug` and its linked catalog tools into `user_id`'s scope.
///
/// Idempotent: the agent and tools are upserted on `(user_id, name)` and
/// links are insert-or-skip. Returns `Ok(None)` when the template does not
/// exist. A config with an unknown placeholder aborts the whole transaction.
pub async fn provision_defaults(
    pool: &PgPool,
    user_id: Uuid,
    slug: &str,
    resolver: &PlaceholderResolver,
) -> Result<Option<ProvisionOutcome>> {
    let mut tx = pool.begin().await.map_err(db_err)?;

    let Some(tpl) = sqlx::query(
        "select id, name, system_prompt, model, temperature::float8 as temperature
           from agent_templates where slug = $1 limit 1",
    )
    .bind(slug)
    .fetch_optional(&mut *tx)
    .await
    .map_err(db_err)?
    else {
        return Ok(None);
    };

    let template_id: Uuid = tpl.try_get("id").map_err(db_err)?;
    let agent_id: Uuid = sqlx::query_scalar(
        "insert into agents (user_id, name, system_prompt, model, temperature)
         values ($1, $2, $3, $4, $5)
         on conflict (user_id, name) do update
            set system_prompt = excluded.system_prompt,
                model         = excluded.model,
                temperature   = excluded.temperature,
                updated_at    = now()
         returning id",
    )
    .bind(user_id)
    .bind(tpl.try_get::<String, _>("name").map_err(db_err)?)
    .bind(tpl.try_get::<String, _>("system_prompt").map_err(db_err)?)
    .bind(tpl.try_get::<String, _>("model").map_err(db_err)?)
    .bind(tpl.try_get::<f64, _>("temperature").map_err(db_err)?)
    .fetch_one(&mut *tx)
    .await
    .map_err(db_err)?;

    let tools: Vec<(String, String, Value)> = sqlx::query_as(
        "select g.name, g.kind, g.config
           from agent_template_tools att
           join global_tools_catalog g on g.id = att.tool_id
          where att.template_id = $1
          order by g.name",
    )
    .bind(template_id)
    .fetch_all(&mut *tx)
    .await
    .map_err(db_err)?;

    let mut tool_names = Vec::with_capacity(tools.len());
    for (name, kind, config) in tools {
        let config = resolver.resolve(&config)?;
        let tool_id: Uuid = sqlx::query_scalar(
            "insert into tools (user_id, name, kind, config) values ($1, $2, $3, $4)
             on conflict (user_id, name) do update
                set kind = excluded.kind,
                    config = excluded.config
             returning id",
        )
        .bind(user_id)
        .bind(&name)
        .bind(&kind)
        .bind(&config)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        sqlx::query("insert into agent_tools (agent_id, tool_id) values ($1, $2) on conflict do nothing")
            .bind(agent_id)
            .bind(tool_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tool_names.push(name);
    }

    tx.commit().await.map_err(db_err)?;
    tracing::info!(%user_id, %agent_id, tools = tool_names.len(), "defaults provisioned via SQL");

    Ok(Some(ProvisionOutcome {
        agent_id: Some(agent_id),
        tool_names,
    }))
}
