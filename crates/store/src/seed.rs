//! Reference data every environment needs: the global tool catalog, the
//! default agent template and the template's tool links.

use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;

use ags_domain::error::Result;
use ags_domain::model::{AgentTemplate, CatalogEntry, ToolKind};
use ags_domain::trace::TraceEvent;

use crate::db_err;

/// Catalog entries linked to the default template.
pub const DEFAULT_TEMPLATE_TOOLS: &[&str] = &["weather", "ip.lookup", "rag.search"];

pub fn default_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            name: "weather".into(),
            kind: ToolKind::Http,
            config: json!({
                "method": "GET",
                "url": "https://wttr.in/{{city}}",
                "query": { "format": "j1" },
                "timeout_s": 15,
                "allowed_hosts": ["wttr.in"]
            }),
        },
        CatalogEntry {
            name: "ip.lookup".into(),
            kind: ToolKind::Http,
            config: json!({
                "method": "GET",
                "url": "https://ipinfo.io/{ip}/json",
                "timeout_s": 15,
                "allowed_hosts": ["ipinfo.io"]
            }),
        },
        CatalogEntry {
            name: "joke.random".into(),
            kind: ToolKind::Http,
            config: json!({
                "method": "GET",
                "url": "https://official-joke-api.appspot.com/random_joke",
                "timeout_s": 15,
                "allowed_hosts": ["official-joke-api.appspot.com"]
            }),
        },
        CatalogEntry {
            name: "rag.search".into(),
            kind: ToolKind::RagSearch,
            config: json!({ "k": 4 }),
        },
    ]
}

pub fn default_template() -> AgentTemplate {
    AgentTemplate {
        slug: "jeeves".into(),
        name: "Jeeves".into(),
        system_prompt: "You are Jeeves, a concise and courteous assistant. \
                        Use the available tools when they help answer the question."
            .into(),
        model: "local-chat".into(),
        temperature: 0.2,
    }
}

/// Rows inserted per table by one seeding pass. All zero on a re-run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub catalog_inserted: u64,
    pub templates_inserted: u64,
    pub links_inserted: u64,
}

/// Seed the default catalog and template.
pub async fn seed_catalog(pool: &PgPool) -> Result<SeedReport> {
    seed(pool, &default_catalog(), &default_template(), DEFAULT_TEMPLATE_TOOLS).await
}

/// Insert-or-skip every catalog entry, the template, and the links from the
/// template to `linked` catalog names, all in one transaction. Existing rows
/// are never modified.
pub async fn seed(
    pool: &PgPool,
    catalog: &[CatalogEntry],
    template: &AgentTemplate,
    linked: &[&str],
) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    let mut tx = pool.begin().await.map_err(db_err)?;

    for entry in catalog {
        let done = sqlx::query(
            "insert into global_tools_catalog (name, kind, config) values ($1, $2, $3)
             on conflict (name) do nothing",
        )
        .bind(&entry.name)
        .bind(entry.kind.as_str())
        .bind(&entry.config)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        report.catalog_inserted += done.rows_affected();
    }

    let done = sqlx::query(
        "insert into agent_templates (slug, name, system_prompt, model, temperature)
         values ($1, $2, $3, $4, $5)
         on conflict (slug) do nothing",
    )
    .bind(&template.slug)
    .bind(&template.name)
    .bind(&template.system_prompt)
    .bind(&template.model)
    .bind(template.temperature)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;
    report.templates_inserted = done.rows_affected();

    let names: Vec<String> = linked.iter().map(|s| (*s).to_owned()).collect();
    let done = sqlx::query(
        "insert into agent_template_tools (template_id, tool_id)
         select t.id, g.id
           from agent_templates t
           join global_tools_catalog g on g.name = any($2)
          where t.slug = $1
         on conflict do nothing",
    )
    .bind(&template.slug)
    .bind(&names)
    .execute(&mut *tx)
    .await
    .map_err(db_err)?;
    report.links_inserted = done.rows_affected();

    tx.commit().await.map_err(db_err)?;

    TraceEvent::CatalogSeeded {
        catalog_inserted: report.catalog_inserted,
        templates_inserted: report.templates_inserted,
        links_inserted: report.links_inserted,
    }
    .emit();
    Ok(report)
}
