//! Versioned schema reconciliation.
//!
//! Migrations are compiled in and applied in version order. Each runs in its
//! own transaction together with its `_schema_migrations` row, so a failed
//! document leaves neither partial schema nor a ledger entry behind. The
//! documents themselves stay idempotent: a database created before the
//! ledger existed reconciles without errors.

use std::collections::HashMap;
use std::time::Instant;

use sha2::{Digest, Sha256};
use sqlx::PgPool;

use ags_domain::error::{Error, Result};
use ags_domain::trace::TraceEvent;

use crate::db_err;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

impl Migration {
    pub fn checksum(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "users_and_auth",
        sql: include_str!("../migrations/V1__users_and_auth.sql"),
    },
    Migration {
        version: 2,
        name: "agents_and_tools",
        sql: include_str!("../migrations/V2__agents_and_tools.sql"),
    },
    Migration {
        version: 3,
        name: "catalog_and_templates",
        sql: include_str!("../migrations/V3__catalog_and_templates.sql"),
    },
];

const LEDGER_DDL: &str = "create table if not exists _schema_migrations (
    version     integer primary key,
    name        text not null,
    checksum    text not null,
    applied_at  timestamptz not null default now()
)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    Applied,
    AlreadyApplied,
    /// Recorded with a different checksum; left as is.
    Drifted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub version: u32,
    pub name: String,
    pub status: MigrationStatus,
}

/// Versions strictly increasing, names non-empty, no empty documents.
pub fn validate(migrations: &[Migration]) -> Result<()> {
    let mut prev = 0u32;
    for m in migrations {
        if m.version <= prev {
            return Err(Error::Migration {
                version: m.version,
                name: m.name.to_owned(),
                message: format!("version must be greater than V{prev}"),
            });
        }
        if m.name.trim().is_empty() || m.sql.trim().is_empty() {
            return Err(Error::Migration {
                version: m.version,
                name: m.name.to_owned(),
                message: "name and body must be non-empty".into(),
            });
        }
        prev = m.version;
    }
    Ok(())
}

/// Apply every compiled migration not yet in the ledger.
pub async fn reconcile(pool: &PgPool) -> Result<Vec<MigrationOutcome>> {
    reconcile_with(pool, MIGRATIONS).await
}

pub async fn reconcile_with(pool: &PgPool, migrations: &[Migration]) -> Result<Vec<MigrationOutcome>> {
    validate(migrations)?;

    sqlx::raw_sql(LEDGER_DDL).execute(pool).await.map_err(db_err)?;

    let recorded: HashMap<i32, String> =
        sqlx::query_as::<_, (i32, String)>("select version, checksum from _schema_migrations")
            .fetch_all(pool)
            .await
            .map_err(db_err)?
            .into_iter()
            .collect();

    let mut outcomes = Vec::with_capacity(migrations.len());
    for m in migrations {
        let checksum = m.checksum();
        if let Some(stored) = recorded.get(&(m.version as i32)) {
            let drifted = *stored != checksum;
            if drifted {
                tracing::warn!(
                    version = m.version,
                    name = m.name,
                    "applied migration differs from the compiled document; not re-applying"
                );
            }
            TraceEvent::MigrationSkipped {
                version: m.version,
                name: m.name.to_owned(),
                drifted,
            }
            .emit();
            outcomes.push(MigrationOutcome {
                version: m.version,
                name: m.name.to_owned(),
                status: if drifted {
                    MigrationStatus::Drifted
                } else {
                    MigrationStatus::AlreadyApplied
                },
            });
            continue;
        }

        apply(pool, m, &checksum).await?;
        outcomes.push(MigrationOutcome {
            version: m.version,
            name: m.name.to_owned(),
            status: MigrationStatus::Applied,
        });
    }
    Ok(outcomes)
}

async fn apply(pool: &PgPool, m: &Migration, checksum: &str) -> Result<()> {
    let started = Instant::now();
    let fail = |e: sqlx::Error| Error::Migration {
        version: m.version,
        name: m.name.to_owned(),
        message: e.to_string(),
    };

    let mut tx = pool.begin().await.map_err(fail)?;
    sqlx::raw_sql(m.sql).execute(&mut *tx).await.map_err(fail)?;
    sqlx::query("insert into _schema_migrations (version, name, checksum) values ($1, $2, $3)")
        .bind(m.version as i32)
        .bind(m.name)
        .bind(checksum)
        .execute(&mut *tx)
        .await
        .map_err(fail)?;
    tx.commit().await.map_err(fail)?;

    TraceEvent::MigrationApplied {
        version: m.version,
        name: m.name.to_owned(),
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();
    tracing::info!(version = m.version, name = m.name, "migration applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_list_is_valid() {
        validate(MIGRATIONS).unwrap();
        assert_eq!(MIGRATIONS.len(), 3);
    }

    #[test]
    fn documents_are_idempotent_ddl() {
        for m in MIGRATIONS {
            let lower = m.sql.to_lowercase();
            for line in lower.lines().map(str::trim) {
                if line.starts_with("create table") {
                    assert!(line.starts_with("create table if not exists"), "V{}: {line}", m.version);
                }
                if line.starts_with("create unique index") || line.starts_with("create index") {
                    assert!(line.contains("if not exists"), "V{}: {line}", m.version);
                }
            }
        }
    }

    #[test]
    fn unique_keys_provisioning_relies_on_exist() {
        let all: String = MIGRATIONS.iter().map(|m| m.sql).collect();
        assert!(all.contains("on agents(user_id, name)"));
        assert!(all.contains("on tools(user_id, name)"));
        assert!(all.contains("on global_tools_catalog(name)"));
        assert!(all.contains("on agent_templates(slug)"));
    }

    #[test]
    fn rejects_out_of_order_versions() {
        let list = [
            Migration { version: 2, name: "b", sql: "select 1" },
            Migration { version: 1, name: "a", sql: "select 1" },
        ];
        let err = validate(&list).unwrap_err();
        assert_eq!(
            err.to_string(),
            "migration V1 (a): version must be greater than V2"
        );
    }

    #[test]
    fn rejects_empty_name() {
        let list = [Migration { version: 1, name: " ", sql: "select 1" }];
        assert!(validate(&list).is_err());
    }

    #[test]
    fn checksum_tracks_content() {
        let a = Migration { version: 1, name: "a", sql: "select 1" };
        let b = Migration { sql: "select 2", ..a };
        assert_ne!(a.checksum(), b.checksum());
        assert_eq!(a.checksum().len(), 64);
    }
}
