use std::fmt::Write as _;

use serde::Serialize;
use uuid::Uuid;

use ags_store::SeedReport;

use crate::smoke::SmokeResult;

/// What one `up` run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub email: String,
    pub user_id: Uuid,
    /// Strategy that provisioned the user, or `"none"` if both failed.
    pub provisioner: String,
    pub agent_id: Option<Uuid>,
    pub tools: Vec<String>,
    pub migrations_applied: usize,
    pub seed: SeedReport,
    pub smoke: Vec<SmokeResult>,
    pub elapsed_ms: u64,
}

impl RunSummary {
    pub fn smoke_passed(&self) -> usize {
        self.smoke.iter().filter(|s| s.passed).count()
    }

    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let row = |out: &mut String, k: &str, v: &str| {
            let _ = writeln!(out, "  {k:<20} {v}");
        };

        out.push_str("agentstack bootstrap summary\n");
        out.push_str("============================\n");
        row(&mut out, "email", &self.email);
        row(&mut out, "user id", &self.user_id.to_string());
        row(&mut out, "provisioner", &self.provisioner);
        row(
            &mut out,
            "agent id",
            &self.agent_id.map_or_else(|| "-".to_owned(), |id| id.to_string()),
        );
        row(&mut out, "tools", &if self.tools.is_empty() { "-".to_owned() } else { self.tools.join(", ") });
        row(&mut out, "migrations applied", &self.migrations_applied.to_string());
        row(
            &mut out,
            "seeded rows",
            &format!(
                "catalog={} templates={} links={}",
                self.seed.catalog_inserted, self.seed.templates_inserted, self.seed.links_inserted
            ),
        );
        row(&mut out, "elapsed", &format!("{:.1}s", self.elapsed_ms as f64 / 1000.0));

        let _ = writeln!(out, "\nsmoke tests ({}/{} passed)", self.smoke_passed(), self.smoke.len());
        for s in &self.smoke {
            let status = if s.passed { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "  [{status}] {}: {}", s.name, s.detail);
        }
        out
    }
}
