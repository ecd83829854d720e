//! Post-provisioning smoke calls. Failures are reported, never fatal.

use serde::Serialize;

use ags_api_client::ApiClient;
use ags_domain::config::SmokeConfig;
use ags_domain::trace::TraceEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmokeResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl SmokeResult {
    fn record(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        let r = Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        };
        TraceEvent::SmokeTest {
            name: r.name.clone(),
            passed: r.passed,
            detail: r.detail.clone(),
        }
        .emit();
        if r.passed {
            tracing::info!(name = %r.name, detail = %r.detail, "smoke test passed");
        } else {
            tracing::warn!(name = %r.name, detail = %r.detail, "smoke test failed");
        }
        r
    }
}

/// List agents, list tools, then run every configured tool call.
pub async fn run_smoke(api: &ApiClient, token: &str, cfg: &SmokeConfig) -> Vec<SmokeResult> {
    let mut results = Vec::with_capacity(2 + cfg.tool_calls.len());

    results.push(match api.list_agents(token).await {
        Ok(agents) => SmokeResult::record("agents.list", !agents.is_empty(), format!("{} agent(s)", agents.len())),
        Err(e) => SmokeResult::record("agents.list", false, e.to_string()),
    });

    results.push(match api.list_tools(token).await {
        Ok(tools) => {
            let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
            SmokeResult::record("tools.list", !tools.is_empty(), names.join(", "))
        }
        Err(e) => SmokeResult::record("tools.list", false, e.to_string()),
    });

    for call in &cfg.tool_calls {
        let name = format!("tools.run:{}", call.tool);
        results.push(match api.run_tool(token, &call.tool, &call.args).await {
            Ok(resp) => SmokeResult::record(name, resp.ok, truncate(&resp.result.to_string(), 120)),
            Err(e) => SmokeResult::record(name, false, e.to_string()),
        });
    }

    results
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé...");
        assert_eq!(truncate("ok", 10), "ok");
    }
}
