use serde::Serialize;

/// Structured trace events emitted across all agentstack crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    StageReached {
        stage: String,
        elapsed_ms: u64,
    },
    PortReady {
        name: String,
        host: String,
        port: u16,
        attempts: u32,
        elapsed_ms: u64,
    },
    CommandRun {
        command: String,
        success: bool,
        duration_ms: u64,
    },
    MigrationApplied {
        version: u32,
        name: String,
        duration_ms: u64,
    },
    MigrationSkipped {
        version: u32,
        name: String,
        drifted: bool,
    },
    CatalogSeeded {
        catalog_inserted: u64,
        templates_inserted: u64,
        links_inserted: u64,
    },
    ApiCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    CredentialObtained {
        email: String,
        via: String,
    },
    UserProvisioned {
        user_id: String,
        provisioner: String,
        agent_id: Option<String>,
        tools: usize,
    },
    SmokeTest {
        name: String,
        passed: bool,
        detail: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ags_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_event_tag() {
        let ev = TraceEvent::StageReached {
            stage: "INFRA_UP".into(),
            elapsed_ms: 12,
        };
        let v: serde_json::Value = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "StageReached");
        assert_eq!(v["stage"], "INFRA_UP");
    }
}
