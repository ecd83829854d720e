//! The bootstrap run as a strictly forward state machine.

use std::fmt;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::trace::TraceEvent;

/// Run stages in execution order. A run only ever moves to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    PrereqsChecked,
    DockerReady,
    EnvLoaded,
    PortsFreed,
    InfraUp,
    InfraVerified,
    DbPortsReady,
    DbProvisioned,
    CatalogSeeded,
    ServicePortsReady,
    UserCreated,
    CredentialObtained,
    UserProvisioned,
    SmokeTested,
}

impl Stage {
    pub const ALL: [Stage; 14] = [
        Stage::PrereqsChecked,
        Stage::DockerReady,
        Stage::EnvLoaded,
        Stage::PortsFreed,
        Stage::InfraUp,
        Stage::InfraVerified,
        Stage::DbPortsReady,
        Stage::DbProvisioned,
        Stage::CatalogSeeded,
        Stage::ServicePortsReady,
        Stage::UserCreated,
        Stage::CredentialObtained,
        Stage::UserProvisioned,
        Stage::SmokeTested,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::PrereqsChecked => "PREREQS_CHECKED",
            Stage::DockerReady => "DOCKER_READY",
            Stage::EnvLoaded => "ENV_LOADED",
            Stage::PortsFreed => "PORTS_FREED",
            Stage::InfraUp => "INFRA_UP",
            Stage::InfraVerified => "INFRA_VERIFIED",
            Stage::DbPortsReady => "DB_PORTS_READY",
            Stage::DbProvisioned => "DB_PROVISIONED",
            Stage::CatalogSeeded => "CATALOG_SEEDED",
            Stage::ServicePortsReady => "SERVICE_PORTS_READY",
            Stage::UserCreated => "USER_CREATED",
            Stage::CredentialObtained => "CREDENTIAL_OBTAINED",
            Stage::UserProvisioned => "USER_PROVISIONED",
            Stage::SmokeTested => "SMOKE_TESTED",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn first() -> Stage {
        Stage::ALL[0]
    }

    pub fn next(self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks the last reached stage and rejects anything but the successor.
#[derive(Debug)]
pub struct StageTracker {
    current: Option<Stage>,
    started: Instant,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            current: None,
            started: Instant::now(),
        }
    }

    pub fn current(&self) -> Option<Stage> {
        self.current
    }

    /// The stage the run is expected to reach next.
    pub fn expected(&self) -> Option<Stage> {
        match self.current {
            None => Some(Stage::first()),
            Some(s) => s.next(),
        }
    }

    /// Record that `stage` was reached.
    pub fn advance(&mut self, stage: Stage) -> Result<()> {
        match self.expected() {
            Some(expected) if expected == stage => {
                self.current = Some(stage);
                TraceEvent::StageReached {
                    stage: stage.as_str().into(),
                    elapsed_ms: self.started.elapsed().as_millis() as u64,
                }
                .emit();
                Ok(())
            }
            Some(expected) => Err(Error::Stage(format!(
                "cannot move to {stage}; next stage is {expected}"
            ))),
            None => Err(Error::Stage(format!(
                "cannot move to {stage}; run already finished"
            ))),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_some_and(Stage::is_terminal)
    }
}
