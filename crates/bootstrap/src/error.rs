use std::fmt;

use ags_domain::error::Error;
use ags_domain::stage::Stage;

/// Category of a run-aborting failure. Each maps to its own exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// Missing commands, bad config, missing or invalid env file.
    Environment,
    /// Container daemon, containers, or ports.
    Infra,
    /// Migration or seed failure.
    Schema,
    /// No credential or user id could be obtained.
    Identity,
    /// Anything else, including stage-sequencing bugs.
    Internal,
}

impl FatalKind {
    pub fn exit_code(self) -> i32 {
        match self {
            FatalKind::Environment => 2,
            FatalKind::Infra => 3,
            FatalKind::Schema => 4,
            FatalKind::Identity => 5,
            FatalKind::Internal => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FatalKind::Environment => "environment",
            FatalKind::Infra => "infra",
            FatalKind::Schema => "schema",
            FatalKind::Identity => "identity",
            FatalKind::Internal => "internal",
        }
    }
}

/// A fatal error together with the last stage the run reached.
#[derive(Debug, thiserror::Error)]
pub struct BootstrapError {
    pub kind: FatalKind,
    pub last_stage: Option<Stage>,
    #[source]
    pub source: Error,
}

impl BootstrapError {
    pub fn new(kind: FatalKind, source: Error) -> Self {
        Self {
            kind,
            last_stage: None,
            source,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fatal/{}", self.kind.label())?;
        if let Some(stage) = self.last_stage {
            write!(f, " after {stage}")?;
        }
        write!(f, ": {}", self.source)
    }
}

/// Tag a domain result with the fatal category it belongs to.
pub trait Fatal<T> {
    fn fatal(self, kind: FatalKind) -> Result<T, BootstrapError>;
}

impl<T> Fatal<T> for ags_domain::Result<T> {
    fn fatal(self, kind: FatalKind) -> Result<T, BootstrapError> {
        self.map_err(|e| BootstrapError::new(kind, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct_per_category() {
        let codes: std::collections::HashSet<_> = [
            FatalKind::Environment,
            FatalKind::Infra,
            FatalKind::Schema,
            FatalKind::Identity,
        ]
        .iter()
        .map(|k| k.exit_code())
        .collect();
        assert_eq!(codes.len(), 4);
        assert!(!codes.contains(&0));
    }

    #[test]
    fn display_labels_kind_and_stage() {
        let mut e = BootstrapError::new(
            FatalKind::Infra,
            Error::ContainersMissing(vec!["redis".into()]),
        );
        e.last_stage = Some(Stage::InfraUp);
        assert_eq!(
            e.to_string(),
            "fatal/infra after INFRA_UP: expected containers not running: redis"
        );
    }

    #[test]
    fn fatal_tags_errors() {
        let r: ags_domain::Result<()> = Err(Error::Auth("no token".into()));
        let err = r.fatal(FatalKind::Identity).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
