//! `agentstack` bootstrap: brings up local infra, reconciles the schema,
//! seeds reference data, creates and provisions a throwaway user, and runs
//! smoke calls against the API.

pub mod cli;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod provisioner;
pub mod smoke;
pub mod summary;

pub use error::{BootstrapError, FatalKind};
pub use orchestrator::{Orchestrator, RunOptions};
pub use summary::RunSummary;
