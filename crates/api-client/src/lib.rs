//! `ags-api-client`: typed client for the agent platform's HTTP API as the
//! bootstrap consumes it (auth, admin provisioning, agents, tools).

pub mod rest;
pub mod types;

pub use rest::{from_reqwest, probe_endpoint, ApiClient, ADMIN_PROVISION_PATH};
pub use types::{AdminProvisionResponse, AgentDto, AuthResponse, ToolDto, ToolRunResponse};
