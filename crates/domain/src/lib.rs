//! Shared types for the agentstack bootstrap workspace: configuration,
//! the env file loader, the error type, trace events, the provisioning data
//! model and the run stage machine.

pub mod config;
pub mod env_file;
pub mod error;
pub mod model;
pub mod placeholder;
pub mod stage;
pub mod trace;

pub use error::{Error, Result};
