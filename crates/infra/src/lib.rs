//! Local infrastructure control: readiness probing, the container daemon,
//! and the compose-managed database / cache / object store.

pub mod command;
pub mod compose;
pub mod daemon;
pub mod prereqs;
pub mod readiness;

pub use command::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use compose::ComposeController;
pub use daemon::{ensure_daemon, DaemonStatus};
pub use prereqs::check_commands;
pub use readiness::{probe_all, wait_for_port, ProbeReport, ProbeTarget};
