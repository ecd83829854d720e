//! External command execution behind a trait so the lifecycle code can be
//! driven by a scripted runner in tests.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;

use ags_domain::error::{Error, Result};
use ags_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment variables for the child only.
    pub envs: Vec<(String, String)>,
    /// Kill the child and fail with [`Error::Timeout`] past this.
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_owned(),
            args: args.into_iter().map(Into::into).collect(),
            envs: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_envs(mut self, envs: Vec<(String, String)>) -> Self {
        self.envs = envs;
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Turn a non-zero exit into [`Error::Command`].
    pub fn check(self, spec: &CommandSpec) -> Result<CommandOutput> {
        if self.success {
            return Ok(self);
        }
        let detail = if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        };
        Err(Error::Command {
            command: spec.to_string(),
            message: match self.code {
                Some(code) => format!("exit {code}: {detail}"),
                None => format!("terminated by signal: {detail}"),
            },
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runner
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion. `Err` only when the program could not be spawned;
    /// a non-zero exit is reported through [`CommandOutput::success`].
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;
}

/// Runs real processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        let start = Instant::now();
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        cmd.stdin(std::process::Stdio::null());
        cmd.kill_on_drop(true);
        for (k, v) in &spec.envs {
            cmd.env(k, v);
        }

        let spawn_err = |e: std::io::Error| Error::Command {
            command: spec.to_string(),
            message: format!("failed to spawn: {e}"),
        };
        let output = match spec.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| Error::Timeout(format!("`{spec}` still running after {limit:?}")))?
                .map_err(spawn_err)?,
            None => cmd.output().await.map_err(spawn_err)?,
        };

        let out = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        TraceEvent::CommandRun {
            command: spec.to_string(),
            success: out.success,
            duration_ms: start.elapsed().as_millis() as u64,
        }
        .emit();
        tracing::debug!(command = %spec, code = ?out.code, "command finished");

        Ok(out)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted runner (tests)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(any(test, feature = "test-util"))]
pub use scripted::ScriptedRunner;

#[cfg(any(test, feature = "test-util"))]
mod scripted {
    use std::sync::Mutex;

    use super::*;

    type Script = Box<dyn Fn(&CommandSpec, usize) -> Result<CommandOutput> + Send + Sync>;

    /// Answers commands from a closure and records every call.
    ///
    /// The closure receives the spec and how many times a command with the
    /// same rendered text ran before.
    pub struct ScriptedRunner {
        script: Script,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl ScriptedRunner {
        pub fn new<F>(script: F) -> Self
        where
            F: Fn(&CommandSpec, usize) -> Result<CommandOutput> + Send + Sync + 'static,
        {
            Self {
                script: Box::new(script),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(ToString::to_string)
                .collect()
        }

        pub fn specs(&self) -> Vec<CommandSpec> {
            self.calls.lock().expect("calls lock").clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
            let prior = {
                let mut calls = self.calls.lock().expect("calls lock");
                let rendered = spec.to_string();
                let prior = calls.iter().filter(|c| c.to_string() == rendered).count();
                calls.push(spec.clone());
                prior
            };
            (self.script)(spec, prior)
        }
    }
}
