use ags_domain::error::{Error, Result};

use crate::command::{CommandRunner, CommandSpec};

/// Check that every command in `commands` can be spawned (`<cmd> --version`).
///
/// Returns the missing commands in one error so the operator can install
/// them in a single pass.
pub async fn check_commands(runner: &dyn CommandRunner, commands: &[String]) -> Result<()> {
    let mut missing = Vec::new();
    for cmd in commands {
        let spec = CommandSpec::new(cmd, ["--version"]);
        match runner.run(&spec).await {
            Ok(out) if out.success => {
                tracing::debug!(command = %cmd, version = %out.stdout.trim(), "found");
            }
            Ok(out) => {
                tracing::warn!(command = %cmd, stderr = %out.stderr.trim(), "--version failed");
                missing.push(cmd.clone());
            }
            Err(_) => missing.push(cmd.clone()),
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Command {
            command: missing.join(", "),
            message: "required command not found on PATH".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, ScriptedRunner};

    #[tokio::test]
    async fn all_present_passes() {
        let runner = ScriptedRunner::new(|_, _| Ok(CommandOutput::ok("v1\n")));
        check_commands(&runner, &["docker".into(), "psql".into()])
            .await
            .unwrap();
        assert_eq!(runner.calls(), vec!["docker --version", "psql --version"]);
    }

    #[tokio::test]
    async fn reports_every_missing_command() {
        let runner = ScriptedRunner::new(|spec, _| match spec.program.as_str() {
            "docker" => Ok(CommandOutput::ok("Docker version 27")),
            other => Err(Error::Command {
                command: other.into(),
                message: "failed to spawn".into(),
            }),
        });
        let err = check_commands(&runner, &["docker".into(), "colima".into(), "lsof".into()])
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "command `colima, lsof` failed: required command not found on PATH"
        );
    }
}
