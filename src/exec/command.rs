// src/exec/command.rs

//! Shell job process runner.

use std::process::Stdio;

use anyhow::Context;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::errors::{BuildclothError, Result};
use crate::job::{JobArgs, ShellCommand};

/// Run `cmd` in its working directory and wait for it to exit.
///
/// Positional job arguments are appended to the argument vector; named ones
/// are exported as environment variables. The child is killed if this future
/// is dropped (e.g. on a stage timeout).
pub async fn run_shell(cmd: &ShellCommand, args: &JobArgs) -> Result<()> {
    let program = cmd.program().to_string();

    let mut command = Command::new(&program);
    command.args(cmd.args()).current_dir(cmd.dir());
    match args {
        JobArgs::Positional(extra) => {
            command.args(extra.iter().map(value_to_arg));
        }
        JobArgs::Named(vars) => {
            command.envs(vars.iter().map(|(k, v)| (k, value_to_arg(v))));
        }
    }

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!(cmd = %cmd, "starting shell job");

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning process for `{}` in {:?}", program, cmd.dir()))?;

    // Always consume both pipes so buffers don't fill.
    let stdout_task = child.stdout.take().map(|stdout| {
        let program = program.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(program = %program, "stdout: {}", line);
            }
        })
    });
    let stderr_task = child.stderr.take().map(|stderr| {
        let program = program.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(program = %program, "stderr: {}", line);
            }
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process `{}`", program))?;

    for handle in [stdout_task, stderr_task].into_iter().flatten() {
        let _ = handle.await;
    }

    let code = status.code().unwrap_or(-1);
    debug!(cmd = %cmd, exit_code = code, success = status.success(), "shell job exited");

    if status.success() {
        Ok(())
    } else {
        Err(BuildclothError::JobFailed(format!(
            "`{}` exited with status {code}",
            cmd.argv().join(" ")
        )))
    }
}

fn value_to_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn runs_in_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ShellCommand::new(vec!["touch".into(), "made.txt".into()], dir.path()).unwrap();
        run_shell(&cmd, &JobArgs::default()).await.unwrap();
        assert!(dir.path().join("made.txt").exists());
    }

    #[tokio::test]
    async fn positional_args_extend_argv() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = ShellCommand::new(vec!["touch".into()], dir.path()).unwrap();
        let args = JobArgs::try_from(json!(["one", "two"])).unwrap();
        run_shell(&cmd, &args).await.unwrap();
        assert!(dir.path().join("one").exists());
        assert!(dir.path().join("two").exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_a_job_failure() {
        let cmd = ShellCommand::new(vec!["false".into()], ".").unwrap();
        let err = run_shell(&cmd, &JobArgs::default()).await.unwrap_err();
        assert!(matches!(err, BuildclothError::JobFailed(_)));
    }

    #[tokio::test]
    async fn missing_program_is_an_error() {
        let cmd = ShellCommand::new(vec!["definitely-not-a-real-program-xyz".into()], ".").unwrap();
        assert!(run_shell(&cmd, &JobArgs::default()).await.is_err());
    }
}
