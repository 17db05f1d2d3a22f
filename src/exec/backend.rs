// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! Stages hand leaf jobs (registered tasks and shell commands) to an
//! `ExecutorBackend` instead of running them directly. This makes it easy to
//! swap in a fake executor in tests while keeping the production
//! implementation in [`command`](super::command).
//!
//! Nested sequences are never given to a backend; the owning stage unrolls
//! them and feeds their jobs back through the same backend.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::errors::{BuildclothError, Result};
use crate::job::{Action, Job};

use super::command::run_shell;

/// Trait abstracting how a single leaf job is executed.
///
/// Production code uses [`RealExecutorBackend`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ExecutorBackend: Send + Sync {
    /// Run one job to completion. An `Err` marks the job as failed.
    fn execute<'a>(&'a self, job: &'a Job) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// Real executor backend used in production.
///
/// - Task callables run on tokio's blocking pool.
/// - Shell commands run as child processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealExecutorBackend;

impl RealExecutorBackend {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn execute<'a>(&'a self, job: &'a Job) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            match &job.action {
                Action::Task { name, func } => {
                    debug!(task = %name, args = %job.args, "running task callable");
                    let func = func.clone();
                    let args = job.args.clone();
                    let outcome = tokio::task::spawn_blocking(move || func(&args))
                        .await
                        .map_err(|e| {
                            BuildclothError::JobFailed(format!("task '{name}' panicked: {e}"))
                        })?;
                    outcome.map_err(|e| BuildclothError::JobFailed(format!("task '{name}': {e:#}")))
                }
                Action::Shell(cmd) => run_shell(cmd, &job.args).await,
                Action::Sequence(_) => Err(BuildclothError::InvalidJob(
                    "sequence jobs are run by their stage, not by an executor backend".to_string(),
                )),
            }
        })
    }
}
