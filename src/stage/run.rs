// src/stage/run.rs

//! Stage execution.
//!
//! - Parallel: at most `workers` jobs in flight (semaphore + `JoinSet`).
//!   Every dispatched job runs to completion; if any failed, the error of the
//!   earliest-added failing job is reported.
//! - Sequential: append order, stops at the first failure.
//!
//! Both kinds apply the stage's per-job timeout, if any.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{fail_or_false, BuildclothError, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::job::{Action, Job};
use crate::stage::Stage;
use crate::types::StageKind;

impl Stage {
    /// Run every job with the production executor.
    pub async fn run(&self, strict: bool) -> Result<bool> {
        self.run_with(Arc::new(RealExecutorBackend::new()), strict).await
    }

    /// Run every job through `executor`.
    ///
    /// `Ok(true)` when all jobs succeeded. A failed job is returned as an
    /// error in strict mode and logged as `Ok(false)` otherwise.
    pub async fn run_with(&self, executor: Arc<dyn ExecutorBackend>, strict: bool) -> Result<bool> {
        if self.is_open() {
            debug!(kind = %self.kind(), "running a stage that is still open");
        }
        info!(kind = %self.kind(), jobs = self.count(), "running stage");

        let outcome = match self.kind() {
            StageKind::Parallel => self.run_parallel(executor).await,
            StageKind::Sequential => self.run_sequential(executor).await,
        };

        match outcome {
            Ok(()) => Ok(true),
            Err(err) => fail_or_false(strict, err),
        }
    }

    async fn run_parallel(&self, executor: Arc<dyn ExecutorBackend>) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.workers()));
        let mut set = JoinSet::new();

        for (idx, job) in self.jobs().iter().enumerate() {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(anyhow::Error::from)?;
            let executor = executor.clone();
            let job = job.clone();
            let timeout = self.job_timeout();
            set.spawn(async move {
                let _permit = permit;
                (idx, run_job(executor, job, timeout).await)
            });
        }

        let mut failed = 0usize;
        let mut first: Option<(usize, BuildclothError)> = None;
        while let Some(joined) = set.join_next().await {
            let (idx, result) = match joined {
                Ok(pair) => pair,
                Err(e) => (
                    usize::MAX,
                    Err(BuildclothError::JobFailed(format!("job panicked: {e}"))),
                ),
            };
            if let Err(err) = result {
                failed += 1;
                error!(job = idx, error = %err, "parallel job failed");
                if first.as_ref().is_none_or(|(i, _)| idx < *i) {
                    first = Some((idx, err));
                }
            }
        }

        match first {
            None => Ok(()),
            Some((_, err)) => {
                warn!(failed, total = self.count(), "parallel stage finished with failures");
                Err(err)
            }
        }
    }

    async fn run_sequential(&self, executor: Arc<dyn ExecutorBackend>) -> Result<()> {
        for (idx, job) in self.jobs().iter().enumerate() {
            if let Err(err) = run_job(executor.clone(), job.clone(), self.job_timeout()).await {
                error!(job = idx, error = %err, "sequential job failed; skipping the rest");
                return Err(err);
            }
        }
        Ok(())
    }
}

/// Run one job, unrolling nested sequences, bounded by `timeout`.
///
/// Boxed because nested sequences make this recursive.
fn run_job(
    executor: Arc<dyn ExecutorBackend>,
    job: Job,
    timeout: Option<Duration>,
) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
    Box::pin(async move {
        debug!(job = %job, "starting job");
        let work = async {
            match &job.action {
                Action::Sequence(stage) => match stage.run_with(executor.clone(), true).await {
                    Ok(true) => Ok(()),
                    Ok(false) => Err(BuildclothError::JobFailed(format!("{job}"))),
                    Err(err) => Err(err),
                },
                _ => executor.execute(&job).await,
            }
        };

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(result) => result,
                Err(_) => {
                    warn!(job = %job, ?limit, "job timed out");
                    Err(BuildclothError::JobTimeout(limit))
                }
            },
            None => work.await,
        }
    })
}
