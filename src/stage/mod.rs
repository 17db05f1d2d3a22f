// src/stage/mod.rs

//! Stages: batches of jobs with an open/closed lifecycle.
//!
//! A [`Stage`] is either [`StageKind::Parallel`] (jobs dispatched to a bounded
//! worker pool, no ordering among them) or [`StageKind::Sequential`] (jobs
//! run one at a time in append order). Jobs may only be appended while the
//! stage is open; execution lives in [`run`].

pub mod run;

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::errors::{fail_or_false, BuildclothError, Result};
use crate::job::{Action, Job, JobArgs};
use crate::types::StageKind;

/// Smallest worker pool a parallel stage will use.
pub const MIN_WORKERS: usize = 2;

/// Host parallelism, never below [`MIN_WORKERS`].
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_WORKERS)
        .max(MIN_WORKERS)
}

#[derive(Debug, Clone)]
pub struct Stage {
    kind: StageKind,
    jobs: Vec<Job>,
    open: bool,
    workers: usize,
    job_timeout: Option<Duration>,
}

impl Stage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            jobs: Vec::new(),
            open: true,
            workers: default_workers(),
            job_timeout: None,
        }
    }

    pub fn parallel() -> Self {
        Self::new(StageKind::Parallel)
    }

    pub fn sequential() -> Self {
        Self::new(StageKind::Sequential)
    }

    /// New open stage of `kind` holding copies of `other`'s jobs.
    pub fn seeded(kind: StageKind, other: &Stage) -> Self {
        Self {
            jobs: other.jobs.clone(),
            workers: other.workers,
            job_timeout: other.job_timeout,
            ..Self::new(kind)
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Append one job.
    ///
    /// `arguments` must be a JSON array (positional) or object (named).
    /// A closed stage yields `ClosedStage`, bad arguments `InvalidJob`; in
    /// non-strict mode both are logged and reported as `Ok(false)`.
    pub fn add(&mut self, action: Action, arguments: Value, strict: bool) -> Result<bool> {
        if !self.open {
            return fail_or_false(strict, self.closed_error(&action));
        }
        let args = match JobArgs::try_from(arguments) {
            Ok(args) => args,
            Err(err) => return fail_or_false(strict, err),
        };
        self.push(Job::new(action, args));
        Ok(true)
    }

    /// Append an already-built job.
    pub fn add_job(&mut self, job: Job, strict: bool) -> Result<bool> {
        if !self.open {
            return fail_or_false(strict, self.closed_error(&job.action));
        }
        self.push(job);
        Ok(true)
    }

    /// Bulk [`add`](Self::add). `Ok(true)` only if every job was added.
    pub fn extend<I>(&mut self, jobs: I, strict: bool) -> Result<bool>
    where
        I: IntoIterator<Item = (Action, Value)>,
    {
        let mut all = true;
        for (action, arguments) in jobs {
            all &= self.add(action, arguments, strict)?;
        }
        Ok(all)
    }

    /// Add `action` once per entry of `argument_list`.
    pub fn grow<I>(&mut self, action: Action, argument_list: I, strict: bool) -> Result<bool>
    where
        I: IntoIterator<Item = Value>,
    {
        let mut all = true;
        for arguments in argument_list {
            all &= self.add(action.clone(), arguments, strict)?;
        }
        Ok(all)
    }

    fn push(&mut self, job: Job) {
        debug!(kind = %self.kind, job = %job, "job added to stage");
        self.jobs.push(job);
    }

    fn closed_error(&self, action: &Action) -> BuildclothError {
        BuildclothError::ClosedStage(format!(
            "cannot add '{}' to a closed {} of {} jobs",
            action.label(),
            self.kind,
            self.jobs.len()
        ))
    }

    pub fn count(&self) -> usize {
        self.jobs.len()
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Close the stage and return the new open state (always `false`).
    pub fn close(&mut self) -> bool {
        if self.open {
            self.open = false;
            info!(kind = %self.kind, jobs = self.jobs.len(), "stage closed");
        } else {
            debug!(kind = %self.kind, "stage already closed");
        }
        self.open
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_closed(&self) -> bool {
        !self.open
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Requests below [`MIN_WORKERS`] are raised to it.
    pub fn set_workers(&mut self, workers: usize) {
        if workers < MIN_WORKERS {
            debug!(requested = workers, using = MIN_WORKERS, "worker count raised to minimum");
        }
        self.workers = workers.max(MIN_WORKERS);
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout
    }

    pub fn set_job_timeout(&mut self, timeout: Option<Duration>) {
        self.job_timeout = timeout;
    }
}
