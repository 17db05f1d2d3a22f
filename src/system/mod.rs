// src/system/mod.rs

//! An ordered collection of named stages, run one after another.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::errors::{fail_or_false, BuildclothError, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::stage::Stage;
use crate::types::{StageKind, StageName};

/// Stage type used by [`System::new_stage`].
pub const DEFAULT_STAGE_TYPE: &str = "stage";

/// Ordered, named stages plus the backend their jobs run on.
///
/// `order` may name a stage more than once: non-strict re-adds and
/// [`extend`](System::extend) both append to it, and every occurrence runs.
///
/// Being open and being strict are independent. Mutators work on a closed
/// system; only running an open system under strict mode is refused.
pub struct System {
    order: Vec<StageName>,
    stages: HashMap<StageName, Stage>,
    open: bool,
    strict: bool,
    executor: Arc<dyn ExecutorBackend>,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("order", &self.order)
            .field("stages", &self.stages)
            .field("open", &self.open)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl System {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            stages: HashMap::new(),
            open: true,
            strict: true,
            executor: Arc::new(RealExecutorBackend::new()),
        }
    }

    /// Replace the backend used to run leaf jobs.
    pub fn with_executor(mut self, executor: Arc<dyn ExecutorBackend>) -> Self {
        self.executor = executor;
        self
    }

    pub fn set_executor(&mut self, executor: Arc<dyn ExecutorBackend>) {
        self.executor = executor;
    }

    pub fn executor(&self) -> Arc<dyn ExecutorBackend> {
        self.executor.clone()
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Shorthand for `add_stage(name, None, "stage", None)`.
    pub fn new_stage(&mut self, name: impl Into<StageName>) -> Result<bool> {
        self.add_stage(name, None, DEFAULT_STAGE_TYPE, None)
    }

    /// Register a stage under `name`.
    ///
    /// Without `stage`, a fresh one of `stage_type` (`"stage"`, `"seq"` or
    /// `"sequence"`) is created. `strict` overrides the system default.
    ///
    /// Duplicate names:
    /// - strict: always `InvalidSystem`;
    /// - non-strict without `stage`: the name is queued again, so the
    ///   existing stage runs once more;
    /// - non-strict with `stage`: rejected with `Ok(false)`.
    pub fn add_stage(
        &mut self,
        name: impl Into<StageName>,
        stage: Option<Stage>,
        stage_type: &str,
        strict: Option<bool>,
    ) -> Result<bool> {
        let name = name.into();
        let strict = strict.unwrap_or(self.strict);

        if self.stages.contains_key(&name) {
            if strict {
                return Err(BuildclothError::InvalidSystem(format!(
                    "stage '{name}' already exists"
                )));
            }
            if stage.is_some() {
                return fail_or_false(
                    false,
                    BuildclothError::InvalidSystem(format!(
                        "stage '{name}' already exists; refusing to replace it"
                    )),
                );
            }
            debug!(stage = %name, "queueing existing stage again");
            self.order.push(name);
            return Ok(true);
        }

        let stage = match stage {
            Some(stage) => stage,
            None => match stage_type.parse::<StageKind>() {
                Ok(kind) => Stage::new(kind),
                Err(msg) => return fail_or_false(strict, BuildclothError::InvalidStage(msg)),
            },
        };

        if !self.open {
            debug!(stage = %name, "adding stage to a closed system");
        }
        debug!(stage = %name, kind = %stage.kind(), "stage added to system");
        self.stages.insert(name.clone(), stage);
        self.order.push(name);
        Ok(true)
    }

    /// Merge `other` into this system. Incoming stages replace same-named
    /// ones; `other`'s order is appended.
    pub fn extend(&mut self, other: System) {
        for (name, stage) in other.stages {
            if self.stages.insert(name.clone(), stage).is_some() {
                debug!(stage = %name, "extend replaced existing stage");
            }
        }
        debug!(stages = ?other.order, "extending system");
        self.order.extend(other.order);
    }

    pub fn get_order(&self) -> &[StageName] {
        &self.order
    }

    /// Position of the first occurrence of `name` in the run order.
    pub fn get_stage_index(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    pub fn stage_exists(&self, name: &str) -> bool {
        self.stages.contains_key(name)
    }

    pub fn stage(&self, name: &str) -> Option<&Stage> {
        self.stages.get(name)
    }

    pub fn stage_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.stages.get_mut(name)
    }

    /// Number of entries in the run order.
    pub fn count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn close(&mut self) {
        if self.open {
            self.open = false;
            info!(stages = self.order.len(), "system closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_closed(&self) -> bool {
        !self.open
    }

    /// Apply a worker count to every stage.
    pub fn set_workers(&mut self, workers: usize) {
        for stage in self.stages.values_mut() {
            stage.set_workers(workers);
        }
    }

    /// Apply a per-job timeout to every stage.
    pub fn set_job_timeout(&mut self, timeout: Option<Duration>) {
        for stage in self.stages.values_mut() {
            stage.set_job_timeout(timeout);
        }
    }

    /// Run exactly one stage.
    pub async fn run_stage(&self, name: &str, strict: Option<bool>) -> Result<bool> {
        let strict = strict.unwrap_or(self.strict);
        match self.stages.get(name) {
            Some(stage) => {
                info!(stage = %name, "running stage");
                stage.run_with(self.executor.clone(), strict).await
            }
            None => fail_or_false(
                strict,
                BuildclothError::StageRun(format!("no stage named '{name}'")),
            ),
        }
    }

    /// Run the stages at order positions `0..idx`, stopping at the first
    /// stage that does not succeed.
    ///
    /// Stages are not marked as done, so running twice repeats every job.
    pub async fn run_part(&self, idx: usize, strict: Option<bool>) -> Result<bool> {
        let strict = strict.unwrap_or(self.strict);

        if strict && self.open {
            return Err(BuildclothError::InvalidSystem(
                "cannot run a system that is still open".to_string(),
            ));
        }
        if idx > self.order.len() {
            return fail_or_false(
                strict,
                BuildclothError::InvalidSystem(format!(
                    "cannot run {idx} stages of a system with {}",
                    self.order.len()
                )),
            );
        }

        for (pos, name) in self.order[..idx].iter().enumerate() {
            let Some(stage) = self.stages.get(name) else {
                return fail_or_false(
                    strict,
                    BuildclothError::StageRun(format!("stage '{name}' is in the order but not defined")),
                );
            };
            info!(stage = %name, position = pos, "running stage");
            if !stage.run_with(self.executor.clone(), strict).await? {
                warn!(stage = %name, position = pos, "stage failed; stopping run");
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Run every stage in order.
    pub async fn run(&self, strict: Option<bool>) -> Result<bool> {
        self.run_part(self.order.len(), strict).await
    }
}
