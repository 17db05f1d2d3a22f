// src/generator/mod.rs

//! Turns declarative job records into one runnable [`System`].
//!
//! - [`spec`] parses records into placement + body.
//! - [`strings`] applies `{token}` substitutions before parsing.
//! - [`ingest`] reads records from YAML and JSON files.
//!
//! Records with a target and dependencies become nodes of a dependency
//! graph; everything else lands in a named stage of a catch-all system.
//! [`Generator::finalize`] orders the graph, keeps the targets that need a
//! rebuild, appends the catch-all stages and closes the result.

pub mod ingest;
pub mod spec;
pub mod strings;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::dag::{sorted_components, DependencyGraph};
use crate::dependency::{DependencyChecker, DEFAULT_CHECK_METHOD};
use crate::errors::{BuildclothError, Result};
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::fs::{FileSystem, RealFileSystem};
use crate::job::{Action, Job, JobArgs, TaskFn};
use crate::stage::Stage;
use crate::system::System;
use crate::types::{CyclePolicy, RebuildPolicy};

pub use spec::{JobRef, Placement, SpecBody, SpecRecord, NODEP_STAGE, UNSPECIFIED_STAGE};
pub use strings::Substitutions;

/// Settings a generator applies while building and finalizing.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    pub check_method: String,
    /// Worker count for every stage of the final system; host default if unset.
    pub workers: Option<usize>,
    pub job_timeout: Option<Duration>,
    pub cycles: CyclePolicy,
    pub rebuild: RebuildPolicy,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            check_method: DEFAULT_CHECK_METHOD.to_string(),
            workers: None,
            job_timeout: None,
            cycles: CyclePolicy::default(),
            rebuild: RebuildPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
struct DependencyNode {
    job: Job,
    needs_rebuild: bool,
}

pub struct Generator {
    funcs: HashMap<String, TaskFn>,
    stages: System,
    graph: DependencyGraph,
    nodes: HashMap<String, DependencyNode>,
    checker: DependencyChecker,
    fs: Arc<dyn FileSystem>,
    options: GeneratorOptions,
    executor: Arc<dyn ExecutorBackend>,
    system: Option<System>,
    finalized: bool,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tasks: Vec<&String> = self.funcs.keys().collect();
        tasks.sort();
        f.debug_struct("Generator")
            .field("tasks", &tasks)
            .field("stages", &self.stages)
            .field("graph", &self.graph)
            .field("checker", &self.checker)
            .field("options", &self.options)
            .field("finalized", &self.finalized)
            .finish_non_exhaustive()
    }
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    pub fn new() -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Self::build(fs, GeneratorOptions::default())
    }

    /// Generator reading the real filesystem. Fails on an unknown check method.
    pub fn with_options(options: GeneratorOptions) -> Result<Self> {
        Self::with_filesystem(Arc::new(RealFileSystem), options)
    }

    /// Generator whose dependency checks and ingestion go through `fs`.
    pub fn with_filesystem(fs: Arc<dyn FileSystem>, options: GeneratorOptions) -> Result<Self> {
        let mut generator = Self::build(fs, options);
        let method = generator.options.check_method.clone();
        generator.checker.set_check_method(&method)?;
        Ok(generator)
    }

    fn build(fs: Arc<dyn FileSystem>, options: GeneratorOptions) -> Self {
        Self {
            funcs: HashMap::new(),
            stages: System::new(),
            graph: DependencyGraph::new(),
            nodes: HashMap::new(),
            checker: DependencyChecker::new(fs.clone()),
            fs,
            options,
            executor: Arc::new(RealExecutorBackend::new()),
            system: None,
            finalized: false,
        }
    }

    /// Backend the final system runs leaf jobs on.
    pub fn with_executor(mut self, executor: Arc<dyn ExecutorBackend>) -> Self {
        self.executor = executor;
        self
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn checker(&self) -> &DependencyChecker {
        &self.checker
    }

    pub fn checker_mut(&mut self) -> &mut DependencyChecker {
        &mut self.checker
    }

    pub(crate) fn filesystem(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }

    /// Register a named task callable.
    pub fn add_task<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_task_fn(name, Arc::new(func))
    }

    pub fn add_task_fn(&mut self, name: impl Into<String>, func: TaskFn) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BuildclothError::InvalidJob(
                "task names must not be empty".to_string(),
            ));
        }
        if self.funcs.insert(name.clone(), func).is_some() {
            debug!(task = %name, "task replaced in registry");
        } else {
            debug!(task = %name, "task registered");
        }
        Ok(())
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Substitute, parse and place one raw record.
    pub fn add_spec(&mut self, record: Value, strings: Option<&Substitutions>) -> Result<()> {
        let record = match strings {
            Some(table) => strings::substitute(record, table)?,
            None => record,
        };
        let spec = SpecRecord::parse(&record)?;
        self.add_record(spec)
    }

    /// Place an already-parsed record.
    pub fn add_record(&mut self, spec: SpecRecord) -> Result<()> {
        if self.finalized {
            return Err(BuildclothError::InvalidSystem(
                "cannot add jobs to a finalized generator".to_string(),
            ));
        }

        let job = self.build_job(spec.body)?;
        match spec.placement {
            Placement::Target {
                target,
                dependencies,
            } => self.add_dependency(target, dependencies, job),
            Placement::Stage(name) => self.add_to_stage(name, job),
        }
    }

    fn add_dependency(&mut self, target: String, dependencies: Vec<String>, job: Job) -> Result<()> {
        let needs_rebuild = self.checker.check(&target, dependencies.as_slice())?;
        if needs_rebuild {
            info!(target = %target, deps = ?dependencies, "target is stale");
        } else {
            info!(target = %target, "target is up to date");
        }

        if self.nodes.contains_key(&target) {
            warn!(target = %target, "target declared twice; keeping the later job");
        }
        self.graph.add_node(target.clone(), dependencies);
        self.nodes.insert(target, DependencyNode { job, needs_rebuild });
        Ok(())
    }

    fn add_to_stage(&mut self, name: String, job: Job) -> Result<()> {
        if !self.stages.stage_exists(&name) {
            self.stages.add_stage(name.clone(), None, "stage", Some(true))?;
        }
        let stage = self.stages.stage_mut(&name).ok_or_else(|| {
            BuildclothError::InvalidSystem(format!("stage '{name}' vanished from the catch-all system"))
        })?;
        stage.add_job(job, true)?;
        debug!(stage = %name, "job added to catch-all stage");
        Ok(())
    }

    fn build_job(&self, body: SpecBody) -> Result<Job> {
        match body {
            SpecBody::TaskJob { job, args } => {
                let action = match job {
                    JobRef::Named(name) => {
                        let func = self.funcs.get(&name).cloned().ok_or_else(|| {
                            BuildclothError::InvalidJob(format!("no task named '{name}' is registered"))
                        })?;
                        Action::Task { name, func }
                    }
                    JobRef::Direct(func) => Action::Task {
                        name: "<direct>".to_string(),
                        func,
                    },
                };
                Ok(Job::new(action, JobArgs::try_from(args)?))
            }
            SpecBody::ShellJob { dir, mut cmd, args } => {
                cmd.extend(args);
                Ok(Job::new(Action::shell(cmd, dir)?, JobArgs::default()))
            }
            SpecBody::Sequence { tasks } => {
                let mut sequence = Stage::sequential();
                for task in tasks {
                    if matches!(task, SpecBody::Sequence { .. }) {
                        return Err(BuildclothError::InvalidJob(
                            "sequences cannot contain sequences".to_string(),
                        ));
                    }
                    sequence.add_job(self.build_job(task)?, true)?;
                }
                sequence.close();
                Ok(Job::new(Action::Sequence(Arc::new(sequence)), JobArgs::default()))
            }
        }
    }

    /// Number of dependency targets recorded so far.
    pub fn target_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `target` was recorded as needing a rebuild.
    pub fn needs_rebuild(&self, target: &str) -> Option<bool> {
        self.nodes.get(target).map(|n| n.needs_rebuild)
    }

    /// Build the final, closed system. Can only succeed once.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(BuildclothError::InvalidSystem(
                "generator has already been finalized".to_string(),
            ));
        }
        self.finalized = true;

        let catch_all = std::mem::take(&mut self.stages);

        let mut system = if self.nodes.is_empty() {
            if catch_all.is_empty() {
                return Err(BuildclothError::InvalidSystem(
                    "nothing to build: no targets and no stages".to_string(),
                ));
            }
            debug!("no dependency targets; using catch-all stages as the system");
            catch_all
        } else {
            let mut system = self.dependency_system()?;
            if !catch_all.is_empty() {
                system.extend(catch_all);
            }
            system
        };

        if let Some(workers) = self.options.workers {
            system.set_workers(workers);
        }
        if self.options.job_timeout.is_some() {
            system.set_job_timeout(self.options.job_timeout);
        }
        system.set_executor(self.executor.clone());
        system.close();

        info!(stages = system.count(), order = ?system.get_order(), "generator finalized");
        self.system = Some(system);
        Ok(())
    }

    /// One single-job sequential stage per rebuilt target, in build order.
    fn dependency_system(&self) -> Result<System> {
        let components = sorted_components(&self.graph, self.options.cycles)?;
        let rebuild = self.rebuild_set(&components);

        let mut system = System::new();
        for target in components.iter().flatten().filter(|t| rebuild.contains(t.as_str())) {
            let Some(node) = self.nodes.get(target) else { continue };
            let mut stage = Stage::sequential();
            stage.add_job(node.job.clone(), true)?;
            stage.close();
            system.add_stage(target.clone(), Some(stage), "seq", Some(true))?;
            debug!(target = %target, "target queued for rebuild");
        }
        Ok(system)
    }

    /// Decided per component, so members of a cycle rebuild together.
    fn rebuild_set<'a>(&self, components: &'a [Vec<String>]) -> HashSet<&'a str> {
        let mut rebuild = HashSet::new();
        let mut latched = false;

        for members in components {
            // Undeclared prerequisites (plain files) have no job.
            let targets: Vec<&'a String> = members
                .iter()
                .filter(|t| self.nodes.contains_key(t.as_str()))
                .collect();
            if targets.is_empty() {
                continue;
            }

            let stale = targets.iter().any(|t| self.nodes[t.as_str()].needs_rebuild);
            let selected = match self.options.rebuild {
                RebuildPolicy::Propagate => {
                    stale
                        || targets.iter().any(|t| {
                            self.graph
                                .dependencies_of(t)
                                .iter()
                                .any(|dep| rebuild.contains(dep.as_str()))
                        })
                }
                RebuildPolicy::Latch => {
                    latched |= stale;
                    latched
                }
            };

            if selected {
                rebuild.extend(targets.iter().copied().map(String::as_str));
            } else {
                debug!(targets = ?targets, "skipping up-to-date targets");
            }
        }
        rebuild
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// The final system, once [`finalize`](Self::finalize) has succeeded.
    pub fn system(&self) -> Option<&System> {
        self.system.as_ref()
    }

    pub fn system_mut(&mut self) -> Option<&mut System> {
        self.system.as_mut()
    }

    pub fn take_system(&mut self) -> Option<System> {
        self.system.take()
    }

    /// Run the final system.
    pub async fn run(&self, strict: Option<bool>) -> Result<bool> {
        match &self.system {
            Some(system) => system.run(strict).await,
            None => Err(BuildclothError::InvalidSystem(
                "generator must be finalized before running".to_string(),
            )),
        }
    }
}
