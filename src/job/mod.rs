// src/job/mod.rs

//! Jobs: an action plus the arguments it is invoked with.
//!
//! An [`Action`] is always invocable by construction. Arguments are either a
//! positional list or a named mapping of JSON values; any other JSON shape is
//! rejected when the job is built.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::errors::{BuildclothError, Result};
use crate::stage::Stage;

/// A registered task body.
pub type TaskFn = Arc<dyn Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync>;

/// Arguments passed to an action.
#[derive(Debug, Clone, PartialEq)]
pub enum JobArgs {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Default for JobArgs {
    fn default() -> Self {
        JobArgs::Positional(Vec::new())
    }
}

impl JobArgs {
    pub fn is_empty(&self) -> bool {
        match self {
            JobArgs::Positional(v) => v.is_empty(),
            JobArgs::Named(m) => m.is_empty(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            JobArgs::Positional(v) => v.len(),
            JobArgs::Named(m) => m.len(),
        }
    }

    /// Positional arguments, or an empty slice for named arguments.
    pub fn positional(&self) -> &[Value] {
        match self {
            JobArgs::Positional(v) => v,
            JobArgs::Named(_) => &[],
        }
    }

    /// Named argument lookup; always `None` for positional arguments.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            JobArgs::Positional(_) => None,
            JobArgs::Named(m) => m.get(key),
        }
    }
}

impl TryFrom<Value> for JobArgs {
    type Error = BuildclothError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(JobArgs::Positional(items)),
            Value::Object(map) => Ok(JobArgs::Named(map)),
            other => Err(BuildclothError::InvalidJob(format!(
                "arguments must be a list or a mapping, got {other}"
            ))),
        }
    }
}

impl fmt::Display for JobArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobArgs::Positional(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_string).collect();
                write!(f, "{}", parts.join(", "))
            }
            JobArgs::Named(map) => {
                let parts: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{}", parts.join(", "))
            }
        }
    }
}

/// A process invocation: full argument vector plus working directory.
///
/// `argv` is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    argv: Vec<String>,
    dir: PathBuf,
}

impl ShellCommand {
    pub fn new(argv: Vec<String>, dir: impl Into<PathBuf>) -> Result<Self> {
        if argv.is_empty() {
            return Err(BuildclothError::InvalidJob(
                "shell command has no program to run".to_string(),
            ));
        }
        Ok(Self {
            argv,
            dir: dir.into(),
        })
    }

    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (in {})", self.argv.join(" "), self.dir.display())
    }
}

/// What a job does when it runs.
#[derive(Clone)]
pub enum Action {
    /// A callable from the task registry.
    Task { name: String, func: TaskFn },
    /// An external process.
    Shell(ShellCommand),
    /// A closed sequential stage run as one unit.
    Sequence(Arc<Stage>),
}

impl Action {
    pub fn task<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Action::Task {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn shell(argv: Vec<String>, dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Action::Shell(ShellCommand::new(argv, dir)?))
    }

    /// Short label used in logs.
    pub fn label(&self) -> String {
        match self {
            Action::Task { name, .. } => name.clone(),
            Action::Shell(cmd) => cmd.program().to_string(),
            Action::Sequence(stage) => format!("sequence[{}]", stage.count()),
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Task { name, .. } => f.debug_struct("Task").field("name", name).finish(),
            Action::Shell(cmd) => f.debug_tuple("Shell").field(cmd).finish(),
            Action::Sequence(stage) => f.debug_tuple("Sequence").field(stage).finish(),
        }
    }
}

/// One unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    pub action: Action,
    pub args: JobArgs,
}

impl Job {
    pub fn new(action: Action, args: JobArgs) -> Self {
        Self { action, args }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Action::Task { name, .. } => write!(f, "{name}({})", self.args),
            Action::Shell(cmd) if self.args.is_empty() => write!(f, "{cmd}"),
            Action::Shell(cmd) => write!(f, "{cmd} [{}]", self.args),
            Action::Sequence(stage) => {
                let inner: Vec<String> = stage.jobs().iter().map(|j| j.to_string()).collect();
                write!(f, "sequence({})", inner.join("; "))
            }
        }
    }
}
