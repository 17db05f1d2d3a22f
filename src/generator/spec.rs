// src/generator/spec.rs

//! Parsing of declarative job records.
//!
//! A record is a JSON/YAML mapping. Parsing yields a [`SpecRecord`]: where the
//! job goes ([`Placement`]) and what it does ([`SpecBody`]). Shapes:
//!
//! - task job: `job` + `args`
//! - shell job: `dir` + `cmd` + `args`
//! - sequence: `tasks` (a list of task or shell jobs)
//!
//! Placement comes from `target` plus the first of `dep`, `deps`,
//! `dependency`; a `target` without dependencies goes to [`NODEP_STAGE`];
//! otherwise `stage` names the stage, defaulting to [`UNSPECIFIED_STAGE`].

use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::errors::{BuildclothError, Result};
use crate::job::TaskFn;

/// Stage for records with a target but no dependencies.
pub const NODEP_STAGE: &str = "__nodep";

/// Stage for records that name neither a target nor a stage.
pub const UNSPECIFIED_STAGE: &str = "__unspecified";

/// Accepted dependency keys, in lookup order.
pub const DEPENDENCY_KEYS: [&str; 3] = ["dep", "deps", "dependency"];

/// Reference to a task callable.
#[derive(Clone)]
pub enum JobRef {
    /// Looked up in the generator's task registry.
    Named(String),
    /// Used as-is.
    Direct(TaskFn),
}

impl fmt::Debug for JobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            JobRef::Direct(_) => f.write_str("Direct(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SpecBody {
    TaskJob { job: JobRef, args: Value },
    ShellJob { dir: PathBuf, cmd: Vec<String>, args: Vec<String> },
    Sequence { tasks: Vec<SpecBody> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A node of the dependency graph.
    Target { target: String, dependencies: Vec<String> },
    /// A named stage of the catch-all system.
    Stage(String),
}

#[derive(Debug, Clone)]
pub struct SpecRecord {
    pub placement: Placement,
    pub body: SpecBody,
}

impl SpecRecord {
    pub fn new(placement: Placement, body: SpecBody) -> Self {
        Self { placement, body }
    }

    pub fn parse(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            BuildclothError::InvalidJob(format!("job spec must be a mapping, got {value}"))
        })?;

        let placement = parse_placement(obj)?;
        let body = parse_body(obj, true)?;
        Ok(Self { placement, body })
    }
}

fn parse_placement(obj: &Map<String, Value>) -> Result<Placement> {
    if let Some(target) = obj.get("target") {
        let target = expect_str(target, "target")?.to_string();
        return Ok(match dependency_value(obj) {
            Some(deps) => Placement::Target {
                dependencies: parse_dependencies(deps)?,
                target,
            },
            None => {
                info!(target = %target, stage = NODEP_STAGE, "target has no dependencies");
                Placement::Stage(NODEP_STAGE.to_string())
            }
        });
    }

    match obj.get("stage") {
        Some(stage) => Ok(Placement::Stage(expect_str(stage, "stage")?.to_string())),
        None => {
            warn!(stage = UNSPECIFIED_STAGE, "job spec names no stage; please add one");
            Ok(Placement::Stage(UNSPECIFIED_STAGE.to_string()))
        }
    }
}

/// First present dependency key, if any.
pub fn dependency_value(obj: &Map<String, Value>) -> Option<&Value> {
    DEPENDENCY_KEYS.iter().find_map(|key| obj.get(*key))
}

/// A whitespace-separated string or a list of strings.
pub fn parse_dependencies(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| expect_str(item, "dependency").map(str::to_string))
            .collect(),
        other => Err(BuildclothError::InvalidJob(format!(
            "dependencies must be a string or a list of strings, got {other}"
        ))),
    }
}

fn parse_body(obj: &Map<String, Value>, allow_sequence: bool) -> Result<SpecBody> {
    let has = |key: &str| obj.contains_key(key);

    if has("job") && has("args") {
        let job = JobRef::Named(expect_str(&obj["job"], "job")?.to_string());
        let args = obj["args"].clone();
        if !(args.is_array() || args.is_object()) {
            return Err(BuildclothError::InvalidJob(format!(
                "args of job '{}' must be a list or a mapping, got {args}",
                obj["job"]
            )));
        }
        return Ok(SpecBody::TaskJob { job, args });
    }

    if has("dir") && has("cmd") && has("args") {
        return Ok(SpecBody::ShellJob {
            dir: resolve_dir(&obj["dir"])?,
            cmd: words(&obj["cmd"], "cmd")?,
            args: words(&obj["args"], "args")?,
        });
    }

    if allow_sequence && has("tasks") {
        let Value::Array(items) = &obj["tasks"] else {
            return Err(BuildclothError::InvalidJob(
                "`tasks` of a sequence must be a list".to_string(),
            ));
        };
        let tasks = items
            .iter()
            .map(|item| {
                let sub = item.as_object().ok_or_else(|| {
                    BuildclothError::InvalidJob(format!("sequence task must be a mapping, got {item}"))
                })?;
                parse_body(sub, false)
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(SpecBody::Sequence { tasks });
    }

    let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    Err(BuildclothError::InvalidJob(format!(
        "spec with keys [{}] is not {}",
        keys.join(", "),
        if allow_sequence {
            "a task job, shell job or task sequence"
        } else {
            "a task job or shell job"
        }
    )))
}

/// Working directory from a path or a list of path segments. Relative paths
/// are resolved against the current directory.
fn resolve_dir(value: &Value) -> Result<PathBuf> {
    let path: PathBuf = match value {
        Value::String(s) => PathBuf::from(s),
        Value::Array(parts) => parts
            .iter()
            .map(|p| expect_str(p, "dir"))
            .collect::<Result<PathBuf>>()?,
        other => {
            return Err(BuildclothError::InvalidJob(format!(
                "dir must be a path or a list of path segments, got {other}"
            )));
        }
    };

    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// A string split on whitespace, or a list of scalars.
fn words(value: &Value, field: &str) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(s.split_whitespace().map(str::to_string).collect()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                Value::Number(_) | Value::Bool(_) => Ok(item.to_string()),
                other => Err(BuildclothError::InvalidJob(format!(
                    "{field} entries must be scalars, got {other}"
                ))),
            })
            .collect(),
        Value::Null => Ok(Vec::new()),
        other => Err(BuildclothError::InvalidJob(format!(
            "{field} must be a string or a list, got {other}"
        ))),
    }
}

fn expect_str<'a>(value: &'a Value, field: &str) -> Result<&'a str> {
    value.as_str().ok_or_else(|| {
        BuildclothError::InvalidJob(format!("{field} must be a string, got {value}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_with_dependency_keys_becomes_a_node() {
        for key in DEPENDENCY_KEYS {
            let mut spec = json!({"target": "c", "job": "f", "args": []});
            spec[key] = json!("a b");
            let rec = SpecRecord::parse(&spec).unwrap();
            assert_eq!(
                rec.placement,
                Placement::Target {
                    target: "c".into(),
                    dependencies: vec!["a".into(), "b".into()]
                }
            );
        }
    }

    #[test]
    fn dependency_keys_are_looked_up_in_order() {
        let obj = json!({"dependency": "z", "deps": ["y"], "dep": "x"});
        let obj = obj.as_object().unwrap();
        assert_eq!(dependency_value(obj), Some(&json!("x")));
    }

    #[test]
    fn target_without_dependencies_goes_to_nodep() {
        let rec = SpecRecord::parse(&json!({"target": "c", "stage": "s", "job": "f", "args": []})).unwrap();
        assert_eq!(rec.placement, Placement::Stage(NODEP_STAGE.into()));
    }

    #[test]
    fn missing_stage_defaults_to_unspecified() {
        let rec = SpecRecord::parse(&json!({"job": "f", "args": {"x": 1}})).unwrap();
        assert_eq!(rec.placement, Placement::Stage(UNSPECIFIED_STAGE.into()));
        assert!(matches!(rec.body, SpecBody::TaskJob { job: JobRef::Named(ref n), .. } if n == "f"));
    }

    #[test]
    fn shell_job_joins_dir_and_argv() {
        let rec = SpecRecord::parse(&json!({
            "stage": "docs",
            "dir": ["/srv", "docs"],
            "cmd": "make -j4",
            "args": ["html", 2],
        }))
        .unwrap();
        match rec.body {
            SpecBody::ShellJob { dir, cmd, args } => {
                assert_eq!(dir, PathBuf::from("/srv/docs"));
                assert_eq!(cmd, vec!["make", "-j4"]);
                assert_eq!(args, vec!["html", "2"]);
            }
            other => panic!("expected shell job, got {other:?}"),
        }
    }

    #[test]
    fn relative_dir_is_resolved_against_cwd() {
        let rec = SpecRecord::parse(&json!({"stage": "s", "dir": "sub", "cmd": "ls", "args": ""})).unwrap();
        let SpecBody::ShellJob { dir, .. } = rec.body else { panic!("expected shell job") };
        assert_eq!(dir, std::env::current_dir().unwrap().join("sub"));
    }

    #[test]
    fn sequences_hold_only_leaf_jobs() {
        let rec = SpecRecord::parse(&json!({
            "stage": "s",
            "tasks": [
                {"job": "f", "args": []},
                {"dir": "/", "cmd": "true", "args": []},
            ]
        }))
        .unwrap();
        assert!(matches!(rec.body, SpecBody::Sequence { ref tasks } if tasks.len() == 2));

        let nested = json!({"stage": "s", "tasks": [{"tasks": []}]});
        assert!(matches!(
            SpecRecord::parse(&nested).unwrap_err(),
            BuildclothError::InvalidJob(_)
        ));
    }

    #[test]
    fn unrecognised_shapes_are_invalid_jobs() {
        for bad in [
            json!({"stage": "s", "cmd": "ls"}),
            json!({"stage": "s", "job": "f", "args": "x"}),
            json!(["not", "a", "mapping"]),
            json!({"target": "t", "dep": 3, "job": "f", "args": []}),
        ] {
            assert!(matches!(
                SpecRecord::parse(&bad).unwrap_err(),
                BuildclothError::InvalidJob(_)
            ));
        }
    }
}
