#![allow(dead_code)]

use std::path::PathBuf;

use buildcloth::config::{ConfigFile, RawConfigFile};
use buildcloth::types::{CyclePolicy, RebuildPolicy};
use serde_json::{json, Map, Value};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.config.workers = Some(n);
        self
    }

    pub fn strict(mut self, val: bool) -> Self {
        self.config.config.strict = val;
        self
    }

    pub fn check_method(mut self, method: &str) -> Self {
        self.config.config.check_method = method.to_string();
        self
    }

    pub fn rebuild(mut self, policy: RebuildPolicy) -> Self {
        self.config.config.rebuild = policy;
        self
    }

    pub fn cycles(mut self, policy: CyclePolicy) -> Self {
        self.config.config.cycles = policy;
        self
    }

    pub fn job_timeout(mut self, duration: &str) -> Self {
        self.config.config.job_timeout = Some(duration.to_string());
        self
    }

    pub fn file(mut self, path: &str) -> Self {
        self.config.config.files.push(PathBuf::from(path));
        self
    }

    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.config.strings.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for job spec records as they would appear in a YAML/JSON file.
#[derive(Debug, Clone, Default)]
pub struct SpecBuilder {
    record: Map<String, Value>,
}

impl SpecBuilder {
    /// Task job: `{job, args: []}`.
    pub fn task(name: &str) -> Self {
        let mut record = Map::new();
        record.insert("job".into(), json!(name));
        record.insert("args".into(), json!([]));
        Self { record }
    }

    /// Shell job: `{dir, cmd, args: []}`.
    pub fn shell(dir: &str, cmd: &str) -> Self {
        let mut record = Map::new();
        record.insert("dir".into(), json!(dir));
        record.insert("cmd".into(), json!(cmd));
        record.insert("args".into(), json!([]));
        Self { record }
    }

    /// Sequence of the given sub-specs.
    pub fn sequence(tasks: Vec<SpecBuilder>) -> Self {
        let mut record = Map::new();
        let tasks: Vec<Value> = tasks.into_iter().map(SpecBuilder::build).collect();
        record.insert("tasks".into(), Value::Array(tasks));
        Self { record }
    }

    pub fn args(mut self, args: Value) -> Self {
        self.record.insert("args".into(), args);
        self
    }

    pub fn stage(mut self, stage: &str) -> Self {
        self.record.insert("stage".into(), json!(stage));
        self
    }

    pub fn target(mut self, target: &str) -> Self {
        self.record.insert("target".into(), json!(target));
        self
    }

    /// Dependencies under the `dep` key.
    pub fn dep(self, deps: &str) -> Self {
        self.dep_key("dep", json!(deps))
    }

    pub fn dep_key(mut self, key: &str, deps: Value) -> Self {
        self.record.insert(key.into(), deps);
        self
    }

    pub fn build(self) -> Value {
        Value::Object(self.record)
    }
}
