// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::dependency::DEFAULT_CHECK_METHOD;
use crate::generator::{GeneratorOptions, Substitutions};
use crate::types::{CyclePolicy, RebuildPolicy};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// workers = 4
/// strict = true
/// check_method = "hash"
/// rebuild = "propagate"
/// cycles = "reject"
/// job_timeout = "10m"
/// files = ["build.yaml", "docs.json"]
///
/// [strings]
/// root = "/srv/docs"
/// ```
///
/// All sections are optional and have reasonable defaults.
///
/// This is the *raw* form: it has not been validated yet. Use
/// `ConfigFile::try_from(raw)` to get a checked [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// `{token}` substitutions applied to every ingested job spec.
    #[serde(default)]
    pub strings: Substitutions,
}

/// Validated configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub strings: Substitutions,
    /// `config.job_timeout`, parsed.
    pub job_timeout: Option<Duration>,
}

impl ConfigFile {
    /// Build without validation; callers go through `TryFrom<RawConfigFile>`.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        strings: Substitutions,
        job_timeout: Option<Duration>,
    ) -> Self {
        Self {
            config,
            strings,
            job_timeout,
        }
    }

    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            check_method: self.config.check_method.clone(),
            workers: self.config.workers,
            job_timeout: self.job_timeout,
            cycles: self.config.cycles,
            rebuild: self.config.rebuild,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Worker pool size for parallel stages (raised to 2 if lower).
    /// Host parallelism when unset.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Whether running the system fails on the first error (`true`) or
    /// logs it and stops with a non-success result.
    #[serde(default = "default_strict")]
    pub strict: bool,

    /// `"mtime"` (default), `"hash"`, `"force"` or `"ignore"`.
    #[serde(default = "default_check_method")]
    pub check_method: String,

    #[serde(default)]
    pub rebuild: RebuildPolicy,

    #[serde(default)]
    pub cycles: CyclePolicy,

    /// Per-job time limit such as `"30s"` or `"5m"`.
    #[serde(default)]
    pub job_timeout: Option<String>,

    /// Spec files to ingest when none are given on the command line.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

fn default_strict() -> bool {
    true
}

fn default_check_method() -> String {
    DEFAULT_CHECK_METHOD.to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            workers: None,
            strict: default_strict(),
            check_method: default_check_method(),
            rebuild: RebuildPolicy::default(),
            cycles: CyclePolicy::default(),
            job_timeout: None,
            files: Vec::new(),
        }
    }
}
