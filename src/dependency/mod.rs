// src/dependency/mod.rs

//! Rebuild decisions for targets.
//!
//! - [`strategies`] holds the built-in checks (`force`, `ignore`, `mtime`,
//!   `hash`).
//! - [`hash`] digests file contents for the `hash` check.
//!
//! A [`DependencyChecker`] owns a set of named [`CheckStrategy`]s and one
//! active strategy. Applications may register their own.

pub mod hash;
pub mod strategies;

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{BuildclothError, Result};
use crate::fs::{FileSystem, RealFileSystem};

pub use strategies::{ForceCheck, HashCheck, IgnoreCheck, MtimeCheck};

/// Name of the strategy selected by default when it is registered.
pub const DEFAULT_CHECK_METHOD: &str = "mtime";

/// A named predicate deciding whether `target` must be rebuilt.
pub trait CheckStrategy: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// `true` means "rebuild needed".
    fn needs_rebuild(&self, fs: &dyn FileSystem, target: &Path, deps: &[PathBuf]) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct DependencyChecker {
    fs: Arc<dyn FileSystem>,
    strategies: Vec<Arc<dyn CheckStrategy>>,
    active: usize,
}

impl Default for DependencyChecker {
    fn default() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

impl DependencyChecker {
    /// Checker with the four built-in strategies, `mtime` active.
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        let strategies: Vec<Arc<dyn CheckStrategy>> = vec![
            Arc::new(ForceCheck),
            Arc::new(IgnoreCheck),
            Arc::new(MtimeCheck),
            Arc::new(HashCheck),
        ];
        let active = default_index(&strategies);
        Self {
            fs,
            strategies,
            active,
        }
    }

    /// Checker with an explicit strategy set.
    ///
    /// The active strategy is `mtime` if present, otherwise the first one.
    pub fn with_strategies(
        fs: Arc<dyn FileSystem>,
        strategies: Vec<Arc<dyn CheckStrategy>>,
    ) -> Result<Self> {
        if strategies.is_empty() {
            return Err(BuildclothError::UnknownCheckMethod(
                "no dependency check strategies registered".to_string(),
            ));
        }
        let active = default_index(&strategies);
        Ok(Self {
            fs,
            strategies,
            active,
        })
    }

    /// Add a strategy, replacing any existing one with the same name.
    pub fn register(&mut self, strategy: Arc<dyn CheckStrategy>) {
        match self.position(strategy.name()) {
            Some(idx) => self.strategies[idx] = strategy,
            None => self.strategies.push(strategy),
        }
    }

    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.strategies.iter().map(|s| s.name())
    }

    pub fn check_method(&self) -> &str {
        self.strategies[self.active].name()
    }

    /// Select the active strategy by name.
    ///
    /// Unknown names fail with `UnknownCheckMethod` and leave the current
    /// selection untouched.
    pub fn set_check_method(&mut self, name: &str) -> Result<()> {
        match self.position(name) {
            Some(idx) => {
                self.active = idx;
                info!(method = %name, "dependency check method changed");
                Ok(())
            }
            None => Err(BuildclothError::UnknownCheckMethod(format!(
                "{name} (available: {})",
                self.methods().collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Revert to the default strategy.
    pub fn reset_check_method(&mut self) {
        self.active = default_index(&self.strategies);
    }

    pub fn check<P: AsRef<Path>>(&self, target: impl AsRef<Path>, dependencies: &[P]) -> Result<bool> {
        let target = target.as_ref();
        let deps: Vec<PathBuf> = dependencies.iter().map(|d| d.as_ref().to_path_buf()).collect();
        let strategy = &self.strategies[self.active];

        debug!(method = strategy.name(), target = ?target, deps = ?deps, "running dependency check");
        let rebuild = strategy.needs_rebuild(self.fs.as_ref(), target, &deps)?;
        info!(method = strategy.name(), target = ?target, rebuild, "rebuild check result");

        Ok(rebuild)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.strategies.iter().position(|s| s.name() == name)
    }
}

fn default_index(strategies: &[Arc<dyn CheckStrategy>]) -> usize {
    strategies
        .iter()
        .position(|s| s.name() == DEFAULT_CHECK_METHOD)
        .unwrap_or(0)
}
