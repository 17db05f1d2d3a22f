// src/dependency/strategies.rs

//! Built-in rebuild checks: `force`, `ignore`, `mtime` and `hash`.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::dependency::hash::compute_file_hash;
use crate::dependency::CheckStrategy;
use crate::errors::Result;
use crate::fs::FileSystem;

/// Always rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceCheck;

impl CheckStrategy for ForceCheck {
    fn name(&self) -> &str {
        "force"
    }

    fn needs_rebuild(&self, _fs: &dyn FileSystem, _target: &Path, _deps: &[PathBuf]) -> Result<bool> {
        Ok(true)
    }
}

/// Never rebuild.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreCheck;

impl CheckStrategy for IgnoreCheck {
    fn name(&self) -> &str {
        "ignore"
    }

    fn needs_rebuild(&self, _fs: &dyn FileSystem, _target: &Path, _deps: &[PathBuf]) -> Result<bool> {
        Ok(false)
    }
}

/// Rebuild when the target is missing or any dependency is newer than it.
///
/// A dependency that does not exist yet counts as newer: it is expected to be
/// produced by some other target during this build.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimeCheck;

impl CheckStrategy for MtimeCheck {
    fn name(&self) -> &str {
        "mtime"
    }

    fn needs_rebuild(&self, fs: &dyn FileSystem, target: &Path, deps: &[PathBuf]) -> Result<bool> {
        let Some(target_mtime) = fs.modified(target)? else {
            return Ok(true);
        };

        for dep in deps {
            match fs.modified(dep)? {
                Some(dep_mtime) if dep_mtime > target_mtime => {
                    debug!(target = ?target, dep = ?dep, "dependency is newer than target");
                    return Ok(true);
                }
                Some(_) => {}
                None => {
                    debug!(target = ?target, dep = ?dep, "dependency does not exist yet");
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

/// Rebuild when the target is missing or any dependency's content digest
/// differs from the target's.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashCheck;

impl CheckStrategy for HashCheck {
    fn name(&self) -> &str {
        "hash"
    }

    fn needs_rebuild(&self, fs: &dyn FileSystem, target: &Path, deps: &[PathBuf]) -> Result<bool> {
        if !fs.exists(target) {
            return Ok(true);
        }

        let target_hash = compute_file_hash(fs, target)?;

        for dep in deps {
            if !fs.exists(dep) {
                debug!(target = ?target, dep = ?dep, "dependency does not exist yet");
                return Ok(true);
            }
            if compute_file_hash(fs, dep)? != target_hash {
                debug!(target = ?target, dep = ?dep, "dependency digest differs from target");
                return Ok(true);
            }
        }

        Ok(false)
    }
}
