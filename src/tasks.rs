// src/tasks.rs

//! Built-in tasks available to `buildc` specs.
//!
//! - `echo`: print the arguments.
//! - `touch`: create each named file or bump its modification time.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::time::SystemTime;

use anyhow::{bail, Context};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::Result;
use crate::generator::Generator;
use crate::job::JobArgs;

/// Register every built-in task with `generator`.
pub fn register_builtin_tasks(generator: &mut Generator) -> Result<()> {
    generator.add_task("echo", echo)?;
    generator.add_task("touch", touch)?;
    Ok(())
}

pub fn echo(args: &JobArgs) -> anyhow::Result<()> {
    info!(args = %args, "echo");
    let line = match args {
        JobArgs::Positional(items) => items.iter().map(plain).collect::<Vec<_>>().join(" "),
        JobArgs::Named(_) => args.to_string(),
    };
    println!("{line}");
    Ok(())
}

/// Paths come from positional arguments or a named `path` / `paths` entry.
pub fn touch(args: &JobArgs) -> anyhow::Result<()> {
    let paths: Vec<PathBuf> = match args {
        JobArgs::Positional(items) => items.iter().map(|v| PathBuf::from(plain(v))).collect(),
        JobArgs::Named(map) => match (map.get("path"), map.get("paths")) {
            (Some(p), _) => vec![PathBuf::from(plain(p))],
            (None, Some(Value::Array(items))) => items.iter().map(|v| PathBuf::from(plain(v))).collect(),
            _ => bail!("touch needs a `path` or a `paths` list"),
        },
    };
    if paths.is_empty() {
        bail!("touch needs at least one path");
    }

    for path in paths {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating dir {:?}", parent))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {:?}", path))?;
        file.set_modified(SystemTime::now())
            .with_context(|| format!("updating mtime of {:?}", path))?;
        debug!(path = ?path, "touched");
    }
    Ok(())
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
