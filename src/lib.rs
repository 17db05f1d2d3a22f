// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod dependency;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod generator;
pub mod job;
pub mod logging;
pub mod stage;
pub mod system;
pub mod tasks;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_or_default;
use crate::errors::BuildclothError;
use crate::generator::{Generator, Substitutions};
use crate::system::System;
use crate::tasks::register_builtin_tasks;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (CLI flags override `[config]`)
/// - built-in tasks
/// - spec ingestion and finalize
/// - dry-run listing, or running the whole system / up to a named stage
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(&args.config)?;

    let mut options = cfg.generator_options();
    if let Some(jobs) = args.jobs {
        options.workers = Some(jobs);
    }
    if let Some(check) = &args.check {
        options.check_method = check.clone();
    }

    let mut generator = Generator::with_options(options)?;
    register_builtin_tasks(&mut generator)?;

    let files: Vec<PathBuf> = if args.files.is_empty() {
        cfg.config.files.clone()
    } else {
        args.files.clone()
    };
    if files.is_empty() {
        bail!("no job spec files given; pass --file or set [config].files");
    }

    let strings = (!cfg.strings.is_empty()).then_some(&cfg.strings);
    for file in &files {
        ingest_file(&mut generator, file, strings)?;
    }

    generator.finalize()?;
    let mut system = generator
        .take_system()
        .ok_or_else(|| anyhow!("finalize produced no system"))?;
    system.set_strict(cfg.config.strict && !args.permissive);

    if args.dry_run {
        print_dry_run(&system);
        return Ok(());
    }

    let completed = if args.stages.is_empty() {
        system.run(None).await?
    } else {
        let last = last_stage_index(&system, &args.stages)?;
        info!(stages = ?args.stages, through = %system.get_order()[last], "running part of the system");
        system.run_part(last + 1, None).await?
    };

    if !completed {
        bail!("build stopped before all stages completed");
    }
    info!("build complete");
    Ok(())
}

fn ingest_file(generator: &mut Generator, path: &Path, strings: Option<&Substitutions>) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            generator.ingest_json(path, strings)?;
        }
        Some("yaml") | Some("yml") => {
            generator.ingest_yaml(path, strings)?;
        }
        _ => warn!(path = ?path, "not a .json, .yaml or .yml file; skipping"),
    }
    Ok(())
}

/// Order index of the latest of `names`.
fn last_stage_index(system: &System, names: &[String]) -> Result<usize> {
    let mut last = 0;
    for name in names {
        let idx = system
            .get_stage_index(name)
            .ok_or_else(|| BuildclothError::StageRun(format!("no stage named '{name}'")))?;
        last = last.max(idx);
    }
    Ok(last)
}

/// Print stages and their jobs in run order.
fn print_dry_run(system: &System) {
    println!("buildc dry-run");
    println!("  strict = {}", system.strict());
    println!();

    println!("stages ({}):", system.count());
    for (pos, name) in system.get_order().iter().enumerate() {
        let Some(stage) = system.stage(name) else { continue };
        println!(
            "  {}. {name} [{}, {} job(s), {} workers]",
            pos + 1,
            stage.kind(),
            stage.count(),
            stage.workers()
        );
        for job in stage.jobs() {
            println!("      - {job}");
        }
    }

    debug!("dry-run complete (no execution)");
}
