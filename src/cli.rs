// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `buildc`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildc",
    version,
    about = "Run staged build jobs described in YAML or JSON files.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Buildc.toml` in the current working directory. A missing
    /// default file means "use defaults".
    #[arg(long, value_name = "PATH", default_value = "Buildc.toml")]
    pub config: PathBuf,

    /// Job spec file (`.json`, `.yaml` or `.yml`). Repeatable; replaces
    /// `[config].files`.
    #[arg(short = 'f', long = "file", value_name = "PATH")]
    pub files: Vec<PathBuf>,

    /// Worker pool size for parallel stages.
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Dependency check method (mtime, hash, force, ignore).
    #[arg(long, value_name = "METHOD")]
    pub check: Option<String>,

    /// Log failures and stop instead of returning an error.
    #[arg(long)]
    pub permissive: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Ingest + finalize, print the stages and jobs, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Run the system up to and including the last of these stages.
    #[arg(value_name = "STAGE")]
    pub stages: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_stage_names() {
        let args = CliArgs::try_parse_from([
            "buildc", "-f", "a.yaml", "--file", "b.json", "-j", "3", "--check", "hash",
            "--permissive", "docs", "final",
        ])
        .unwrap();
        assert_eq!(args.files, vec![PathBuf::from("a.yaml"), PathBuf::from("b.json")]);
        assert_eq!(args.jobs, Some(3));
        assert_eq!(args.check.as_deref(), Some("hash"));
        assert!(args.permissive);
        assert_eq!(args.stages, vec!["docs", "final"]);
        assert_eq!(args.config, PathBuf::from("Buildc.toml"));
    }
}
