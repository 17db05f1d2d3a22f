// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use buildcloth::config::{load_and_validate, load_or_default, ConfigFile};
use buildcloth::errors::BuildclothError;
use buildcloth::types::{CyclePolicy, RebuildPolicy};
use buildcloth_test_utils::builders::ConfigFileBuilder;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn full_config_round_trips_into_generator_options() {
    let file = write_config(
        r#"
[config]
workers = 3
strict = false
check_method = "hash"
rebuild = "latch"
cycles = "reject"
job_timeout = "90s"
files = ["build.yaml"]

[strings]
root = "/srv"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert!(!cfg.config.strict);
    assert_eq!(cfg.strings.get("root").map(String::as_str), Some("/srv"));
    assert_eq!(cfg.job_timeout, Some(Duration::from_secs(90)));

    let options = cfg.generator_options();
    assert_eq!(options.workers, Some(3));
    assert_eq!(options.check_method, "hash");
    assert_eq!(options.rebuild, RebuildPolicy::Latch);
    assert_eq!(options.cycles, CyclePolicy::Reject);
}

#[test]
fn empty_file_gives_defaults() {
    let file = write_config("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert!(cfg.config.strict);
    assert_eq!(cfg.config.check_method, "mtime");
    assert_eq!(cfg.config.workers, None);
    assert!(cfg.strings.is_empty());
}

#[test]
fn invalid_values_are_config_errors() {
    for (contents, needle) in [
        ("[config]\ncheck_method = \"sha1\"\n", "check_method"),
        ("[config]\njob_timeout = \"5 days\"\n", "job_timeout"),
        ("[config]\nfiles = [\"build.txt\"]\n", "build.txt"),
        ("[strings]\n\"bad key\" = \"x\"\n", "bad key"),
    ] {
        let file = write_config(contents);
        match load_and_validate(file.path()) {
            Err(BuildclothError::ConfigError(msg)) => {
                assert!(msg.contains(needle), "{msg} should mention {needle}")
            }
            other => panic!("expected ConfigError for {contents:?}, got {other:?}"),
        }
    }
}

#[test]
fn unknown_policy_is_a_toml_error() {
    let file = write_config("[config]\nrebuild = \"sometimes\"\n");
    assert!(matches!(
        load_and_validate(file.path()),
        Err(BuildclothError::TomlError(_))
    ));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = load_or_default("does/not/exist/Buildc.toml").unwrap_err();
    assert!(matches!(err, BuildclothError::ConfigError(_)));
}

#[test]
fn builder_matches_parsed_config() {
    let built: ConfigFile = ConfigFileBuilder::new()
        .workers(4)
        .check_method("force")
        .job_timeout("2m")
        .string("lang", "en")
        .build();
    assert_eq!(built.config.workers, Some(4));
    assert_eq!(built.job_timeout, Some(Duration::from_secs(120)));
    assert_eq!(built.generator_options().check_method, "force");

    let raw = ConfigFileBuilder::new().check_method("sha1").raw();
    assert!(ConfigFile::try_from(raw).is_err());
}

#[test]
fn small_worker_counts_are_raised_like_the_cli_flag() {
    for requested in [0usize, 1] {
        let file = write_config(&format!("[config]\nworkers = {requested}\n"));
        let cfg = load_and_validate(file.path()).unwrap();
        assert_eq!(cfg.config.workers, Some(2));
        assert_eq!(cfg.generator_options().workers, Some(2));
    }
    assert_eq!(ConfigFileBuilder::new().workers(0).build().config.workers, Some(2));
}
