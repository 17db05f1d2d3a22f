// src/config/validate.rs

use std::time::Duration;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dependency::DependencyChecker;
use crate::errors::{BuildclothError, Result};
use crate::generator::strings::is_token_name;
use crate::stage::MIN_WORKERS;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = BuildclothError;

    fn try_from(mut raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        if let Some(workers) = raw.config.workers.filter(|w| *w < MIN_WORKERS) {
            debug!(requested = workers, using = MIN_WORKERS, "[config].workers raised to minimum");
            raw.config.workers = Some(MIN_WORKERS);
        }
        let job_timeout = match raw.config.job_timeout.as_deref() {
            Some(s) => Some(parse_duration(s).map_err(|e| {
                BuildclothError::ConfigError(format!("[config].job_timeout: {e}"))
            })?),
            None => None,
        };
        Ok(ConfigFile::new_unchecked(raw.config, raw.strings, job_timeout))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_strings(cfg)?;
    validate_files(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // rebuild and cycles are strongly typed and validated during
    // deserialization; workers below the minimum are raised, not rejected.

    let checker = DependencyChecker::default();
    if !checker.methods().any(|m| m == cfg.config.check_method) {
        return Err(BuildclothError::ConfigError(format!(
            "[config].check_method '{}' is not one of: {}",
            cfg.config.check_method,
            checker.methods().collect::<Vec<_>>().join(", ")
        )));
    }

    Ok(())
}

fn validate_strings(cfg: &RawConfigFile) -> Result<()> {
    for key in cfg.strings.keys() {
        if !is_token_name(key) {
            return Err(BuildclothError::ConfigError(format!(
                "[strings] key '{key}' cannot be used as a {{token}}"
            )));
        }
    }
    Ok(())
}

fn validate_files(cfg: &RawConfigFile) -> Result<()> {
    for file in &cfg.config.files {
        let ext = file.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !matches!(ext, "json" | "yaml" | "yml") {
            return Err(BuildclothError::ConfigError(format!(
                "[config].files entry {} must end in .json, .yaml or .yml",
                file.display()
            )));
        }
    }
    Ok(())
}

/// Parse durations like `"500ms"`, `"30s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    if value == 0 {
        return Err("duration must be greater than zero".to_string());
    }
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
