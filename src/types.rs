use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Canonical stage name type used throughout the crate.
pub type StageName = String;

/// How the jobs of a stage are executed.
///
/// - `Parallel`: jobs are dispatched to a bounded worker pool with no ordering
///   guarantee among them (stage type `"stage"`).
/// - `Sequential`: jobs run one at a time in insertion order (stage type
///   `"seq"` or `"sequence"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Parallel,
    Sequential,
}

impl Default for StageKind {
    fn default() -> Self {
        StageKind::Parallel
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage" | "parallel" => Ok(StageKind::Parallel),
            "seq" | "sequence" | "sequential" => Ok(StageKind::Sequential),
            other => Err(format!(
                "no stage type named \"{other}\" (expected \"stage\", \"seq\" or \"sequence\")"
            )),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Parallel => f.write_str("stage"),
            StageKind::Sequential => f.write_str("sequence"),
        }
    }
}

/// What the topological sort does when targets depend on each other in a cycle.
///
/// - `Warn`: members of a cycle are emitted together (in first-seen order)
///   and a warning is logged (default).
/// - `Reject`: the sort fails with `DependencyCycle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    Warn,
    Reject,
}

impl Default for CyclePolicy {
    fn default() -> Self {
        CyclePolicy::Warn
    }
}

impl FromStr for CyclePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "warn" | "allow" => Ok(CyclePolicy::Warn),
            "reject" | "error" => Ok(CyclePolicy::Reject),
            other => Err(format!(
                "invalid cycles policy: {other} (expected \"warn\" or \"reject\")"
            )),
        }
    }
}

/// Which dependency nodes `Generator::finalize` turns into stages.
///
/// - `Propagate`: a target is rebuilt when its own check reports it stale or
///   when any of its prerequisite targets is rebuilt (default).
/// - `Latch`: once the first stale target is seen in topological order, it
///   and every later target are rebuilt; earlier ones are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebuildPolicy {
    Propagate,
    Latch,
}

impl Default for RebuildPolicy {
    fn default() -> Self {
        RebuildPolicy::Propagate
    }
}

impl FromStr for RebuildPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "propagate" => Ok(RebuildPolicy::Propagate),
            "latch" => Ok(RebuildPolicy::Latch),
            other => Err(format!(
                "invalid rebuild policy: {other} (expected \"propagate\" or \"latch\")"
            )),
        }
    }
}
