// src/exec/mod.rs

//! Leaf job execution.
//!
//! - [`backend`] provides the `ExecutorBackend` trait and the production
//!   `RealExecutorBackend`; tests replace it with a fake implementation.
//! - [`command`] runs shell jobs with `tokio::process::Command`.

pub mod backend;
pub mod command;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use command::run_shell;
