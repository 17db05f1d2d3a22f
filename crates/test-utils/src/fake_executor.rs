use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use buildcloth::errors::{BuildclothError, Result};
use buildcloth::exec::ExecutorBackend;
use buildcloth::job::{Action, Job};

/// A fake executor that:
/// - records a label for every job it is given (task name or program)
/// - never spawns processes or calls task bodies
/// - fails jobs whose label is in the failure set
/// - optionally sleeps per job and tracks peak concurrency.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_on(self, label: &str) -> Self {
        self.failing.lock().unwrap().insert(label.to_string());
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    /// Highest number of jobs that were running at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

fn label(job: &Job) -> String {
    match &job.action {
        Action::Task { name, .. } => name.clone(),
        Action::Shell(cmd) => cmd.argv().join(" "),
        Action::Sequence(_) => "<sequence>".to_string(),
    }
}

impl ExecutorBackend for FakeExecutor {
    fn execute<'a>(&'a self, job: &'a Job) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let name = label(job);

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.executed.lock().unwrap().push(name.clone());
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.lock().unwrap().contains(&name) {
                return Err(BuildclothError::JobFailed(format!("{name} (fake failure)")));
            }
            Ok(())
        })
    }
}
