use std::sync::{Arc, Mutex};

use buildcloth::job::JobArgs;

/// Shared log that task callables append to, for asserting execution order.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A task body that records `name` and succeeds.
    pub fn task(&self, name: &str) -> impl Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        let name = name.to_string();
        move |_args: &JobArgs| {
            calls.lock().unwrap().push(name.clone());
            Ok(())
        }
    }

    /// A task body that records `name` followed by its arguments.
    pub fn task_with_args(
        &self,
        name: &str,
    ) -> impl Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        let name = name.to_string();
        move |args: &JobArgs| {
            calls.lock().unwrap().push(format!("{name}({args})"));
            Ok(())
        }
    }

    /// A task body that records `name` and then fails.
    pub fn failing(&self, name: &str) -> impl Fn(&JobArgs) -> anyhow::Result<()> + Send + Sync + 'static {
        let calls = Arc::clone(&self.calls);
        let name = name.to_string();
        move |_args: &JobArgs| {
            calls.lock().unwrap().push(name.clone());
            anyhow::bail!("{name} failed on purpose")
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }
}
