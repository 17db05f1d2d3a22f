#![allow(dead_code)]

use std::sync::Arc;

use buildcloth::fs::mock::MockFileSystem;
use buildcloth::generator::{Generator, GeneratorOptions};
use buildcloth_test_utils::fake_executor::FakeExecutor;
use buildcloth_test_utils::recorder::Recorder;

/// Generator over an in-memory filesystem whose final system runs on `executor`.
pub fn generator_with(
    fs: &MockFileSystem,
    options: GeneratorOptions,
    executor: &FakeExecutor,
) -> Generator {
    Generator::with_filesystem(Arc::new(fs.clone()), options)
        .expect("valid generator options")
        .with_executor(Arc::new(executor.clone()))
}

/// Options with the given check method and everything else default.
pub fn options_with_check(method: &str) -> GeneratorOptions {
    GeneratorOptions {
        check_method: method.to_string(),
        ..GeneratorOptions::default()
    }
}

/// Register recording tasks for each of `names`.
pub fn register_recording_tasks(generator: &mut Generator, recorder: &Recorder, names: &[&str]) {
    for name in names {
        generator
            .add_task(*name, recorder.task(name))
            .expect("task names are non-empty");
    }
}
