// tests/generator_finalize.rs

mod common;

use std::sync::Arc;

use serde_json::json;

use buildcloth::errors::BuildclothError;
use buildcloth::fs::mock::MockFileSystem;
use buildcloth::generator::{
    Generator, GeneratorOptions, JobRef, Placement, SpecBody, SpecRecord, Substitutions, NODEP_STAGE,
    UNSPECIFIED_STAGE,
};
use buildcloth::job::TaskFn;
use buildcloth::types::{CyclePolicy, RebuildPolicy, StageKind};
use buildcloth_test_utils::builders::SpecBuilder;
use buildcloth_test_utils::fake_executor::FakeExecutor;
use buildcloth_test_utils::init_tracing;
use buildcloth_test_utils::recorder::Recorder;

use common::{generator_with, options_with_check};

/// Files for a chain `src.txt -> a -> b -> c` where only `b` is stale
/// (its prerequisite `a` was written after it).
fn chain_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("src.txt", "source");
    fs.add_file("b", "old b");
    fs.add_file("a", "a");
    fs.add_file("c", "c");
    fs
}

fn chain_specs() -> Vec<serde_json::Value> {
    vec![
        SpecBuilder::task("make_a").target("a").dep("src.txt").build(),
        SpecBuilder::task("make_b").target("b").dep("a").build(),
        SpecBuilder::task("make_c").target("c").dep("b").build(),
    ]
}

fn with_tasks(generator: &mut Generator) {
    for name in ["make_a", "make_b", "make_c", "f", "h"] {
        generator.add_task(name, |_| Ok(())).unwrap();
    }
}

#[test]
fn propagate_rebuilds_stale_targets_and_their_dependents() {
    init_tracing();
    let fs = chain_fs();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);
    for spec in chain_specs() {
        g.add_spec(spec, None).unwrap();
    }

    assert_eq!(g.needs_rebuild("a"), Some(false));
    assert_eq!(g.needs_rebuild("b"), Some(true));
    assert_eq!(g.needs_rebuild("c"), Some(false));

    g.finalize().unwrap();
    assert_eq!(g.system().unwrap().get_order(), ["b", "c"].map(String::from));
}

#[test]
fn latch_rebuilds_everything_after_first_stale_target() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src.txt", "source");
    fs.add_file("x", "x");
    fs.add_file("a", "a");
    fs.add_file("b", "b");
    fs.add_file("y", "y");

    let options = GeneratorOptions {
        rebuild: RebuildPolicy::Latch,
        ..GeneratorOptions::default()
    };
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, options, &exec);
    with_tasks(&mut g);

    // a is fresh, b is stale, y is fresh and independent of b.
    g.add_spec(SpecBuilder::task("f").target("a").dep("src.txt").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("b").dep("generated").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("y").dep("x").build(), None).unwrap();
    assert_eq!(g.needs_rebuild("y"), Some(false));

    g.finalize().unwrap();
    assert_eq!(g.system().unwrap().get_order(), ["b", "y"].map(String::from));
}

#[test]
fn propagate_skips_fresh_independent_targets() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src.txt", "source");
    fs.add_file("x", "x");
    fs.add_file("a", "a");
    fs.add_file("y", "y");

    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);
    g.add_spec(SpecBuilder::task("f").target("a").dep("src.txt").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("b").dep("generated").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("y").dep("x").build(), None).unwrap();

    g.finalize().unwrap();
    assert_eq!(g.system().unwrap().get_order(), ["b".to_string()]);
}

#[test]
fn every_target_stage_is_a_closed_single_job_sequence() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, options_with_check("force"), &exec);
    with_tasks(&mut g);
    for spec in chain_specs() {
        g.add_spec(spec, None).unwrap();
    }
    g.finalize().unwrap();

    let system = g.system().unwrap();
    assert!(system.is_closed());
    for name in system.get_order() {
        let stage = system.stage(name).unwrap();
        assert_eq!(stage.kind(), StageKind::Sequential);
        assert_eq!(stage.count(), 1);
        assert!(stage.is_closed());
    }
}

#[test]
fn without_targets_the_catch_all_stages_become_the_system() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);

    g.add_spec(SpecBuilder::task("h").stage("docs").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("h").target("t").build(), None).unwrap();
    g.add_spec(json!({"job": "h", "args": []}), None).unwrap();
    g.add_spec(SpecBuilder::task("h").stage("docs").args(json!({"k": 1})).build(), None).unwrap();

    g.finalize().unwrap();
    let system = g.system().unwrap();
    assert_eq!(
        system.get_order(),
        ["docs", NODEP_STAGE, UNSPECIFIED_STAGE].map(String::from)
    );
    assert_eq!(system.stage("docs").unwrap().count(), 2);
    assert_eq!(system.stage("docs").unwrap().kind(), StageKind::Parallel);
}

#[test]
fn empty_generator_cannot_finalize() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    assert!(matches!(g.finalize().unwrap_err(), BuildclothError::InvalidSystem(_)));
}

#[test]
fn finalize_is_one_shot() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);
    g.add_spec(SpecBuilder::task("h").stage("s").build(), None).unwrap();

    g.finalize().unwrap();
    assert!(matches!(g.finalize().unwrap_err(), BuildclothError::InvalidSystem(_)));
    assert!(matches!(
        g.add_spec(SpecBuilder::task("h").stage("s").build(), None).unwrap_err(),
        BuildclothError::InvalidSystem(_)
    ));
}

#[test]
fn cycles_are_rejected_when_configured() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let options = GeneratorOptions {
        cycles: CyclePolicy::Reject,
        check_method: "force".to_string(),
        ..GeneratorOptions::default()
    };
    let mut g = generator_with(&fs, options, &exec);
    with_tasks(&mut g);
    g.add_spec(SpecBuilder::task("f").target("a").dep("b").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("b").dep("a").build(), None).unwrap();

    assert!(matches!(g.finalize().unwrap_err(), BuildclothError::DependencyCycle(_)));
}

#[test]
fn cycles_are_tolerated_by_default() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, options_with_check("force"), &exec);
    with_tasks(&mut g);
    g.add_spec(SpecBuilder::task("f").target("a").dep("b").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("b").dep("a").build(), None).unwrap();

    g.finalize().unwrap();
    let mut order = g.system().unwrap().get_order().to_vec();
    order.sort();
    assert_eq!(order, vec!["a", "b"]);
}

#[test]
fn stale_cycle_member_rebuilds_the_whole_cycle_and_its_dependents() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("b", "b");
    fs.add_file("src.txt", "source");
    fs.add_file("a", "a");
    fs.add_file("c", "c");

    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);
    g.add_spec(SpecBuilder::task("f").target("a").dep("b").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("f").target("b").dep("a src.txt").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("h").target("c").dep("a").build(), None).unwrap();

    // Only b is stale on its own; a sits in its cycle and c depends on a.
    assert_eq!(g.needs_rebuild("a"), Some(false));
    assert_eq!(g.needs_rebuild("b"), Some(true));
    assert_eq!(g.needs_rebuild("c"), Some(false));

    g.finalize().unwrap();
    assert_eq!(g.system().unwrap().get_order(), ["a", "b", "c"].map(String::from));
}

#[tokio::test]
async fn direct_task_reference_runs_without_registration() {
    init_tracing();
    let fs = MockFileSystem::new();
    let recorder = Recorder::new();
    let mut g = Generator::with_filesystem(Arc::new(fs), GeneratorOptions::default()).unwrap();

    let func: TaskFn = Arc::new(recorder.task_with_args("direct"));
    g.add_record(SpecRecord::new(
        Placement::Stage("inline".to_string()),
        SpecBody::TaskJob {
            job: JobRef::Direct(func),
            args: json!(["x"]),
        },
    ))
    .unwrap();
    assert!(!g.has_task("direct"));

    g.finalize().unwrap();
    assert!(g.run(None).await.unwrap());
    assert_eq!(recorder.calls(), vec![r#"direct("x")"#]);
}

#[tokio::test]
async fn direct_task_reference_inside_a_sequence() {
    let fs = MockFileSystem::new();
    let recorder = Recorder::new();
    let mut g = Generator::with_filesystem(Arc::new(fs), GeneratorOptions::default()).unwrap();
    g.add_task("named", recorder.task("named")).unwrap();

    let func: TaskFn = Arc::new(recorder.task("direct"));
    g.add_record(SpecRecord::new(
        Placement::Stage("pipeline".to_string()),
        SpecBody::Sequence {
            tasks: vec![
                SpecBody::TaskJob {
                    job: JobRef::Direct(func),
                    args: json!([]),
                },
                SpecBody::TaskJob {
                    job: JobRef::Named("named".to_string()),
                    args: json!({}),
                },
            ],
        },
    ))
    .unwrap();

    g.finalize().unwrap();
    assert!(g.run(None).await.unwrap());
    assert_eq!(recorder.calls(), vec!["direct", "named"]);
}

#[test]
fn unknown_task_and_bad_args_are_invalid_jobs() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);

    let err = g.add_spec(SpecBuilder::task("nope").stage("s").build(), None).unwrap_err();
    assert!(matches!(err, BuildclothError::InvalidJob(ref m) if m.contains("nope")));

    let err = g
        .add_spec(SpecBuilder::task("h").stage("s").args(json!(7)).build(), None)
        .unwrap_err();
    assert!(matches!(err, BuildclothError::InvalidJob(_)));

    assert!(matches!(g.add_task("", |_| Ok(())).unwrap_err(), BuildclothError::InvalidJob(_)));
}

#[test]
fn unresolved_substitution_names_the_key() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);

    let strings: Substitutions = [("known".to_string(), "v".to_string())].into_iter().collect();
    let spec = SpecBuilder::task("h").stage("{unknown}").build();
    match g.add_spec(spec, Some(&strings)).unwrap_err() {
        BuildclothError::InvalidJob(msg) => assert!(msg.contains("unknown")),
        other => panic!("expected InvalidJob, got {other:?}"),
    }

    // No mapping means no substitution.
    g.add_spec(SpecBuilder::task("h").stage("{unknown}").build(), None).unwrap();
}

#[tokio::test]
async fn sequence_specs_run_their_tasks_in_order() {
    init_tracing();
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let mut g = generator_with(&fs, GeneratorOptions::default(), &exec);
    with_tasks(&mut g);

    let seq = SpecBuilder::sequence(vec![
        SpecBuilder::task("f"),
        SpecBuilder::shell("/", "true --flag"),
        SpecBuilder::task("h"),
    ])
    .stage("pipeline")
    .build();
    g.add_spec(seq, None).unwrap();
    g.finalize().unwrap();

    assert!(g.run(None).await.unwrap());
    assert_eq!(exec.executed(), vec!["f", "true --flag", "h"]);
}

#[tokio::test]
async fn workers_and_timeout_options_reach_every_stage() {
    let fs = MockFileSystem::new();
    let exec = FakeExecutor::new();
    let options = GeneratorOptions {
        workers: Some(5),
        job_timeout: Some(std::time::Duration::from_secs(9)),
        ..GeneratorOptions::default()
    };
    let mut g = generator_with(&fs, options, &exec);
    with_tasks(&mut g);
    g.add_spec(SpecBuilder::task("h").stage("a").build(), None).unwrap();
    g.add_spec(SpecBuilder::task("h").stage("b").build(), None).unwrap();
    g.finalize().unwrap();

    let system = g.take_system().unwrap();
    for name in ["a", "b"] {
        let stage = system.stage(name).unwrap();
        assert_eq!(stage.workers(), 5);
        assert_eq!(stage.job_timeout(), Some(std::time::Duration::from_secs(9)));
    }
    assert!(system.run(None).await.unwrap());
    assert_eq!(exec.executed(), vec!["h", "h"]);
}

#[test]
fn unknown_check_method_is_rejected_up_front() {
    let fs = MockFileSystem::new();
    let err = Generator::with_filesystem(
        std::sync::Arc::new(fs),
        options_with_check("sha1"),
    )
    .unwrap_err();
    assert!(matches!(err, BuildclothError::UnknownCheckMethod(_)));
}
