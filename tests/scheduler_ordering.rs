// tests/scheduler_ordering.rs

use std::sync::Arc;

use parajob::{ExecutionContext, FailurePolicy, NullMonitor};
use parajob_test_utils::{ScriptedJob, Timeline, as_jobs, init_tracing, scheduler, with_timeout};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blockers_finish_before_dependents_start() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("fetch", &timeline).sleep_ms(30).build(),
        ScriptedJob::new("unpack", &timeline).after(&["fetch"]).sleep_ms(10).build(),
        ScriptedJob::new("lint", &timeline).after(&["unpack"]).sleep_ms(10).build(),
        ScriptedJob::new("build", &timeline).after(&["unpack"]).sleep_ms(20).build(),
        ScriptedJob::new("package", &timeline).after(&["lint", "build"]).build(),
    ];

    with_timeout(scheduler(&[("default", 4)]).execute(
        Arc::new(NullMonitor),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect("diamond should succeed");

    assert!(timeline.ended_before_start("fetch", "unpack"));
    assert!(timeline.ended_before_start("unpack", "lint"));
    assert!(timeline.ended_before_start("unpack", "build"));
    assert!(timeline.ended_before_start("lint", "package"));
    assert!(timeline.ended_before_start("build", "package"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn default_pool_never_exceeds_its_multiplexity() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs: Vec<_> = (0..8)
        .map(|i| ScriptedJob::new(&format!("job{i}"), &timeline).sleep_ms(20).build())
        .collect();

    with_timeout(scheduler(&[("default", 2)]).execute(
        Arc::new(NullMonitor),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect("independent jobs should succeed");

    assert_eq!(timeline.started().len(), 8);
    assert!(timeline.max_concurrency("default") <= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn named_pools_are_bounded_independently() {
    init_tracing();
    let timeline = Timeline::new();
    let mut jobs = Vec::new();
    for i in 0..4 {
        jobs.push(ScriptedJob::new(&format!("db{i}"), &timeline).resource("db").sleep_ms(20).build());
        jobs.push(ScriptedJob::new(&format!("cpu{i}"), &timeline).sleep_ms(20).build());
    }

    with_timeout(scheduler(&[("default", 3), ("db", 1)]).execute(
        Arc::new(NullMonitor),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect("run should succeed");

    assert_eq!(timeline.max_concurrency("db"), 1);
    assert!(timeline.max_concurrency("default") <= 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unconfigured_resources_share_the_default_pool() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("gpu", &timeline).resource("gpu").sleep_ms(30).build(),
        ScriptedJob::new("net", &timeline).resource("net").sleep_ms(30).build(),
        ScriptedJob::new("plain", &timeline).sleep_ms(30).build(),
    ];

    with_timeout(scheduler(&[("default", 1)]).execute(
        Arc::new(NullMonitor),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect("run should succeed");

    // Three different resource names, one shared slot.
    assert_eq!(timeline.max_total_concurrency(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_jobs_run_in_parallel() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs: Vec<_> = (0..3)
        .map(|i| ScriptedJob::new(&format!("p{i}"), &timeline).sleep_ms(200).build())
        .collect();

    with_timeout(scheduler(&[("default", 3)]).execute(
        Arc::new(NullMonitor),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect("run should succeed");

    assert_eq!(timeline.max_concurrency("default"), 3);
}
