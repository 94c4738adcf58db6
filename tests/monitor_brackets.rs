// tests/monitor_brackets.rs

use std::sync::Arc;

use parajob::{ExecutionContext, FailurePolicy, RuntimeOptions};
use parajob_test_utils::{
    MonitorCall, RecordingMonitor, ScriptedJob, Timeline, as_jobs, init_tracing, scheduler,
    with_timeout,
};

#[tokio::test]
async fn every_executed_job_gets_one_bracket() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("compile", &timeline).label("Compile sources").build(),
        ScriptedJob::new("test", &timeline).after(&["compile"]).fails("red").build(),
        ScriptedJob::new("ship", &timeline).after(&["test"]).build(),
    ];
    let monitor = Arc::new(RecordingMonitor::new());

    let options = RuntimeOptions {
        batch_label: "nightly".to_string(),
        ..RuntimeOptions::default()
    };
    let _ = with_timeout(scheduler(&[("default", 1)]).with_options(options).execute(
        monitor.clone(),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::BestEffort,
    ))
    .await;

    assert_eq!(monitor.opens("Compile sources"), vec![1]);
    assert_eq!(monitor.close_count("Compile sources"), 1);
    assert_eq!(monitor.opens("test"), vec![1]);
    assert_eq!(monitor.close_count("test"), 1);

    // Abandoned jobs never execute, so they get no bracket.
    assert!(monitor.opens("ship").is_empty());
    assert_eq!(monitor.close_count("ship"), 0);

    // The batch bracket wraps everything and counts every job once.
    let calls = monitor.calls();
    assert_eq!(
        calls.first(),
        Some(&MonitorCall::Open {
            label: "nightly".to_string(),
            units: 3
        })
    );
    assert_eq!(
        calls.last(),
        Some(&MonitorCall::Close {
            label: "nightly".to_string()
        })
    );
    assert_eq!(monitor.progress("nightly"), 3);
}

#[tokio::test]
async fn job_bracket_closes_before_dependents_open() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("first", &timeline).build(),
        ScriptedJob::new("second", &timeline).after(&["first"]).build(),
    ];
    let monitor = Arc::new(RecordingMonitor::new());

    with_timeout(scheduler(&[("default", 2)]).execute(
        monitor.clone(),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect("run should succeed");

    let closed_first = monitor
        .position(|c| matches!(c, MonitorCall::Close { label } if label == "first"))
        .expect("first closed");
    let opened_second = monitor
        .position(|c| matches!(c, MonitorCall::Open { label, .. } if label == "second"))
        .expect("second opened");
    assert!(closed_first < opened_second);
}

#[tokio::test]
async fn batch_progress_counts_every_job_once_when_interrupted() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("done_early", &timeline).build(),
        ScriptedJob::new("listener", &timeline).waits_for_interrupt().build(),
        ScriptedJob::new("waiting", &timeline).build(),
        ScriptedJob::new("downstream", &timeline).after(&["listener"]).build(),
    ];
    let monitor = Arc::new(RecordingMonitor::new());
    let ctx = ExecutionContext::default();
    let handle = ctx.interrupt_handle().clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.interrupt();
    });

    // One slot: `done_early` hands it to `listener`; `waiting` never gets it.
    let err = with_timeout(scheduler(&[("default", 1)]).execute(
        monitor.clone(),
        ctx,
        as_jobs(&jobs),
        FailurePolicy::BestEffort,
    ))
    .await
    .expect_err("interrupted run fails");

    assert!(err.report().expect("report").was_interrupted());
    assert_eq!(monitor.progress("batch"), 4);
    assert_eq!(monitor.close_count("batch"), 1);
}

#[tokio::test]
async fn batch_progress_includes_jobs_lost_to_a_cycle() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("free", &timeline).build(),
        ScriptedJob::new("x", &timeline).after(&["y"]).build(),
        ScriptedJob::new("y", &timeline).after(&["x"]).build(),
    ];
    let monitor = Arc::new(RecordingMonitor::new());

    let _ = with_timeout(scheduler(&[("default", 1)]).execute(
        monitor.clone(),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await;

    assert_eq!(monitor.opens("batch"), vec![3]);
    assert_eq!(monitor.progress("batch"), 3);
}
