// tests/interrupt.rs

use std::sync::Arc;
use std::time::Duration;

use parajob::dag::JobState;
use parajob::{ExecutionContext, FailurePolicy, NullMonitor, RuntimeOptions, ScheduleError};
use parajob_test_utils::{
    RecordingMonitor, ScriptedJob, Timeline, as_jobs, init_tracing, scheduler, with_timeout,
};

fn interrupt_after(ctx: &ExecutionContext, ms: u64) {
    let handle = ctx.interrupt_handle().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        handle.interrupt();
    });
}

#[tokio::test]
async fn interrupt_stops_dispatch_and_reports_running_jobs() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("listener", &timeline).waits_for_interrupt().build(),
        ScriptedJob::new("quick", &timeline).build(),
        ScriptedJob::new("next", &timeline).after(&["listener"]).build(),
    ];
    let ctx = ExecutionContext::new("batch", "flow", "exec-1");
    interrupt_after(&ctx, 50);

    let err = with_timeout(scheduler(&[("default", 2)]).execute(
        Arc::new(NullMonitor),
        ctx,
        as_jobs(&jobs),
        FailurePolicy::BestEffort,
    ))
    .await
    .expect_err("an interrupted run fails");

    let ScheduleError::Interrupted { report } = &err else {
        panic!("expected an interrupted error, got {err:?}");
    };
    assert!(report.was_interrupted());
    assert_eq!(report.state_of("quick"), Some(JobState::Done));
    assert_eq!(report.failed(), vec!["listener"]);
    assert_eq!(report.incomplete(), vec!["next"]);
    assert!(!timeline.was_started("next"));
}

#[tokio::test]
async fn jobs_queued_on_a_slot_are_withdrawn() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("holder", &timeline).waits_for_interrupt().build(),
        ScriptedJob::new("queued", &timeline).build(),
        ScriptedJob::new("queued_child", &timeline).after(&["queued"]).build(),
    ];
    let monitor = Arc::new(RecordingMonitor::new());
    let ctx = ExecutionContext::default();
    interrupt_after(&ctx, 50);

    let err = with_timeout(scheduler(&[("default", 1)]).execute(
        monitor.clone(),
        ctx,
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect_err("an interrupted run fails");

    let report = err.report().expect("report");
    assert_eq!(report.state_of("queued"), Some(JobState::Abandoned));
    assert_eq!(jobs[1].executions(), 0);
    assert_eq!(report.not_done(), vec!["holder", "queued", "queued_child"]);

    // Each job is counted once, withdrawn ones included.
    assert_eq!(monitor.progress("batch"), 3);
    assert!(monitor.opens("queued").is_empty());
    assert_eq!(monitor.close_count("holder"), 1);
}

#[tokio::test]
async fn dropping_the_run_stops_queued_and_running_jobs() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("holder", &timeline).stubborn_ms(150).build(),
        ScriptedJob::new("queued", &timeline).build(),
    ];

    let sched = scheduler(&[("default", 1)]);
    let run = sched.execute(
        Arc::new(NullMonitor),
        ExecutionContext::default(),
        as_jobs(&jobs),
        FailurePolicy::Strict,
    );
    let cancelled = tokio::time::timeout(Duration::from_millis(30), run).await;
    assert!(cancelled.is_err(), "run should still be busy when the caller gives up");
    assert_eq!(timeline.started(), vec!["holder"]);

    // Well past the point where the holder would have released its slot.
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(timeline.started(), vec!["holder"]);
    assert_eq!(jobs[1].executions(), 0);
    // The holder was aborted rather than left running detached.
    assert_eq!(timeline.ended(), vec!["holder"]);
    assert_eq!(timeline.max_concurrency("default"), 1);
}

#[tokio::test]
async fn already_interrupted_context_runs_nothing() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![
        ScriptedJob::new("a", &timeline).build(),
        ScriptedJob::new("b", &timeline).after(&["a"]).build(),
    ];
    let ctx = ExecutionContext::default();
    ctx.interrupt_handle().interrupt();

    let err = with_timeout(scheduler(&[("default", 1)]).execute(
        Arc::new(NullMonitor),
        ctx,
        as_jobs(&jobs),
        FailurePolicy::Strict,
    ))
    .await
    .expect_err("an interrupted run fails");

    assert!(matches!(err, ScheduleError::Interrupted { .. }));
    assert_eq!(err.incomplete(), vec!["a", "b"]);
    assert!(timeline.started().is_empty());
}

#[tokio::test]
async fn jobs_ignoring_the_interrupt_are_aborted_after_the_grace_period() {
    init_tracing();
    let timeline = Timeline::new();
    let jobs = vec![ScriptedJob::new("stubborn", &timeline).stubborn_ms(30_000).build()];
    let ctx = ExecutionContext::default();
    interrupt_after(&ctx, 20);

    let options = RuntimeOptions {
        interrupt_grace: Duration::from_millis(100),
        ..RuntimeOptions::default()
    };
    let err = with_timeout(
        scheduler(&[("default", 1)])
            .with_options(options)
            .execute(Arc::new(NullMonitor), ctx, as_jobs(&jobs), FailurePolicy::Strict),
    )
    .await
    .expect_err("an interrupted run fails");

    let report = err.report().expect("report");
    assert_eq!(report.failed(), vec!["stubborn"]);
    let failure = report.first_failure().expect("abort is recorded");
    assert!(failure.error.to_string().contains("grace period"));
}
