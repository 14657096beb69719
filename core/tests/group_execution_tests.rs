// tests/group_execution_tests.rs
mod common;

use common::*;
use serial_test::serial;
use stagecraft::{step_fn, ContextData, Runnable, Stage, StageError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Barrier;

#[tokio::test]
#[serial]
async fn test_sequential_group_runs_stages_in_order() {
  setup_tracing();
  let group = Stage::sequential([
    simple_stage("step1", " S1"),
    simple_stage("step2", " S2"),
    simple_stage("step3", " S3"),
  ]);

  let ctx = new_context();
  let result = group.run(&executor(), &ctx).await;

  assert!(result.is_ok());
  let guard = ctx.read();
  assert_eq!(guard.counter, 3);
  assert_eq!(guard.message, " S1 S2 S3");
  assert_eq!(guard.steps_executed, vec!["step1", "step2", "step3"]);
}

#[tokio::test]
#[serial]
async fn test_sequential_group_stops_at_first_error() {
  setup_tracing();
  reset_counters();
  let group = Stage::sequential([
    simple_stage("good_step", "Good"),
    failing_stage("bad_step", "I am a bad step!"),
    counting_stage("never_run_1", STEP_EXEC_COUNTER.clone()),
    counting_stage("never_run_2", STEP_EXEC_COUNTER.clone()),
  ]);

  let ctx = new_context();
  let result = group.run(&executor(), &ctx).await;

  let err = result.expect_err("sequential group should fail");
  assert_eq!(failed_message(&err), "I am a bad step!");
  assert_eq!(STEP_EXEC_COUNTER.load(Ordering::SeqCst), 0);

  let guard = ctx.read();
  assert_eq!(guard.counter, 1);
  assert_eq!(guard.steps_executed, vec!["good_step", "bad_step"]);
}

#[tokio::test]
#[serial]
async fn test_sequential_failure_is_returned_unwrapped() {
  setup_tracing();
  let group = Stage::sequential([Stage::step(step_fn("panicky", |_ctx: ContextData<TestContext>| async {
    Err(StageError::Panicked {
      message: "not really".to_string(),
    })
  }))]);

  let result = group.run(&executor(), &new_context()).await;
  match result {
    Err(StageError::Panicked { message }) => assert_eq!(message, "not really"),
    other => panic!("Expected the step's own error, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_empty_groups_succeed() {
  setup_tracing();
  let ctx = new_context();
  assert!(Stage::<TestContext>::sequential([]).run(&executor(), &ctx).await.is_ok());
  assert!(Stage::<TestContext>::parallel([]).run(&executor(), &ctx).await.is_ok());
  assert_eq!(ctx.read().counter, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_parallel_group_runs_children_concurrently() {
  setup_tracing();
  // Both children must be in flight at once to get past the barrier.
  let barrier = Arc::new(Barrier::new(2));
  let rendezvous = |name: &'static str| {
    let barrier = barrier.clone();
    Stage::step(step_fn(name, move |ctx: ContextData<TestContext>| {
      let barrier = barrier.clone();
      async move {
        barrier.wait().await;
        ctx.write().steps_executed.push(name.to_string());
        Ok(())
      }
    }))
  };

  let group = Stage::parallel([rendezvous("left"), rendezvous("right")]);
  let ctx = new_context();
  let result = tokio::time::timeout(Duration::from_secs(5), group.run(&executor(), &ctx))
    .await
    .expect("parallel children never met at the barrier");

  assert!(result.is_ok());
  let mut executed = ctx.read().steps_executed.clone();
  executed.sort();
  assert_eq!(executed, vec!["left", "right"]);
}

#[tokio::test]
#[serial]
async fn test_parallel_group_waits_for_all_children_after_failure() {
  setup_tracing();
  let slow_finished = Arc::new(AtomicBool::new(false));
  let slow_flag = slow_finished.clone();
  let slow = Stage::step(step_fn("slow", move |_ctx: ContextData<TestContext>| {
    let slow_flag = slow_flag.clone();
    async move {
      tokio::time::sleep(Duration::from_millis(50)).await;
      slow_flag.store(true, Ordering::SeqCst);
      Ok(())
    }
  }));

  let group = Stage::parallel([failing_stage("fast_fail", "fast failure"), slow]);
  let result = group.run(&executor(), &new_context()).await;

  assert!(result.is_err());
  assert!(
    slow_finished.load(Ordering::SeqCst),
    "group returned before its slow child finished"
  );
}

#[tokio::test]
#[serial]
async fn test_parallel_group_aggregates_exactly_the_failing_children() {
  setup_tracing();
  let group = Stage::parallel([
    simple_stage("ok_0", "a"),
    failing_stage("fail_1", "first failure"),
    simple_stage("ok_2", "b"),
    failing_stage("fail_3", "second failure"),
  ]);

  let ctx = new_context();
  let err = group.run(&executor(), &ctx).await.expect_err("two children fail");
  let failure = err.as_parallel().expect("expected an aggregate error");

  assert_eq!(failure.indices(), vec![1, 3]);
  assert_eq!(failure.total(), 4);
  assert_eq!(failure.len(), 2);
  assert_eq!(failed_message(failure.error_at(1).unwrap()), "first failure");
  assert_eq!(failed_message(failure.error_at(3).unwrap()), "second failure");
  assert!(failure.error_at(0).is_none());
  assert!(failure.error_at(2).is_none());

  // Successful siblings keep their effects.
  assert_eq!(ctx.read().counter, 2);
}

#[tokio::test]
#[serial]
async fn test_parallel_failures_are_ordered_by_index_not_completion() {
  setup_tracing();
  let late_failure = Stage::step(step_fn("late", |_ctx: ContextData<TestContext>| async {
    tokio::time::sleep(Duration::from_millis(40)).await;
    Err(StageError::msg("late"))
  }));
  let group = Stage::parallel([late_failure, failing_stage("early", "early")]);

  let err = group.run(&executor(), &new_context()).await.unwrap_err();
  let failure = err.as_parallel().unwrap();
  let messages: Vec<String> = failure.failures().iter().map(|f| failed_message(&f.error)).collect();
  assert_eq!(messages, vec!["late", "early"]);
  assert_eq!(err.to_string(), "2 of 2 parallel stages failed; [0] Stage failed: late; [1] Stage failed: early");
}

#[tokio::test]
#[serial]
async fn test_parallel_group_reports_panicking_child() {
  setup_tracing();
  let panicking = Stage::step(step_fn("boom", |_ctx: ContextData<TestContext>| async {
    if true {
      panic!("child exploded");
    }
    Ok(())
  }));
  let group = Stage::parallel([simple_stage("fine", "x"), panicking]);

  let ctx = new_context();
  let err = group.run(&executor(), &ctx).await.unwrap_err();
  let failure = err.as_parallel().unwrap();
  assert_eq!(failure.indices(), vec![1]);
  match failure.error_at(1) {
    Some(StageError::Panicked { message }) => assert_eq!(message, "child exploded"),
    other => panic!("Expected Panicked, got {:?}", other),
  }
  assert_eq!(ctx.read().counter, 1);
}

#[tokio::test]
#[serial]
async fn test_parallel_children_share_one_context() {
  setup_tracing();
  let root_ctx = new_context();
  let seen = Arc::new(AtomicUsize::new(0));

  let same_context_check = |name: &'static str| {
    let expected = root_ctx.clone();
    let seen = seen.clone();
    Stage::step(step_fn(name, move |ctx: ContextData<TestContext>| {
      let same = ctx.ptr_eq(&expected);
      let seen = seen.clone();
      async move {
        if same {
          seen.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
      }
    }))
  };

  let tree = Stage::sequential([
    same_context_check("first"),
    Stage::parallel([same_context_check("left"), same_context_check("right")]),
  ]);
  tree.run(&executor(), &root_ctx).await.unwrap();
  assert_eq!(seen.load(Ordering::SeqCst), 3);
}
