// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use stagecraft::{step_fn, ContextData, SharedExecutor, Stage, StageError, StageResult, TracingExecutor};
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};
use std::time::Duration;
use tracing::Level;

// --- Common Context Struct ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub hook_log: Vec<String>,
}

// --- Common Stage Creators ---

/// A step that bumps the counter, appends to the message and logs its name.
pub fn simple_stage(step_name: &'static str, message_to_append: &'static str) -> Stage<TestContext> {
  Stage::step(step_fn(step_name, move |ctx: ContextData<TestContext>| async move {
    let mut guard = ctx.write();
    guard.counter += 1;
    guard.message.push_str(message_to_append);
    guard.steps_executed.push(step_name.to_string());
    tracing::debug!(target: "test_steps", step = %step_name, "executed, counter: {}", guard.counter);
    Ok(())
  }))
}

/// A step that logs its name and fails with `error_message`.
pub fn failing_stage(step_name: &'static str, error_message: &'static str) -> Stage<TestContext> {
  Stage::step(step_fn(step_name, move |ctx: ContextData<TestContext>| async move {
    ctx.write().steps_executed.push(step_name.to_string());
    tracing::warn!(target: "test_steps", step = %step_name, "failing with: '{}'", error_message);
    Err(StageError::msg(error_message))
  }))
}

/// A step that sleeps before logging its name. Used to prove groups wait.
pub fn slow_stage(step_name: &'static str, delay_ms: u64) -> Stage<TestContext> {
  Stage::step(step_fn(step_name, move |ctx: ContextData<TestContext>| async move {
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    ctx.write().steps_executed.push(step_name.to_string());
    Ok(())
  }))
}

/// A step that only bumps `counter`, for counting invocations without a context.
pub fn counting_stage(step_name: &'static str, counter: Arc<AtomicUsize>) -> Stage<TestContext> {
  Stage::step(step_fn(step_name, move |_ctx: ContextData<TestContext>| {
    let counter = counter.clone();
    async move {
      counter.fetch_add(1, Ordering::SeqCst);
      StageResult::Ok(())
    }
  }))
}

pub fn executor() -> SharedExecutor<TestContext> {
  TracingExecutor::shared()
}

pub fn new_context() -> ContextData<TestContext> {
  ContextData::new(TestContext::default())
}

/// Renders a StageError's message for assertions.
pub fn failed_message(err: &StageError) -> String {
  match err {
    StageError::Failed { source } => source.to_string(),
    other => panic!("Expected StageError::Failed, got {:?}", other),
  }
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Atomic counters for checking execution counts ---
pub static STEP_EXEC_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static BEFORE_HOOK_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static AFTER_HOOK_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));
pub static PREDICATE_COUNTER: Lazy<Arc<AtomicUsize>> = Lazy::new(|| Arc::new(AtomicUsize::new(0)));

pub fn reset_counters() {
  STEP_EXEC_COUNTER.store(0, Ordering::SeqCst);
  BEFORE_HOOK_COUNTER.store(0, Ordering::SeqCst);
  AFTER_HOOK_COUNTER.store(0, Ordering::SeqCst);
  PREDICATE_COUNTER.store(0, Ordering::SeqCst);
}
