// stagecraft/src/core/executor.rs

//! Defines the `Executor<TData>` trait, through which every leaf step is run,
//! and the two executors that ship with the crate.

use crate::core::context_data::ContextData;
use crate::core::step::Step;
use crate::error::StageResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{event, span, Instrument, Level};

/// Runs a single step on behalf of a stage.
///
/// Implementations must return the step's error unmodified and must tolerate
/// concurrent calls: parallel groups share one executor between all of their
/// children.
#[async_trait]
pub trait Executor<TData>: Send + Sync
where
  TData: 'static + Send + Sync,
{
  async fn run(&self, step: &dyn Step<TData>, ctx: ContextData<TData>) -> StageResult;
}

/// How stages hold their executor. Parallel children each get a clone.
pub type SharedExecutor<TData> = Arc<dyn Executor<TData>>;

/// Runs every step inside a `step_execution` span and logs its duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExecutor;

impl TracingExecutor {
  pub fn new() -> Self {
    Self
  }

  /// Convenience for the common case of handing this executor to a stage tree.
  pub fn shared<TData: 'static + Send + Sync>() -> SharedExecutor<TData> {
    Arc::new(Self)
  }
}

#[async_trait]
impl<TData> Executor<TData> for TracingExecutor
where
  TData: 'static + Send + Sync,
{
  async fn run(&self, step: &dyn Step<TData>, ctx: ContextData<TData>) -> StageResult {
    let step_span = span!(Level::DEBUG, "step_execution", step_name = step.name());
    let started = Instant::now();

    let result = async {
      event!(Level::TRACE, "Step starting.");
      step.run(ctx).await
    }
    .instrument(step_span.clone())
    .await;

    let elapsed = started.elapsed();
    step_span.in_scope(|| match &result {
      Ok(()) => event!(Level::DEBUG, elapsed = ?elapsed, "Step finished."),
      Err(e) => event!(Level::WARN, elapsed = ?elapsed, error = %e, "Step failed."),
    });
    result
  }
}

/// What a `RecordingExecutor` remembers about one step invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
  pub name: String,
  pub elapsed: Duration,
  /// Rendered error, `None` when the step succeeded.
  pub error: Option<String>,
}

impl StepRecord {
  pub fn succeeded(&self) -> bool {
    self.error.is_none()
  }
}

/// Delegates to an inner executor and keeps a record per step call.
///
/// Records are appended in completion order. Under a parallel group that
/// order is whatever the scheduler produced.
#[derive(Debug, Default)]
pub struct RecordingExecutor<E = TracingExecutor> {
  inner: E,
  records: Mutex<Vec<StepRecord>>,
}

impl RecordingExecutor<TracingExecutor> {
  pub fn new() -> Self {
    Self::with_inner(TracingExecutor)
  }
}

impl<E> RecordingExecutor<E> {
  pub fn with_inner(inner: E) -> Self {
    Self {
      inner,
      records: Mutex::new(Vec::new()),
    }
  }

  /// Snapshot of everything recorded so far.
  pub fn records(&self) -> Vec<StepRecord> {
    self.records.lock().clone()
  }

  /// Names of the recorded steps, in recording order.
  pub fn step_names(&self) -> Vec<String> {
    self.records.lock().iter().map(|r| r.name.clone()).collect()
  }

  pub fn total_elapsed(&self) -> Duration {
    self.records.lock().iter().map(|r| r.elapsed).sum()
  }

  /// Drops all records, e.g. between two runs sharing this executor.
  pub fn clear(&self) {
    self.records.lock().clear();
  }
}

#[async_trait]
impl<TData, E> Executor<TData> for RecordingExecutor<E>
where
  TData: 'static + Send + Sync,
  E: Executor<TData>,
{
  async fn run(&self, step: &dyn Step<TData>, ctx: ContextData<TData>) -> StageResult {
    let started = Instant::now();
    let result = self.inner.run(step, ctx).await;
    let record = StepRecord {
      name: step.name().to_string(),
      elapsed: started.elapsed(),
      error: result.as_ref().err().map(|e| e.to_string()),
    };
    // Lock is only held for the push, never across an await.
    self.records.lock().push(record);
    result
  }
}
