// stagecraft/src/stage/group.rs

//! Sequential and parallel groups of stages.

use crate::core::context_data::ContextData;
use crate::core::executor::SharedExecutor;
use crate::error::{ChildFailure, ParallelFailure, StageError, StageResult};
use crate::stage::{Runnable, Stage};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{event, instrument, Instrument, Level};

/// Runs its stages in order on the calling task. The first failing stage
/// ends the group and its error is returned unchanged.
pub struct SequentialGroup<TData: 'static + Send + Sync> {
  stages: Vec<Stage<TData>>,
}

impl<TData: 'static + Send + Sync> SequentialGroup<TData> {
  pub fn new(stages: impl IntoIterator<Item = Stage<TData>>) -> Self {
    Self {
      stages: stages.into_iter().collect(),
    }
  }

  pub fn stages(&self) -> &[Stage<TData>] {
    &self.stages
  }
}

#[async_trait]
impl<TData: 'static + Send + Sync> Runnable<TData> for SequentialGroup<TData> {
  #[instrument(name = "SequentialGroup::run", skip_all)]
  async fn run(&self, executor: &SharedExecutor<TData>, ctx: &ContextData<TData>) -> StageResult {
    event!(Level::TRACE, num_stages = self.stages.len(), "Sequential group starting.");
    for (stage_idx, stage) in self.stages.iter().enumerate() {
      if let Err(e) = stage.run(executor, ctx).await {
        event!(
          Level::DEBUG,
          stage_index = stage_idx,
          stage = stage.label(),
          skipped = self.stages.len() - stage_idx - 1,
          error = %e,
          "Sequential group aborted."
        );
        return Err(e);
      }
    }
    Ok(())
  }
}

/// Runs every stage as its own tokio task and waits for all of them.
///
/// Children are never cancelled: a failing child does not stop its siblings.
/// Failures are reported together in a [`ParallelFailure`], keyed by child
/// index.
pub struct ParallelGroup<TData: 'static + Send + Sync> {
  stages: Vec<Stage<TData>>,
}

impl<TData: 'static + Send + Sync> ParallelGroup<TData> {
  pub fn new(stages: impl IntoIterator<Item = Stage<TData>>) -> Self {
    Self {
      stages: stages.into_iter().collect(),
    }
  }

  pub fn stages(&self) -> &[Stage<TData>] {
    &self.stages
  }
}

#[async_trait]
impl<TData: 'static + Send + Sync> Runnable<TData> for ParallelGroup<TData> {
  #[instrument(name = "ParallelGroup::run", skip_all)]
  async fn run(&self, executor: &SharedExecutor<TData>, ctx: &ContextData<TData>) -> StageResult {
    event!(Level::TRACE, num_stages = self.stages.len(), "Spawning parallel children.");
    let handles: Vec<_> = self
      .stages
      .iter()
      .cloned()
      .map(|stage| {
        let executor = Arc::clone(executor);
        let ctx = ctx.clone();
        tokio::spawn(async move { stage.run(&executor, &ctx).await }.in_current_span())
      })
      .collect();

    // join_all keeps the handles' order, so outcomes line up with child indices.
    let outcomes = join_all(handles).await;

    let failures: Vec<ChildFailure> = outcomes
      .into_iter()
      .enumerate()
      .filter_map(|(index, outcome)| {
        let error = match outcome {
          Ok(Ok(())) => return None,
          Ok(Err(e)) => e,
          Err(join_err) => StageError::Panicked {
            message: join_error_message(join_err),
          },
        };
        Some(ChildFailure { index, error })
      })
      .collect();

    if failures.is_empty() {
      return Ok(());
    }

    let failure = ParallelFailure::new(self.stages.len(), failures);
    event!(Level::DEBUG, failed_indices = ?failure.indices(), "Parallel group finished with failures.");
    Err(StageError::Parallel(failure))
  }
}

fn join_error_message(join_err: JoinError) -> String {
  if !join_err.is_panic() {
    return join_err.to_string();
  }
  let payload = join_err.into_panic();
  if let Some(message) = payload.downcast_ref::<&str>() {
    (*message).to_string()
  } else if let Some(message) = payload.downcast_ref::<String>() {
    message.clone()
  } else {
    "task panicked with a non-string payload".to_string()
  }
}
