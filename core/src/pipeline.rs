// stagecraft/src/pipeline.rs

//! `Pipeline<TData>` pairs a root stage with the executor that runs its steps.

use crate::core::context_data::ContextData;
use crate::core::executor::{SharedExecutor, TracingExecutor};
use crate::diagram::Diagram;
use crate::error::StageResult;
use crate::stage::{Runnable, Stage};
use tracing::{event, instrument, Level};

/// A stage tree ready to run.
///
/// The same pipeline can be run any number of times, one context per run.
/// Runs issued one after another share the executor; runs issued
/// concurrently do too, so the executor must tolerate that.
pub struct Pipeline<TData: 'static + Send + Sync> {
  root: Stage<TData>,
  executor: SharedExecutor<TData>,
}

impl<TData: 'static + Send + Sync> Pipeline<TData> {
  pub fn new(root: Stage<TData>, executor: SharedExecutor<TData>) -> Self {
    Self { root, executor }
  }

  /// A pipeline whose steps run through a [`TracingExecutor`].
  pub fn with_tracing(root: Stage<TData>) -> Self {
    Self::new(root, TracingExecutor::shared())
  }

  pub fn root(&self) -> &Stage<TData> {
    &self.root
  }

  pub fn executor(&self) -> &SharedExecutor<TData> {
    &self.executor
  }

  /// Runs the whole tree against `ctx`. The returned error is the only
  /// failure channel; nothing is retried.
  #[instrument(
        name = "Pipeline::run",
        skip_all,
        fields(
            pipeline_context_data_type = %std::any::type_name::<TData>(),
            root = %self.root.label(),
        ),
        err(Display)
    )]
  pub async fn run(&self, ctx: ContextData<TData>) -> StageResult {
    event!(Level::DEBUG, "Pipeline execution starting.");
    self.root.run(&self.executor, &ctx).await?;
    event!(Level::DEBUG, "Pipeline execution completed successfully.");
    Ok(())
  }

  pub fn draw(&self, diagram: &mut dyn Diagram) {
    self.root.draw(diagram);
  }
}

impl<TData: 'static + Send + Sync> Clone for Pipeline<TData> {
  fn clone(&self) -> Self {
    Self::new(self.root.clone(), self.executor.clone())
  }
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for Pipeline<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline").field("root", &self.root).finish_non_exhaustive()
  }
}
