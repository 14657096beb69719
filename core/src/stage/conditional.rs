// stagecraft/src/stage/conditional.rs

use crate::core::context_data::ContextData;
use crate::core::executor::SharedExecutor;
use crate::error::StageResult;
use crate::stage::{Runnable, Stage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{event, Level};

/// Decides which branch of a conditional stage runs.
pub type Predicate<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

/// Wraps a closure into a [`Predicate`].
pub fn predicate<TData, F>(f: F) -> Option<Predicate<TData>>
where
  TData: 'static + Send + Sync,
  F: Fn(ContextData<TData>) -> bool + Send + Sync + 'static,
{
  Some(Arc::new(f))
}

const DEFAULT_LABEL: &str = "condition";

/// Runs exactly one of two optional branches depending on a predicate.
///
/// A missing predicate is treated as false. A missing branch makes that
/// outcome a successful no-op. The branch that is not selected is never
/// touched.
pub struct ConditionalStage<TData: 'static + Send + Sync> {
  predicate: Option<Predicate<TData>>,
  on_true: Option<Stage<TData>>,
  on_false: Option<Stage<TData>>,
  label: String,
}

impl<TData: 'static + Send + Sync> ConditionalStage<TData> {
  pub fn new(predicate: Option<Predicate<TData>>, on_true: Option<Stage<TData>>, on_false: Option<Stage<TData>>) -> Self {
    Self {
      predicate,
      on_true,
      on_false,
      label: DEFAULT_LABEL.to_string(),
    }
  }

  /// Names the decision in logs and diagrams.
  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = label.into();
    self
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn on_true(&self) -> Option<&Stage<TData>> {
    self.on_true.as_ref()
  }

  pub fn on_false(&self) -> Option<&Stage<TData>> {
    self.on_false.as_ref()
  }

  fn evaluate(&self, ctx: &ContextData<TData>) -> bool {
    match &self.predicate {
      Some(predicate) => predicate(ctx.clone()),
      None => false,
    }
  }
}

#[async_trait]
impl<TData: 'static + Send + Sync> Runnable<TData> for ConditionalStage<TData> {
  async fn run(&self, executor: &SharedExecutor<TData>, ctx: &ContextData<TData>) -> StageResult {
    let holds = self.evaluate(ctx);
    let branch = if holds { &self.on_true } else { &self.on_false };
    event!(
      Level::DEBUG,
      label = %self.label,
      holds,
      branch_present = branch.is_some(),
      "Conditional stage evaluated."
    );

    match branch {
      Some(stage) => stage.run(executor, ctx).await,
      None => Ok(()),
    }
  }
}
