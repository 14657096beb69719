// stagecraft/src/stage/lifecycle.rs

//! Before/after hooks around a stage.
//!
//! Hooks are async closures. A before hook can veto the stage by returning an
//! error. An after hook receives the stage's outcome and returns the outcome
//! of the whole lifecycle stage, so it can pass the error through, recover
//! from it or replace it.
//!
//! Wrapping a lifecycle stage again stacks the hooks:
//! outer-before, inner-before, stage, inner-after, outer-after.

use crate::core::context_data::ContextData;
use crate::core::executor::SharedExecutor;
use crate::core::step::StageFuture;
use crate::error::StageResult;
use crate::stage::{Runnable, Stage};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::{event, Level};

pub type BeforeHook<TData> = Arc<dyn Fn(Stage<TData>, ContextData<TData>) -> StageFuture + Send + Sync>;

pub type AfterHook<TData> = Arc<dyn Fn(Stage<TData>, ContextData<TData>, StageResult) -> StageFuture + Send + Sync>;

pub struct LifecycleStage<TData: 'static + Send + Sync> {
  before: Option<BeforeHook<TData>>,
  after: Option<AfterHook<TData>>,
  stage: Stage<TData>,
}

impl<TData: 'static + Send + Sync> LifecycleStage<TData> {
  /// A lifecycle with no hooks yet; runs `stage` as-is.
  pub fn new(stage: Stage<TData>) -> Self {
    Self {
      before: None,
      after: None,
      stage,
    }
  }

  /// Sets the before hook, replacing any previous one on this layer.
  pub fn before<F, Fut>(mut self, hook: F) -> Self
  where
    F: Fn(Stage<TData>, ContextData<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StageResult> + Send + 'static,
  {
    self.before = Some(Arc::new(move |stage: Stage<TData>, ctx: ContextData<TData>| -> StageFuture {
      Box::pin(hook(stage, ctx))
    }));
    self
  }

  /// Sets the after hook, replacing any previous one on this layer.
  pub fn after<F, Fut>(mut self, hook: F) -> Self
  where
    F: Fn(Stage<TData>, ContextData<TData>, StageResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StageResult> + Send + 'static,
  {
    self.after = Some(Arc::new(
      move |stage: Stage<TData>, ctx: ContextData<TData>, result: StageResult| -> StageFuture {
        Box::pin(hook(stage, ctx, result))
      },
    ));
    self
  }

  /// The wrapped stage.
  pub fn stage(&self) -> &Stage<TData> {
    &self.stage
  }

  pub fn has_before(&self) -> bool {
    self.before.is_some()
  }

  pub fn has_after(&self) -> bool {
    self.after.is_some()
  }
}

#[async_trait]
impl<TData: 'static + Send + Sync> Runnable<TData> for LifecycleStage<TData> {
  async fn run(&self, executor: &SharedExecutor<TData>, ctx: &ContextData<TData>) -> StageResult {
    if let Some(before) = &self.before {
      if let Err(e) = before(self.stage.clone(), ctx.clone()).await {
        event!(Level::DEBUG, stage = self.stage.label(), error = %e, "Before hook vetoed the stage.");
        return Err(e);
      }
    }

    let result = self.stage.run(executor, ctx).await;

    match &self.after {
      Some(after) => {
        let stage_failed = result.is_err();
        let final_result = after(self.stage.clone(), ctx.clone(), result).await;
        if stage_failed && final_result.is_ok() {
          event!(Level::DEBUG, stage = self.stage.label(), "After hook recovered a stage failure.");
        }
        final_result
      }
      None => result,
    }
  }
}
