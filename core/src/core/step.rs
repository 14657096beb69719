// stagecraft/src/core/step.rs

//! Defines the `Step<TData>` trait, the atomic unit of work every stage tree bottoms out in.

use crate::core::context_data::ContextData;
use crate::error::StageResult;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// A named, side-effecting unit of work.
///
/// Steps are supplied by the application. The library only ever calls them
/// through an [`Executor`](crate::core::executor::Executor), and passes the
/// run's shared context so the step can read or mutate it.
#[async_trait]
pub trait Step<TData>: Send + Sync
where
  TData: 'static + Send + Sync,
{
  fn name(&self) -> &str;

  async fn run(&self, ctx: ContextData<TData>) -> StageResult;
}

/// Boxed future returned by closure-backed steps and lifecycle hooks.
pub type StageFuture = Pin<Box<dyn Future<Output = StageResult> + Send>>;

/// A step backed by an async closure.
pub struct FnStep<TData: 'static + Send + Sync> {
  name: String,
  run_fn: Box<dyn Fn(ContextData<TData>) -> StageFuture + Send + Sync>,
}

impl<TData: 'static + Send + Sync> FnStep<TData> {
  pub fn new<F, Fut>(name: impl Into<String>, run_fn: F) -> Self
  where
    F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StageResult> + Send + 'static,
  {
    Self {
      name: name.into(),
      run_fn: Box::new(move |ctx: ContextData<TData>| -> StageFuture { Box::pin(run_fn(ctx)) }),
    }
  }
}

#[async_trait]
impl<TData: 'static + Send + Sync> Step<TData> for FnStep<TData> {
  fn name(&self) -> &str {
    &self.name
  }

  async fn run(&self, ctx: ContextData<TData>) -> StageResult {
    (self.run_fn)(ctx).await
  }
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for FnStep<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FnStep").field("name", &self.name).finish()
  }
}

/// Shorthand for `FnStep::new`.
pub fn step_fn<TData, F, Fut>(name: impl Into<String>, run_fn: F) -> FnStep<TData>
where
  TData: 'static + Send + Sync,
  F: Fn(ContextData<TData>) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = StageResult> + Send + 'static,
{
  FnStep::new(name, run_fn)
}
