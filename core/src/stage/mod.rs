// stagecraft/src/stage/mod.rs

//! The stage composition model.
//!
//! A [`Stage`] is a cheap, cloneable handle over one of a closed set of
//! variants ([`StageKind`]): a single step, a sequential group, a parallel
//! group, a conditional branch or a lifecycle-wrapped stage. Every variant
//! runs through the same [`Runnable`] capability, so variants nest freely.

pub mod conditional;
pub mod group;
pub mod lifecycle;

use crate::core::context_data::ContextData;
use crate::core::executor::{Executor, SharedExecutor};
use crate::core::step::Step;
use crate::diagram::Diagram;
use crate::error::StageResult;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

pub use conditional::{predicate, ConditionalStage, Predicate};
pub use group::{ParallelGroup, SequentialGroup};
pub use lifecycle::{AfterHook, BeforeHook, LifecycleStage};

/// Anything that can be run given an executor and the run's context.
#[async_trait]
pub trait Runnable<TData>: Send + Sync
where
  TData: 'static + Send + Sync,
{
  async fn run(&self, executor: &SharedExecutor<TData>, ctx: &ContextData<TData>) -> StageResult;
}

/// The variants a stage can take.
pub enum StageKind<TData: 'static + Send + Sync> {
  Step(Arc<dyn Step<TData>>),
  Sequential(SequentialGroup<TData>),
  Parallel(ParallelGroup<TData>),
  Conditional(ConditionalStage<TData>),
  Lifecycle(LifecycleStage<TData>),
}

/// A node of a stage tree. Clones share the node.
pub struct Stage<TData: 'static + Send + Sync>(Arc<StageKind<TData>>);

impl<TData: 'static + Send + Sync> Stage<TData> {
  pub fn from_kind(kind: StageKind<TData>) -> Self {
    Stage(Arc::new(kind))
  }

  pub fn kind(&self) -> &StageKind<TData> {
    &self.0
  }

  /// A leaf stage running `step` through the executor.
  pub fn step(step: impl Step<TData> + 'static) -> Self {
    Self::from_step(Arc::new(step))
  }

  pub fn from_step(step: Arc<dyn Step<TData>>) -> Self {
    Self::from_kind(StageKind::Step(step))
  }

  /// Runs `stages` one after another, stopping at the first error.
  pub fn sequential(stages: impl IntoIterator<Item = Stage<TData>>) -> Self {
    SequentialGroup::new(stages).into()
  }

  /// Runs `stages` concurrently and waits for all of them.
  pub fn parallel(stages: impl IntoIterator<Item = Stage<TData>>) -> Self {
    ParallelGroup::new(stages).into()
  }

  /// Runs `on_true` when `predicate` holds, `on_false` otherwise.
  /// A missing predicate counts as false; a missing branch is a no-op.
  pub fn conditional(
    predicate: Option<Predicate<TData>>,
    on_true: Option<Stage<TData>>,
    on_false: Option<Stage<TData>>,
  ) -> Self {
    ConditionalStage::new(predicate, on_true, on_false).into()
  }

  /// Wraps `stage` with a before and an after hook.
  pub fn lifecycle<B, BFut, A, AFut>(stage: Stage<TData>, before: B, after: A) -> Self
  where
    B: Fn(Stage<TData>, ContextData<TData>) -> BFut + Send + Sync + 'static,
    BFut: Future<Output = StageResult> + Send + 'static,
    A: Fn(Stage<TData>, ContextData<TData>, StageResult) -> AFut + Send + Sync + 'static,
    AFut: Future<Output = StageResult> + Send + 'static,
  {
    LifecycleStage::new(stage).before(before).after(after).into()
  }

  /// Wraps `stage` with a before hook only.
  pub fn before_lifecycle<B, BFut>(stage: Stage<TData>, before: B) -> Self
  where
    B: Fn(Stage<TData>, ContextData<TData>) -> BFut + Send + Sync + 'static,
    BFut: Future<Output = StageResult> + Send + 'static,
  {
    LifecycleStage::new(stage).before(before).into()
  }

  /// Wraps `stage` with an after hook only.
  pub fn after_lifecycle<A, AFut>(stage: Stage<TData>, after: A) -> Self
  where
    A: Fn(Stage<TData>, ContextData<TData>, StageResult) -> AFut + Send + Sync + 'static,
    AFut: Future<Output = StageResult> + Send + 'static,
  {
    LifecycleStage::new(stage).after(after).into()
  }

  /// Fluent form of [`Stage::before_lifecycle`]. Each call adds an outer layer.
  pub fn with_before<B, BFut>(self, before: B) -> Self
  where
    B: Fn(Stage<TData>, ContextData<TData>) -> BFut + Send + Sync + 'static,
    BFut: Future<Output = StageResult> + Send + 'static,
  {
    Self::before_lifecycle(self, before)
  }

  /// Fluent form of [`Stage::after_lifecycle`]. Each call adds an outer layer.
  pub fn with_after<A, AFut>(self, after: A) -> Self
  where
    A: Fn(Stage<TData>, ContextData<TData>, StageResult) -> AFut + Send + Sync + 'static,
    AFut: Future<Output = StageResult> + Send + 'static,
  {
    Self::after_lifecycle(self, after)
  }

  /// Short human-readable name: the step name for leaves, the decision
  /// label for conditionals, the wrapped stage's label for lifecycles.
  pub fn label(&self) -> &str {
    match self.kind() {
      StageKind::Step(step) => step.name(),
      StageKind::Sequential(_) => "sequential",
      StageKind::Parallel(_) => "parallel",
      StageKind::Conditional(conditional) => conditional.label(),
      StageKind::Lifecycle(lifecycle) => lifecycle.stage().label(),
    }
  }

  /// True when both handles refer to the same node.
  pub fn ptr_eq(&self, other: &Self) -> bool {
    Arc::ptr_eq(&self.0, &other.0)
  }

  /// Draws this stage, recursing into children.
  pub fn draw(&self, diagram: &mut dyn Diagram) {
    match self.kind() {
      StageKind::Step(step) => diagram.add_activity(step.name()),
      StageKind::Sequential(group) => {
        for stage in group.stages() {
          stage.draw(diagram);
        }
      }
      StageKind::Parallel(group) => {
        let branches: Vec<_> = group
          .stages()
          .iter()
          .map(|stage| move |d: &mut dyn Diagram| stage.draw(d))
          .collect();
        let branch_refs: Vec<&dyn Fn(&mut dyn Diagram)> =
          branches.iter().map(|b| b as &dyn Fn(&mut dyn Diagram)).collect();
        diagram.add_concurrency(&branch_refs);
      }
      StageKind::Conditional(conditional) => {
        let draw_true = |d: &mut dyn Diagram| {
          if let Some(stage) = conditional.on_true() {
            stage.draw(d);
          }
        };
        let draw_false = |d: &mut dyn Diagram| {
          if let Some(stage) = conditional.on_false() {
            stage.draw(d);
          }
        };
        diagram.add_decision(conditional.label(), &draw_true, &draw_false);
      }
      StageKind::Lifecycle(lifecycle) => lifecycle.stage().draw(diagram),
    }
  }
}

#[async_trait]
impl<TData: 'static + Send + Sync> Runnable<TData> for Stage<TData> {
  async fn run(&self, executor: &SharedExecutor<TData>, ctx: &ContextData<TData>) -> StageResult {
    match self.kind() {
      StageKind::Step(step) => executor.run(step.as_ref(), ctx.clone()).await,
      StageKind::Sequential(group) => group.run(executor, ctx).await,
      StageKind::Parallel(group) => group.run(executor, ctx).await,
      StageKind::Conditional(conditional) => conditional.run(executor, ctx).await,
      StageKind::Lifecycle(lifecycle) => lifecycle.run(executor, ctx).await,
    }
  }
}

impl<TData: 'static + Send + Sync> Clone for Stage<TData> {
  fn clone(&self) -> Self {
    Stage(Arc::clone(&self.0))
  }
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for Stage<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let variant = match self.kind() {
      StageKind::Step(_) => "Step",
      StageKind::Sequential(_) => "Sequential",
      StageKind::Parallel(_) => "Parallel",
      StageKind::Conditional(_) => "Conditional",
      StageKind::Lifecycle(_) => "Lifecycle",
    };
    f.debug_struct("Stage")
      .field("kind", &variant)
      .field("label", &self.label())
      .finish()
  }
}

impl<TData: 'static + Send + Sync> From<SequentialGroup<TData>> for Stage<TData> {
  fn from(group: SequentialGroup<TData>) -> Self {
    Stage::from_kind(StageKind::Sequential(group))
  }
}

impl<TData: 'static + Send + Sync> From<ParallelGroup<TData>> for Stage<TData> {
  fn from(group: ParallelGroup<TData>) -> Self {
    Stage::from_kind(StageKind::Parallel(group))
  }
}

impl<TData: 'static + Send + Sync> From<ConditionalStage<TData>> for Stage<TData> {
  fn from(conditional: ConditionalStage<TData>) -> Self {
    Stage::from_kind(StageKind::Conditional(conditional))
  }
}

impl<TData: 'static + Send + Sync> From<LifecycleStage<TData>> for Stage<TData> {
  fn from(lifecycle: LifecycleStage<TData>) -> Self {
    Stage::from_kind(StageKind::Lifecycle(lifecycle))
  }
}
