// src/lib.rs

//! Stagecraft: composable, asynchronous stage trees for Rust.
//!
//! A pipeline is a tree of stages:
//!  - Steps: named, side-effecting units of work supplied by the application.
//!  - Sequential groups: run children in order, stop at the first failure.
//!  - Parallel groups: run children as concurrent tasks, wait for all, aggregate failures.
//!  - Conditional stages: pick one of two optional branches from a predicate.
//!  - Lifecycle stages: before/after hooks that can veto, recover or replace outcomes.
//!
//! Leaf steps always run through an [`Executor`], which is where timing and
//! tracing live. The context ([`ContextData`]) is one shared handle threaded
//! unchanged through the whole tree.

pub mod core;
pub mod diagram;
pub mod error;
pub mod pipeline;
pub mod stage;

// --- Re-exports for the Public API ---

pub use crate::core::context_data::ContextData;
pub use crate::core::executor::{Executor, RecordingExecutor, SharedExecutor, StepRecord, TracingExecutor};
pub use crate::core::step::{step_fn, FnStep, StageFuture, Step};

pub use crate::stage::{
  predicate, AfterHook, BeforeHook, ConditionalStage, LifecycleStage, ParallelGroup, Predicate, Runnable,
  SequentialGroup, Stage, StageKind,
};

pub use crate::diagram::{Diagram, OutlineDiagram};
pub use crate::pipeline::Pipeline;

pub use crate::error::{ChildFailure, ParallelFailure, StageError, StageResult};

/*
    Core Workflow:
    1. Define a context struct `MyCtx` and wrap it: `ContextData::new(MyCtx::default())`.
    2. Implement `Step<MyCtx>` for your units of work (or use `step_fn`).
    3. Compose: `Stage::sequential([...])`, `Stage::parallel([...])`,
       `Stage::conditional(predicate(..), Some(..), None)`, `stage.with_before(..)`.
    4. Run: `root.run(&TracingExecutor::shared(), &ctx).await`, or wrap the root in a
       `Pipeline` to reuse it with one executor across runs.
    5. Inspect the result: `StageError::Parallel` carries per-child failures by index.
*/
