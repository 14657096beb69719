pub mod context_data;
pub mod executor;
pub mod step;

// Re-export key types for easier access from the stage modules (and lib.rs)
pub use context_data::ContextData;
pub use executor::{Executor, RecordingExecutor, SharedExecutor, StepRecord, TracingExecutor};
pub use step::{step_fn, FnStep, Step, StageFuture};
