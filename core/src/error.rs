// stagecraft/src/error.rs
use anyhow::Error as AnyhowError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StageError {
  /// A step, hook or stage failed. Carries whatever cause the user code produced.
  #[error("Stage failed: {source}")]
  Failed {
    #[source]
    source: AnyhowError,
  },

  /// One or more children of a parallel group failed.
  #[error(transparent)]
  Parallel(#[from] ParallelFailure),

  /// The task running a parallel child panicked (or was aborted by the runtime).
  #[error("Stage task panicked: {message}")]
  Panicked { message: String },
}

impl StageError {
  /// Builds a `Failed` error from a plain message.
  pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
    StageError::Failed {
      source: AnyhowError::msg(message),
    }
  }

  /// Returns the aggregate if this error came from a parallel group.
  pub fn as_parallel(&self) -> Option<&ParallelFailure> {
    match self {
      StageError::Parallel(failure) => Some(failure),
      _ => None,
    }
  }
}

// Lets steps and hooks use `?` on anything anyhow can hold.
impl From<AnyhowError> for StageError {
  fn from(err: AnyhowError) -> Self {
    // A bare StageError that travelled through anyhow keeps its own shape.
    // Anything with context layers on top stays whole.
    let outermost: &(dyn std::error::Error + Send + Sync + 'static) = err.as_ref();
    if !outermost.is::<StageError>() {
      return StageError::Failed { source: err };
    }
    match err.downcast::<StageError>() {
      Ok(stage_err) => stage_err,
      Err(source) => StageError::Failed { source },
    }
  }
}

/// A single failing child of a parallel group.
#[derive(Debug)]
pub struct ChildFailure {
  /// Position of the child in the group, as passed to `Stage::parallel`.
  pub index: usize,
  pub error: StageError,
}

/// Aggregate error of a parallel group. Failures are ordered by child index,
/// never by completion order.
#[derive(Debug)]
pub struct ParallelFailure {
  total: usize,
  failures: Vec<ChildFailure>,
}

impl ParallelFailure {
  pub(crate) fn new(total: usize, mut failures: Vec<ChildFailure>) -> Self {
    failures.sort_by_key(|f| f.index);
    Self { total, failures }
  }

  pub fn failures(&self) -> &[ChildFailure] {
    &self.failures
  }

  /// Indices of the children that failed, ascending.
  pub fn indices(&self) -> Vec<usize> {
    self.failures.iter().map(|f| f.index).collect()
  }

  /// The error produced by the child at `index`, if that child failed.
  pub fn error_at(&self, index: usize) -> Option<&StageError> {
    self.failures.iter().find(|f| f.index == index).map(|f| &f.error)
  }

  /// Number of failing children.
  pub fn len(&self) -> usize {
    self.failures.len()
  }

  pub fn is_empty(&self) -> bool {
    self.failures.is_empty()
  }

  /// Number of children the group ran.
  pub fn total(&self) -> usize {
    self.total
  }

  pub fn into_failures(self) -> Vec<ChildFailure> {
    self.failures
  }
}

impl fmt::Display for ParallelFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} of {} parallel stages failed", self.failures.len(), self.total)?;
    for failure in &self.failures {
      write!(f, "; [{}] {}", failure.index, failure.error)?;
    }
    Ok(())
  }
}

impl std::error::Error for ParallelFailure {}

pub type StageResult<T = (), E = StageError> = std::result::Result<T, E>;
