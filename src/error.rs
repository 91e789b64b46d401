use thiserror::Error;

/// A single captured failure of one task invocation.
#[derive(Error, Debug, PartialEq)]
pub enum TaskFailure<E> {
  #[error("Task invocation failed: {0}")]
  Failed(E),

  #[error("Task invocation panicked")]
  Panicked,

  #[error("Task invocation was aborted by the runtime before it could finish")]
  Aborted,
}

impl<E> TaskFailure<E> {
  /// Returns the task's own error, if this failure carries one.
  pub fn as_error(&self) -> Option<&E> {
    match self {
      TaskFailure::Failed(err) => Some(err),
      _ => None,
    }
  }

  pub(crate) fn kind(&self) -> &'static str {
    match self {
      TaskFailure::Failed(_) => "returned an error",
      TaskFailure::Panicked => "panicked",
      TaskFailure::Aborted => "was aborted",
    }
  }

  /// Consumes the failure and returns the task's own error, if any.
  pub fn into_inner(self) -> Option<E> {
    match self {
      TaskFailure::Failed(err) => Some(err),
      _ => None,
    }
  }
}

/// Errors produced by a pool or map run.
#[derive(Error, Debug, PartialEq)]
pub enum PoolError<E> {
  #[error("Pool size must be at least 1, got {0}")]
  InvalidPoolSize(usize),

  /// Every failure captured during the run, in the order the failures arrived.
  #[error("{} task invocation(s) failed; in-flight work was drained before reporting", .0.len())]
  TasksFailed(Vec<TaskFailure<E>>),

  #[error("Result slot {index} was never populated")]
  ResultUnavailable { index: usize },

  #[error("No Tokio runtime available to spawn task invocations on")]
  RuntimeUnavailable,
}

impl<E> PoolError<E> {
  /// The captured task failures. Empty for errors that are not task failures.
  pub fn failures(&self) -> &[TaskFailure<E>] {
    match self {
      PoolError::TasksFailed(failures) => failures,
      _ => &[],
    }
  }

  pub fn failure_count(&self) -> usize {
    self.failures().len()
  }

  /// Consumes the error and returns the captured task failures.
  pub fn into_failures(self) -> Vec<TaskFailure<E>> {
    match self {
      PoolError::TasksFailed(failures) => failures,
      _ => Vec::new(),
    }
  }
}
