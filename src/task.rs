use crate::error::TaskFailure;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// A boxed future producing a task's value or its error.
/// It must be `Send` and `'static` so it can also be handed to a spawned run.
pub type TaskToExecute<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'static>>;

/// A boxed zero-argument callable that produces its future when invoked.
///
/// Useful for collecting thunks of different closure types into one `Vec`.
pub type Thunk<T, E> = Box<dyn FnOnce() -> TaskToExecute<T, E> + Send + 'static>;

/// What one settled invocation reports back to the pool: `Ok(more)` or the captured failure.
pub(crate) type InvocationOutcome<E> = Result<bool, TaskFailure<E>>;

/// Polls an invocation on the current task, turning a panic into `TaskFailure::Panicked`.
pub(crate) async fn guarded<Fut, E>(invocation: Fut) -> InvocationOutcome<E>
where
  Fut: Future<Output = Result<bool, E>>,
{
  match AssertUnwindSafe(invocation).catch_unwind().await {
    Ok(Ok(more)) => Ok(more),
    Ok(Err(err)) => Err(TaskFailure::Failed(err)),
    Err(_panic_payload) => {
      error!("Task invocation panicked during execution.");
      Err(TaskFailure::Panicked)
    }
  }
}

/// Awaits an invocation that was spawned onto a runtime.
pub(crate) async fn joined<E>(handle: JoinHandle<Result<bool, E>>) -> InvocationOutcome<E> {
  match handle.await {
    Ok(Ok(more)) => Ok(more),
    Ok(Err(err)) => Err(TaskFailure::Failed(err)),
    Err(join_error) if join_error.is_panic() => {
      error!("Spawned task invocation panicked during execution.");
      Err(TaskFailure::Panicked)
    }
    Err(join_error) => {
      warn!("Spawned task invocation did not finish: {}", join_error);
      Err(TaskFailure::Aborted)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn guarded_maps_error_and_panic() {
    let ok: InvocationOutcome<&str> = guarded(async { Ok(true) }).await;
    assert_eq!(ok, Ok(true));

    let failed = guarded(async { Err::<bool, _>("boom") }).await;
    assert_eq!(failed, Err(TaskFailure::Failed("boom")));

    let panicked: InvocationOutcome<&str> = guarded(async {
      if true {
        panic!("invocation blew up");
      }
      Ok(false)
    })
    .await;
    assert_eq!(panicked, Err(TaskFailure::Panicked));
  }

  #[tokio::test]
  async fn joined_reports_spawned_panic() {
    let handle = tokio::spawn(async {
      if true {
        panic!("spawned invocation blew up");
      }
      Ok::<bool, String>(true)
    });
    assert_eq!(joined(handle).await, Err(TaskFailure::Panicked));

    let handle = tokio::spawn(async { Err::<bool, String>("nope".to_string()) });
    assert_eq!(joined(handle).await, Err(TaskFailure::Failed("nope".to_string())));
  }

  #[tokio::test]
  async fn joined_reports_aborted_task() {
    let handle = tokio::spawn(async {
      tokio::time::sleep(std::time::Duration::from_secs(5)).await;
      Ok::<bool, String>(true)
    });
    handle.abort();
    assert_eq!(joined(handle).await, Err(TaskFailure::Aborted));
  }
}
