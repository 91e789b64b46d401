use crate::error::{PoolError, TaskFailure};
use crate::manager::BoundedPool;
use crate::task::InvocationOutcome;

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, info, info_span, warn, Instrument};

lazy_static::lazy_static! {
  // Only used to correlate log lines of one run.
  static ref NEXT_POOL_RUN_ID: AtomicU64 = AtomicU64::new(0);
}

/// What the driver should do after an invocation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
  /// Refill the concurrency window.
  Backfill,
  /// Launch nothing new; wait for the remaining invocations.
  Drain,
  /// Every invocation has settled; produce the run's result.
  Settle,
}

/// Per-run bookkeeping of the pool. Created fresh for every run.
#[derive(Debug)]
pub(crate) struct PoolState<E> {
  size: usize,
  active: usize,
  done: bool,
  errors: Vec<TaskFailure<E>>,
}

impl<E> PoolState<E> {
  pub(crate) fn new(size: usize) -> Self {
    Self {
      size,
      active: 0,
      done: false,
      errors: Vec::new(),
    }
  }

  pub(crate) fn can_launch(&self) -> bool {
    self.active < self.size && !self.done
  }

  pub(crate) fn launched(&mut self) {
    self.active += 1;
  }

  pub(crate) fn active(&self) -> usize {
    self.active
  }

  pub(crate) fn is_done(&self) -> bool {
    self.done
  }

  pub(crate) fn on_success(&mut self, more: bool) -> Step {
    debug_assert!(self.active > 0, "settled an invocation that was never launched");
    self.active -= 1;

    if self.active == 0 && (self.done || !more) {
      Step::Settle
    } else if more {
      Step::Backfill
    } else {
      self.done = true;
      Step::Drain
    }
  }

  pub(crate) fn on_failure(&mut self, failure: TaskFailure<E>) -> Step {
    debug_assert!(self.active > 0, "settled an invocation that was never launched");
    self.errors.push(failure);
    self.done = true;
    self.active -= 1;

    if self.active == 0 {
      Step::Settle
    } else {
      Step::Drain
    }
  }

  pub(crate) fn settle(self) -> Result<(), PoolError<E>> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(PoolError::TasksFailed(self.errors))
    }
  }
}

/// Keeps up to `size` invocations in flight, replacing each settled one with a
/// fresh `launch()` until the work is exhausted or an invocation fails, then
/// waits for every in-flight invocation before returning.
///
/// Invocations are polled concurrently on the calling task.
pub(crate) async fn drive<E, L, Fut>(pool_name: &str, size: usize, mut launch: L) -> Result<(), PoolError<E>>
where
  L: FnMut() -> Fut,
  Fut: Future<Output = InvocationOutcome<E>>,
{
  if size == 0 {
    warn!(pool_name = %pool_name, "Rejecting pool run with a size of 0.");
    return Err(PoolError::InvalidPoolSize(size));
  }

  let run_id = NEXT_POOL_RUN_ID.fetch_add(1, AtomicOrdering::Relaxed);

  async move {
    let mut state = PoolState::new(size);
    let mut in_flight = FuturesUnordered::new();

    loop {
      while state.can_launch() {
        state.launched();
        in_flight.push(launch());
        debug!(active = state.active(), "Launched task invocation.");
      }

      let outcome = match in_flight.next().await {
        Some(outcome) => outcome,
        None => {
          // Unreachable while the state machine holds: an unsettled run always has work in flight.
          debug_assert_eq!(state.active(), 0);
          break;
        }
      };

      let step = match outcome {
        Ok(more) => state.on_success(more),
        Err(failure) => {
          let kind = failure.kind();
          let step = state.on_failure(failure);
          warn!(
            active = state.active(),
            "Task invocation {}. No new invocations will be launched.", kind
          );
          step
        }
      };

      match step {
        Step::Settle => break,
        Step::Backfill => debug!(active = state.active(), "Backfilling freed slot."),
        Step::Drain => debug!(active = state.active(), done = state.is_done(), "Draining in-flight invocations."),
      }
    }

    let result = state.settle();
    match &result {
      Ok(()) => info!("Pool run completed successfully."),
      Err(err) => info!(failures = err.failure_count(), "Pool run failed after draining in-flight work."),
    }
    result
  }
  .instrument(info_span!("pool_run", pool_name = %pool_name, run_id, size))
  .await
}

/// Runs `task` repeatedly with at most `size` invocations in flight.
///
/// `task` resolves to `Ok(true)` while more work remains and `Ok(false)` once it
/// is exhausted. The first failure stops new invocations from being launched;
/// the run then waits for the in-flight ones and fails with every captured
/// failure.
///
/// # Errors
/// Returns `PoolError::InvalidPoolSize` if `size` is 0.
/// Returns `PoolError::TasksFailed` if any invocation returned an error or panicked.
pub async fn pool<E, T, Fut>(size: usize, task: T) -> Result<(), PoolError<E>>
where
  T: Fn() -> Fut,
  Fut: Future<Output = Result<bool, E>>,
{
  BoundedPool::new(size).run(task).await
}

/// Like [`pool`], but every invocation runs as its own task on `handle`.
pub async fn pool_spawned<E, T, Fut>(handle: TokioHandle, size: usize, task: T) -> Result<(), PoolError<E>>
where
  T: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<bool, E>> + Send + 'static,
  E: Send + 'static,
{
  BoundedPool::new(size).with_runtime(handle).run_spawned(task).await
}
