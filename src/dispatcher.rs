use crate::error::PoolError;
use crate::manager::BoundedPool;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use tokio::runtime::Handle as TokioHandle;
use tracing::trace;

/// Concurrency used by [`map`] callers that have no better number.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Window size for a map over `len` thunks: a positive request is capped at
/// `len`, 0 means every thunk at once.
pub(crate) fn normalize_concurrency(requested: usize, len: usize) -> usize {
  if requested > 0 {
    requested.min(len)
  } else {
    len
  }
}

/// Shared state of one map run: the thunks, the claim cursor and the
/// position-indexed result slots.
pub(crate) struct Dispatcher<F, T> {
  len: usize,
  cursor: AtomicUsize,
  thunks: Mutex<Vec<Option<F>>>,
  results: Mutex<Vec<Option<T>>>,
}

impl<F, T> Dispatcher<F, T> {
  pub(crate) fn new(thunks: impl IntoIterator<Item = F>) -> Self {
    let thunks: Vec<Option<F>> = thunks.into_iter().map(Some).collect();
    let len = thunks.len();
    Self {
      len,
      cursor: AtomicUsize::new(0),
      thunks: Mutex::new(thunks),
      results: Mutex::new((0..len).map(|_| None).collect()),
    }
  }

  pub(crate) fn len(&self) -> usize {
    self.len
  }

  pub(crate) fn is_empty(&self) -> bool {
    self.len == 0
  }

  /// Claims the next unclaimed index together with its thunk.
  ///
  /// The cursor only advances while it is below `len`, so every index is handed
  /// out exactly once no matter how many invocations race for it.
  fn claim(&self) -> Option<(usize, F)> {
    let index = self
      .cursor
      .fetch_update(AtomicOrdering::AcqRel, AtomicOrdering::Acquire, |cursor| {
        (cursor < self.len).then_some(cursor + 1)
      })
      .ok()?;
    let thunk = self.thunks.lock()[index].take()?;
    Some((index, thunk))
  }

  fn store(&self, index: usize, value: T) {
    self.results.lock()[index] = Some(value);
  }

  pub(crate) fn has_more(&self) -> bool {
    self.cursor.load(AtomicOrdering::Acquire) < self.len
  }

  /// Moves the populated results out, in input order.
  pub(crate) fn take_results<E>(&self) -> Result<Vec<T>, PoolError<E>> {
    let slots = std::mem::take(&mut *self.results.lock());
    slots
      .into_iter()
      .enumerate()
      .map(|(index, slot)| slot.ok_or(PoolError::ResultUnavailable { index }))
      .collect()
  }
}

impl<F, Fut, T, E> Dispatcher<F, T>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  /// One pool invocation: claim an index, run its thunk, store the value in
  /// the matching slot, then report whether unclaimed indices remain.
  pub(crate) async fn invoke_next(&self) -> Result<bool, E> {
    if let Some((index, thunk)) = self.claim() {
      trace!(index, "Claimed thunk.");
      let value = thunk().await?;
      self.store(index, value);
    }
    Ok(self.has_more())
  }
}

/// Invokes every thunk with at most `concurrency` of them in flight and returns
/// their values in input order, regardless of completion order.
///
/// A `concurrency` of 0 runs every thunk at once. An empty input returns an
/// empty `Vec` without starting a run.
///
/// # Errors
/// Returns `PoolError::TasksFailed` with one entry per failing thunk if any
/// thunk failed or panicked. Thunks already running when the first failure
/// arrives are allowed to finish; no further thunks are started.
pub async fn map<I, F, Fut, T, E>(thunks: I, concurrency: usize) -> Result<Vec<T>, PoolError<E>>
where
  I: IntoIterator<Item = F>,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  BoundedPool::new(concurrency).map(thunks).await
}

/// Like [`map`], but every invocation runs as its own task on `handle`, so
/// thunks may execute in parallel on the runtime's worker threads.
pub async fn map_spawned<I, F, Fut, T, E>(
  handle: TokioHandle,
  thunks: I,
  concurrency: usize,
) -> Result<Vec<T>, PoolError<E>>
where
  I: IntoIterator<Item = F>,
  F: FnOnce() -> Fut + Send + 'static,
  Fut: Future<Output = Result<T, E>> + Send + 'static,
  T: Send + 'static,
  E: Send + 'static,
{
  BoundedPool::new(concurrency).with_runtime(handle).map_spawned(thunks).await
}
