use crate::dispatcher::{normalize_concurrency, Dispatcher, DEFAULT_CONCURRENCY};
use crate::error::PoolError;
use crate::pool::drive;
use crate::task::{guarded, joined};

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle as TokioHandle;
use tracing::{debug, warn};

const DEFAULT_POOL_NAME: &str = "bounded_pool";

/// A reusable bounded-concurrency configuration.
///
/// Holds no run state: every call to [`run`](BoundedPool::run),
/// [`map`](BoundedPool::map) or their spawned variants starts from a fresh
/// cursor, window and error list.
#[derive(Debug, Clone)]
pub struct BoundedPool {
  pool_name: Arc<String>,
  concurrency: usize,
  runtime: Option<TokioHandle>,
}

impl Default for BoundedPool {
  fn default() -> Self {
    Self::new(DEFAULT_CONCURRENCY)
  }
}

impl BoundedPool {
  pub fn new(concurrency: usize) -> Self {
    Self {
      pool_name: Arc::new(DEFAULT_POOL_NAME.to_string()),
      concurrency,
      runtime: None,
    }
  }

  /// Sets the name recorded on every log line of this pool's runs.
  pub fn with_name(mut self, pool_name: &str) -> Self {
    self.pool_name = Arc::new(pool_name.to_string());
    self
  }

  /// Sets the runtime spawned runs place their invocations on. Without one,
  /// the runtime of the calling task is used.
  pub fn with_runtime(mut self, handle: TokioHandle) -> Self {
    self.runtime = Some(handle);
    self
  }

  pub fn name(&self) -> &str {
    &self.pool_name
  }

  pub fn concurrency(&self) -> usize {
    self.concurrency
  }

  /// Runs `task` with at most `concurrency` invocations in flight until an
  /// invocation resolves to `Ok(false)`, polling all of them on the calling task.
  ///
  /// # Errors
  /// Returns `PoolError::InvalidPoolSize` if the concurrency is 0.
  /// Returns `PoolError::TasksFailed` once every in-flight invocation has
  /// settled, if any of them returned an error or panicked.
  pub async fn run<E, T, Fut>(&self, task: T) -> Result<(), PoolError<E>>
  where
    T: Fn() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
  {
    let task = &task;
    drive(&self.pool_name, self.concurrency, move || guarded(async move { task().await })).await
  }

  /// Invokes each thunk exactly once and returns the values in input order.
  /// Concurrency is capped at the number of thunks; 0 runs them all at once.
  pub async fn map<I, F, Fut, V, E>(&self, thunks: I) -> Result<Vec<V>, PoolError<E>>
  where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, E>>,
  {
    let dispatcher = Dispatcher::new(thunks);
    if dispatcher.is_empty() {
      debug!(pool_name = %self.pool_name, "Map called with no thunks; nothing to run.");
      return Ok(Vec::new());
    }

    let size = normalize_concurrency(self.concurrency, dispatcher.len());
    debug!(pool_name = %self.pool_name, thunks = dispatcher.len(), size, "Mapping thunks.");

    let dispatcher = &dispatcher;
    drive(&self.pool_name, size, move || guarded(dispatcher.invoke_next())).await?;
    dispatcher.take_results()
  }

  /// Like [`run`](BoundedPool::run), but each invocation is spawned as its own
  /// task on the configured runtime.
  ///
  /// # Errors
  /// Returns `PoolError::RuntimeUnavailable` if no runtime was configured and
  /// the caller is not inside one. Otherwise as [`run`](BoundedPool::run), with
  /// invocations lost to a runtime shutdown recorded as `TaskFailure::Aborted`.
  pub async fn run_spawned<E, T, Fut>(&self, task: T) -> Result<(), PoolError<E>>
  where
    T: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send + 'static,
    E: Send + 'static,
  {
    let runtime = self.runtime_handle()?;
    let task = Arc::new(task);
    drive(&self.pool_name, self.concurrency, move || {
      let task = task.clone();
      joined(runtime.spawn(async move { task().await }))
    })
    .await
  }

  /// Like [`map`](BoundedPool::map), but each invocation is spawned as its own
  /// task on the configured runtime.
  pub async fn map_spawned<I, F, Fut, V, E>(&self, thunks: I) -> Result<Vec<V>, PoolError<E>>
  where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    V: Send + 'static,
    E: Send + 'static,
  {
    let dispatcher = Arc::new(Dispatcher::new(thunks));
    if dispatcher.is_empty() {
      debug!(pool_name = %self.pool_name, "Map called with no thunks; nothing to spawn.");
      return Ok(Vec::new());
    }

    let runtime = self.runtime_handle()?;
    let size = normalize_concurrency(self.concurrency, dispatcher.len());
    debug!(pool_name = %self.pool_name, thunks = dispatcher.len(), size, "Mapping thunks on spawned tasks.");

    let worker_dispatcher = dispatcher.clone();
    drive(&self.pool_name, size, move || {
      let dispatcher = worker_dispatcher.clone();
      joined(runtime.spawn(async move { dispatcher.invoke_next().await }))
    })
    .await?;
    dispatcher.take_results()
  }

  fn runtime_handle<E>(&self) -> Result<TokioHandle, PoolError<E>> {
    match &self.runtime {
      Some(handle) => Ok(handle.clone()),
      None => TokioHandle::try_current().map_err(|err| {
        warn!(pool_name = %self.pool_name, "Cannot spawn task invocations: {}", err);
        PoolError::RuntimeUnavailable
      }),
    }
  }
}
