#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bounded_pool::{TaskToExecute, Thunk};
use tokio::time::sleep;

// Helper to initialize tracing for tests (runs once per test binary).
pub fn setup_tracing_for_test() {
  use std::sync::Once;
  use tracing_subscriber::{fmt, EnvFilter};
  static TRACING_INIT: Once = Once::new();

  TRACING_INIT.call_once(|| {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,bounded_pool=trace"));

    fmt::Subscriber::builder()
      .with_env_filter(filter)
      .with_test_writer()
      .try_init()
      .ok();
  });
}

/// Tracks how many gauged futures are running and the highest count seen.
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
  active: AtomicUsize,
  max_seen: AtomicUsize,
  started: AtomicUsize,
}

impl ConcurrencyGauge {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  pub fn enter(&self) -> usize {
    self.started.fetch_add(1, Ordering::SeqCst);
    let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
    self.max_seen.fetch_max(now, Ordering::SeqCst);
    now
  }

  pub fn exit(&self) {
    self.active.fetch_sub(1, Ordering::SeqCst);
  }

  pub fn active(&self) -> usize {
    self.active.load(Ordering::SeqCst)
  }

  pub fn max_seen(&self) -> usize {
    self.max_seen.load(Ordering::SeqCst)
  }

  pub fn started(&self) -> usize {
    self.started.load(Ordering::SeqCst)
  }
}

/// A thunk that resolves to `value` after `delay_ms`.
pub fn resolve_after(delay_ms: u64, value: usize) -> Thunk<usize, String> {
  Box::new(move || -> TaskToExecute<usize, String> {
    Box::pin(async move {
      sleep(Duration::from_millis(delay_ms)).await;
      Ok::<usize, String>(value)
    })
  })
}

/// A thunk that fails with `message` after `delay_ms`.
pub fn reject_after(delay_ms: u64, message: &str) -> Thunk<usize, String> {
  let message = message.to_string();
  Box::new(move || -> TaskToExecute<usize, String> {
    Box::pin(async move {
      sleep(Duration::from_millis(delay_ms)).await;
      Err::<usize, String>(message)
    })
  })
}

/// A thunk that records its run on `gauge`, resolving to `value` after `delay_ms`.
pub fn gauged(gauge: Arc<ConcurrencyGauge>, delay_ms: u64, value: usize) -> Thunk<usize, String> {
  Box::new(move || -> TaskToExecute<usize, String> {
    Box::pin(async move {
      let now = gauge.enter();
      assert!(now > 0);
      sleep(Duration::from_millis(delay_ms)).await;
      gauge.exit();
      Ok::<usize, String>(value)
    })
  })
}
