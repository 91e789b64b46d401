use bounded_pool::{BoundedPool, TaskToExecute, Thunk};
use std::time::{Duration, Instant};
use tracing::info;

fn fetch(id: usize, delay_ms: u64) -> Thunk<String, String> {
  Box::new(move || -> TaskToExecute<String, String> {
    Box::pin(async move {
      info!("Fetch {} starting (takes {}ms)", id, delay_ms);
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      Ok::<String, String>(format!("payload {}", id))
    })
  })
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Basic Usage Example (Limit: 2) ---");

  let delays = [300, 100, 500, 200, 400, 50];
  let thunks: Vec<Thunk<String, String>> = delays.iter().enumerate().map(|(id, delay)| fetch(id, *delay)).collect();

  let pool = BoundedPool::new(2).with_name("fetch_pool");
  let started = Instant::now();
  match pool.map(thunks).await {
    Ok(payloads) => {
      info!("All fetches finished in {:?}", started.elapsed());
      for (id, payload) in payloads.iter().enumerate() {
        info!("Slot {}: {}", id, payload);
      }
    }
    Err(e) => info!("Map failed: {}", e),
  }

  info!("--- Basic Usage Example End ---");
}
